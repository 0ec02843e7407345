//! Connection providers.
//!
//! The engine never opens connections itself; it asks a
//! [`ConnectionProvider`] whenever it has none or the one it holds went stale.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};

use crate::config::{OrmConfig, IN_MEMORY};
use crate::error::{OrmError, Result};

static MEMORY_DATABASES: AtomicUsize = AtomicUsize::new(0);

pub trait ConnectionProvider: Send + Sync {
    /// Opens a live connection.
    fn connect(&self) -> Result<Connection>;
}

/// Opens SQLite databases by path.
///
/// `:memory:` maps to a named shared-cache database private to this
/// provider, so every connection it opens sees the same tables and rows. The
/// provider keeps one connection of its own open to keep that database alive
/// while callers reconnect.
#[derive(Debug)]
pub struct SqliteConnectionProvider {
    db_path: String,
    memory: Option<MemoryDatabase>,
}

#[derive(Debug)]
struct MemoryDatabase {
    uri: String,
    anchor: Mutex<Option<Connection>>,
}

impl MemoryDatabase {
    fn new() -> Self {
        let id = MEMORY_DATABASES.fetch_add(1, Ordering::Relaxed);
        Self {
            uri: format!(
                "file:rust_sqlite_orm_{}_{}?mode=memory&cache=shared",
                std::process::id(),
                id
            ),
            anchor: Mutex::new(None),
        }
    }

    fn open(&self) -> rusqlite::Result<Connection> {
        let flags = OpenFlags::default() | OpenFlags::SQLITE_OPEN_URI;
        let mut anchor = self.anchor.lock();
        if anchor.is_none() {
            *anchor = Some(Connection::open_with_flags(&self.uri, flags)?);
        }
        Connection::open_with_flags(&self.uri, flags)
    }
}

impl SqliteConnectionProvider {
    pub fn new(db_path: impl Into<String>) -> Self {
        let db_path = db_path.into();
        let memory = (db_path == IN_MEMORY).then(MemoryDatabase::new);
        Self { db_path, memory }
    }

    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY)
    }

    pub fn from_config(config: &OrmConfig) -> Self {
        Self::new(config.db_path.clone())
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }
}

impl ConnectionProvider for SqliteConnectionProvider {
    fn connect(&self) -> Result<Connection> {
        tracing::debug!(path = %self.db_path, "opening sqlite connection");
        let connection = match &self.memory {
            Some(memory) => memory.open(),
            None => Connection::open(&self.db_path),
        };
        connection.map_err(|e| OrmError::Connection(format!("{}: {}", self.db_path, e)))
    }
}

/// Provider backed by a closure, for custom connection setup.
pub struct FnConnectionProvider<F> {
    open: F,
}

impl<F> FnConnectionProvider<F>
where
    F: Fn() -> rusqlite::Result<Connection> + Send + Sync,
{
    pub fn new(open: F) -> Self {
        Self { open }
    }
}

impl<F> ConnectionProvider for FnConnectionProvider<F>
where
    F: Fn() -> rusqlite::Result<Connection> + Send + Sync,
{
    fn connect(&self) -> Result<Connection> {
        (self.open)().map_err(|e| OrmError::Connection(e.to_string()))
    }
}
