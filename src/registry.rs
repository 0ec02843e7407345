//! Caller-owned cache of interactors, one per record type.
//!
//! The registry is constructed once by the application and handed to
//! whatever needs to persist records. Entries are never evicted. Each record
//! type gets its own slot; first use constructs the interactor (creating the
//! table) under that slot's lock only, so concurrent first use still yields
//! exactly one interactor per type while other types stay reachable.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::OrmConfig;
use crate::error::{OrmError, Result};
use crate::interactor::{Interactor, Saved};
use crate::record::Record;
use crate::sqlite::{ConnectionProvider, SqliteConnectionProvider};
use crate::trace;
use crate::value::Value;

struct Entry {
    table: String,
    interactor: Arc<dyn Any + Send + Sync>,
}

/// `entry` stays `None` until construction succeeds.
struct Slot {
    record: &'static str,
    entry: Mutex<Option<Entry>>,
}

pub struct Registry {
    provider: Arc<dyn ConnectionProvider>,
    config: OrmConfig,
    slots: Mutex<HashMap<TypeId, Arc<Slot>>>,
}

impl Registry {
    pub fn new(provider: Arc<dyn ConnectionProvider>, config: OrmConfig) -> Self {
        if config.verbose {
            trace::set_verbose(true);
        }
        Self {
            provider,
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Registry over the SQLite database named by `config.db_path`.
    pub fn open(config: OrmConfig) -> Self {
        let provider = SqliteConnectionProvider::from_config(&config);
        Self::new(Arc::new(provider), config)
    }

    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    /// Process-wide statement trace toggle.
    pub fn set_verbose(&self, verbose: bool) {
        trace::set_verbose(verbose);
    }

    /// The interactor for `R`, constructed on first use.
    pub fn interactor<R: Record>(&self) -> Result<Arc<Interactor<R>>> {
        let slot = self
            .slots
            .lock()
            .entry(TypeId::of::<R>())
            .or_insert_with(|| {
                Arc::new(Slot {
                    record: R::type_name(),
                    entry: Mutex::new(None),
                })
            })
            .clone();

        let mut entry = slot.entry.lock();
        if let Some(entry) = entry.as_ref() {
            return entry
                .interactor
                .clone()
                .downcast::<Interactor<R>>()
                .map_err(|_| OrmError::TypeMismatch {
                    expected: slot.record,
                    found: R::type_name(),
                });
        }

        let interactor = Arc::new(Interactor::<R>::new(self.provider.clone(), &self.config)?);
        tracing::debug!(record = R::type_name(), "registered interactor");
        *entry = Some(Entry {
            table: interactor.table().to_string(),
            interactor: interactor.clone(),
        });
        Ok(interactor)
    }

    /// Runs `actions` against the interactor for `R`.
    pub fn with<R: Record, T>(
        &self,
        actions: impl FnOnce(&Interactor<R>) -> Result<T>,
    ) -> Result<T> {
        let interactor = self.interactor::<R>()?;
        actions(interactor.as_ref())
    }

    pub fn save<R: Record>(&self, record: R) -> Result<Saved<R>> {
        self.interactor::<R>()?.save(record)
    }

    pub fn find_by<R: Record>(&self, field: &str, value: impl Into<Value>) -> Result<Vec<R>> {
        self.interactor::<R>()?.find_by(field, value)
    }

    pub fn count_by<R: Record>(&self, field: &str, value: impl Into<Value>) -> Result<u64> {
        self.interactor::<R>()?.count_by(field, value)
    }

    pub fn delete_by<R: Record>(&self, field: &str, value: impl Into<Value>) -> Result<usize> {
        self.interactor::<R>()?.delete_by(field, value)
    }

    pub fn load_all<R: Record>(&self) -> Result<Vec<R>> {
        self.interactor::<R>()?.load_all()
    }

    pub fn delete_all<R: Record>(&self) -> Result<usize> {
        self.interactor::<R>()?.delete_all::<R>()
    }

    pub fn contains<R: Record>(&self) -> bool {
        let slot = self.slots.lock().get(&TypeId::of::<R>()).cloned();
        slot.as_deref()
            .is_some_and(|slot| slot.entry.lock().is_some())
    }

    /// Tables of every registered record type, sorted.
    pub fn registered_tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = self
            .snapshot()
            .iter()
            .filter_map(|slot| slot.entry.lock().as_ref().map(|entry| entry.table.clone()))
            .collect();
        tables.sort();
        tables
    }

    pub fn len(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|slot| slot.entry.lock().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the slots, taken so slot locks are never awaited while
    /// the map lock is held.
    fn snapshot(&self) -> Vec<Arc<Slot>> {
        self.slots.lock().values().cloned().collect()
    }
}
