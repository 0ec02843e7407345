//! Per-record-type execution unit.
//!
//! An [`Interactor`] owns one connection and one [`Generator`] for a single
//! record type. Every operation holds the interactor's lock for its whole
//! duration, so concurrent callers are serialized rather than racing on the
//! shared connection.

use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params_from_iter, Connection, Row};

use crate::config::OrmConfig;
use crate::error::{OrmError, Result};
use crate::record::{Record, Values};
use crate::schema::RecordSchema;
use crate::sql::{Generator, SqlQuery};
use crate::sqlite::ConnectionProvider;
use crate::value::Value;

/// Outcome of a save, decided by whether the statement affected any row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Success,
    Fail,
}

/// A saved record as persisted, with its timestamps filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct Saved<R> {
    pub status: SaveStatus,
    pub record: R,
}

impl<R> Saved<R> {
    pub fn is_success(&self) -> bool {
        self.status == SaveStatus::Success
    }
}

/// Connection state: `None` is disconnected.
struct Session {
    connection: Option<Connection>,
}

impl Session {
    fn is_live(&self) -> bool {
        self.connection.as_ref().is_some_and(probe)
    }

    /// Returns a live connection, reconnecting once if the current one is
    /// missing or fails the probe. A fresh connection runs `creation` before
    /// it is handed out, since it may point at a database without the table.
    fn acquire(
        &mut self,
        provider: &dyn ConnectionProvider,
        reconnect: bool,
        table: &str,
        creation: &SqlQuery,
    ) -> Result<&Connection> {
        if !self.is_live() {
            if !reconnect {
                return Err(OrmError::Disconnected);
            }
            if self.connection.take().is_some() {
                tracing::warn!(table, "connection went stale, reconnecting");
            }
            let connection = provider.connect()?;
            execute(&connection, creation)?;
            self.connection = Some(connection);
        }
        self.connection.as_ref().ok_or(OrmError::Disconnected)
    }
}

fn probe(connection: &Connection) -> bool {
    connection
        .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .is_ok()
}

pub struct Interactor<R: Record> {
    generator: Generator,
    creation: SqlQuery,
    provider: Arc<dyn ConnectionProvider>,
    reconnect: bool,
    session: Mutex<Session>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Interactor<R> {
    /// Connects and creates the table if it does not exist yet.
    pub fn new(provider: Arc<dyn ConnectionProvider>, config: &OrmConfig) -> Result<Self> {
        let generator = Generator::for_record::<R>()?;
        let creation = generator.table_creation()?;
        let connection = provider.connect()?;
        execute(&connection, &creation)?;
        tracing::info!(
            record = R::type_name(),
            table = generator.table(),
            "interactor ready"
        );
        Ok(Self {
            generator,
            creation,
            provider,
            reconnect: config.reconnect,
            session: Mutex::new(Session {
                connection: Some(connection),
            }),
            _record: PhantomData,
        })
    }

    pub fn table(&self) -> &str {
        self.generator.table()
    }

    pub fn schema(&self) -> &RecordSchema {
        self.generator.schema()
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Whether the current connection passes the liveness probe. Does not
    /// reconnect.
    pub fn is_connected(&self) -> bool {
        self.session.lock().is_live()
    }

    /// Closes the connection. The next operation reconnects, or fails with
    /// `Disconnected` when reconnecting is disabled.
    pub fn disconnect(&self) {
        if let Some(connection) = self.session.lock().connection.take() {
            if let Err((_, e)) = connection.close() {
                tracing::warn!(table = self.table(), error = %e, "closing connection failed");
            }
        }
    }

    /// Inserts the record if its primary key is not stored yet, otherwise
    /// updates the stored row. Creation and update timestamps are set to the
    /// current UTC time; the returned record carries them.
    pub fn save(&self, record: R) -> Result<Saved<R>> {
        self.with_connection(|conn, generator| {
            let schema = generator.schema();
            let pk = schema.primary_key();
            let values = record.values();
            let key = values
                .get(schema.primary_key_index())
                .cloned()
                .ok_or(OrmError::ArityMismatch {
                    record: schema.record(),
                    expected: schema.len(),
                    found: values.len(),
                })?;

            let existing = count(conn, &generator.count_by(pk.name, key.clone())?)?;
            let now = chrono::Utc::now().naive_utc();
            let (affected, stamped) = if existing == 0 {
                let stamped = generator.stamp_for_insert(&values, now);
                (execute(conn, &generator.write(&stamped)?)?, stamped)
            } else {
                let stamped = generator.stamp_for_update(&values, now);
                (execute(conn, &generator.update(&stamped)?)?, stamped)
            };

            let status = if affected > 0 {
                SaveStatus::Success
            } else {
                SaveStatus::Fail
            };
            let record = if existing > 0 && schema.created_at().is_some() {
                // the stored creation time wins over whatever the caller held
                self.query_records(conn, &generator.find_by(pk.name, key)?)?
                    .pop()
                    .map_or_else(|| self.rebuild(stamped), Ok)?
            } else {
                self.rebuild(stamped)?
            };
            tracing::debug!(table = generator.table(), ?status, insert = (existing == 0), "saved record");
            Ok(Saved { status, record })
        })
    }

    /// Whether no stored row shares the record's primary key.
    pub fn is_unique(&self, record: &R) -> Result<bool> {
        let schema = self.schema();
        let values = record.values();
        let found = values.len();
        let key = values
            .into_iter()
            .nth(schema.primary_key_index())
            .ok_or(OrmError::ArityMismatch {
                record: schema.record(),
                expected: schema.len(),
                found,
            })?;
        Ok(self.count_by(schema.primary_key().name, key)? == 0)
    }

    pub fn count_by(&self, field: &str, value: impl Into<Value>) -> Result<u64> {
        let value = value.into();
        self.with_connection(|conn, generator| count(conn, &generator.count_by(field, value)?))
    }

    pub fn find_by(&self, field: &str, value: impl Into<Value>) -> Result<Vec<R>> {
        let value = value.into();
        self.with_connection(|conn, generator| {
            self.query_records(conn, &generator.find_by(field, value)?)
        })
    }

    /// Deletes matching rows and returns how many were removed.
    pub fn delete_by(&self, field: &str, value: impl Into<Value>) -> Result<usize> {
        let value = value.into();
        self.with_connection(|conn, generator| execute(conn, &generator.delete_by(field, value)?))
    }

    pub fn load_all(&self) -> Result<Vec<R>> {
        self.with_connection(|conn, generator| self.query_records(conn, &generator.load_all()))
    }

    /// Deletes every row. `T` must be the record type this interactor is
    /// bound to; otherwise nothing is touched and `TypeMismatch` is returned.
    pub fn delete_all<T: Record>(&self) -> Result<usize> {
        if TypeId::of::<T>() != TypeId::of::<R>() {
            return Err(OrmError::TypeMismatch {
                expected: R::type_name(),
                found: T::type_name(),
            });
        }
        self.with_connection(|conn, generator| execute(conn, &generator.delete_all()))
    }

    /// Drops the table. Later operations fail until it is recreated.
    pub fn drop_table(&self) -> Result<()> {
        self.with_connection(|conn, generator| {
            execute(conn, &generator.table_drop())?;
            tracing::info!(table = generator.table(), "dropped table");
            Ok(())
        })
    }

    /// Recreates the table if it is missing.
    pub fn create_table(&self) -> Result<()> {
        self.with_connection(|conn, generator| {
            execute(conn, &generator.table_creation()?)?;
            Ok(())
        })
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&Connection, &Generator) -> Result<T>,
    ) -> Result<T> {
        let mut session = self.session.lock();
        let connection = session.acquire(
            self.provider.as_ref(),
            self.reconnect,
            self.generator.table(),
            &self.creation,
        )?;
        op(connection, &self.generator)
    }

    fn query_records(&self, conn: &Connection, query: &SqlQuery) -> Result<Vec<R>> {
        let mut statement = conn.prepare(&query.statement)?;
        let mut rows = statement.query(params_from_iter(query.params.values.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(self.reconstruct(row)?);
        }
        Ok(records)
    }

    /// Reads one value per field, by column name, converted to the field's type.
    fn reconstruct(&self, row: &Row<'_>) -> Result<R> {
        let schema = self.schema();
        let mut values = Vec::with_capacity(schema.len());
        for field in schema.fields() {
            let cell = row.get_ref(field.name)?;
            let value = Value::from_cell(cell, field.ty).map_err(|reason| OrmError::Conversion {
                field: field.name.to_string(),
                expected: field.ty,
                reason,
            })?;
            values.push(value);
        }
        self.rebuild(values)
    }

    fn rebuild(&self, values: Vec<Value>) -> Result<R> {
        R::from_values(Values::new(self.schema(), values)?)
    }
}

fn execute(conn: &Connection, query: &SqlQuery) -> Result<usize> {
    Ok(conn.execute(&query.statement, params_from_iter(query.params.values.iter()))?)
}

fn count(conn: &Connection, query: &SqlQuery) -> Result<u64> {
    let count: i64 = conn.query_row(
        &query.statement,
        params_from_iter(query.params.values.iter()),
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDescriptor;
    use crate::sqlite::{FnConnectionProvider, SqliteConnectionProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::NamedTempFile;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Member {
        member_id: i64,
        xp: i64,
        level: i32,
    }

    impl Record for Member {
        fn fields() -> Vec<FieldDescriptor> {
            vec![
                FieldDescriptor::of::<i64>("member_id").primary_key(),
                FieldDescriptor::of::<i64>("xp"),
                FieldDescriptor::of::<i32>("level"),
            ]
        }

        fn values(&self) -> Vec<Value> {
            vec![self.member_id.into(), self.xp.into(), self.level.into()]
        }

        fn from_values(mut values: Values) -> Result<Self> {
            Ok(Self {
                member_id: values.take()?,
                xp: values.take()?,
                level: values.take()?,
            })
        }
    }

    fn member(member_id: i64, xp: i64, level: i32) -> Member {
        Member {
            member_id,
            xp,
            level,
        }
    }

    fn file_interactor(file: &NamedTempFile, config: &OrmConfig) -> Interactor<Member> {
        let provider = SqliteConnectionProvider::new(file.path().to_str().unwrap());
        Interactor::new(Arc::new(provider), config).unwrap()
    }

    #[test]
    fn save_inserts_then_updates() {
        let file = NamedTempFile::new().unwrap();
        let members = file_interactor(&file, &OrmConfig::default());

        let first = members.save(member(0, 10, 1)).unwrap();
        assert_eq!(first.status, SaveStatus::Success);
        let second = members.save(member(0, 20, 2)).unwrap();
        assert!(second.is_success());

        assert_eq!(members.count_by("member_id", 0).unwrap(), 1);
        assert_eq!(members.find_by("member_id", 0).unwrap(), vec![member(0, 20, 2)]);
    }

    #[test]
    fn reconnects_after_disconnect() {
        let file = NamedTempFile::new().unwrap();
        let members = file_interactor(&file, &OrmConfig::default());
        members.save(member(1, 5, 1)).unwrap();

        members.disconnect();
        assert!(!members.is_connected());
        assert_eq!(members.load_all().unwrap(), vec![member(1, 5, 1)]);
        assert!(members.is_connected());
    }

    #[test]
    fn disconnected_without_reconnect() {
        let file = NamedTempFile::new().unwrap();
        let members = file_interactor(&file, &OrmConfig::default().with_reconnect(false));
        members.disconnect();
        assert!(matches!(members.load_all(), Err(OrmError::Disconnected)));
    }

    #[test]
    fn provider_is_asked_once_per_reconnect() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let opened = Arc::new(AtomicUsize::new(0));
        let counter = opened.clone();
        let provider = FnConnectionProvider::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Connection::open(&path)
        });
        let members: Interactor<Member> =
            Interactor::new(Arc::new(provider), &OrmConfig::default()).unwrap();
        members.load_all().unwrap();
        members.load_all().unwrap();
        assert_eq!(opened.load(Ordering::SeqCst), 1);

        members.disconnect();
        members.load_all().unwrap();
        assert_eq!(opened.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn drop_and_recreate_table() {
        let file = NamedTempFile::new().unwrap();
        let members = file_interactor(&file, &OrmConfig::default());
        members.save(member(3, 1, 1)).unwrap();
        members.drop_table().unwrap();
        assert!(matches!(members.load_all(), Err(OrmError::Sqlite(_))));
        members.create_table().unwrap();
        assert!(members.load_all().unwrap().is_empty());
    }

    #[test]
    fn is_unique_checks_primary_key() {
        let file = NamedTempFile::new().unwrap();
        let members = file_interactor(&file, &OrmConfig::default());
        assert!(members.is_unique(&member(9, 0, 0)).unwrap());
        members.save(member(9, 0, 0)).unwrap();
        assert!(!members.is_unique(&member(9, 1, 1)).unwrap());
    }

    #[test]
    fn memory_database_survives_reconnect() {
        let members: Interactor<Member> = Interactor::new(
            Arc::new(SqliteConnectionProvider::in_memory()),
            &OrmConfig::default(),
        )
        .unwrap();
        members.save(member(1, 1, 1)).unwrap();

        members.disconnect();
        assert!(members.save(member(2, 1, 1)).unwrap().is_success());
        let mut loaded = members.load_all().unwrap();
        loaded.sort_by_key(|m| m.member_id);
        assert_eq!(loaded, vec![member(1, 1, 1), member(2, 1, 1)]);
    }

    #[test]
    fn reconnect_creates_the_table_when_missing() {
        let first = NamedTempFile::new().unwrap();
        let second = NamedTempFile::new().unwrap();
        let paths = [
            first.path().to_str().unwrap().to_string(),
            second.path().to_str().unwrap().to_string(),
        ];
        let opened = AtomicUsize::new(0);
        let provider = FnConnectionProvider::new(move || {
            let n = opened.fetch_add(1, Ordering::SeqCst).min(1);
            Connection::open(&paths[n])
        });
        let members: Interactor<Member> =
            Interactor::new(Arc::new(provider), &OrmConfig::default()).unwrap();
        members.save(member(1, 1, 1)).unwrap();

        members.disconnect();
        assert!(members.load_all().unwrap().is_empty());
        members.save(member(2, 2, 2)).unwrap();
        assert_eq!(members.find_by("member_id", 2).unwrap(), vec![member(2, 2, 2)]);
    }

    #[test]
    fn failed_reconnect_is_a_connection_error() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let opened = AtomicUsize::new(0);
        let provider = FnConnectionProvider::new(move || {
            if opened.fetch_add(1, Ordering::SeqCst) == 0 {
                Connection::open(&path)
            } else {
                Err(rusqlite::Error::InvalidPath("gone".into()))
            }
        });
        let members: Interactor<Member> =
            Interactor::new(Arc::new(provider), &OrmConfig::default()).unwrap();
        members.save(member(1, 1, 1)).unwrap();

        members.disconnect();
        assert!(matches!(members.load_all(), Err(OrmError::Connection(_))));
        assert!(!members.is_connected());
    }

    /// Declares its key last but never produces a value for it.
    #[derive(Debug, Default)]
    struct Truncated {
        name: String,
        level: i32,
    }

    impl Record for Truncated {
        fn fields() -> Vec<FieldDescriptor> {
            vec![
                FieldDescriptor::of::<String>("name"),
                FieldDescriptor::of::<i32>("level"),
                FieldDescriptor::of::<i64>("id").primary_key(),
            ]
        }

        fn values(&self) -> Vec<Value> {
            vec![self.name.clone().into(), self.level.into()]
        }

        fn from_values(mut values: Values) -> Result<Self> {
            Ok(Self {
                name: values.take()?,
                level: values.take()?,
            })
        }
    }

    #[test]
    fn short_values_report_their_length() {
        let file = NamedTempFile::new().unwrap();
        let provider = SqliteConnectionProvider::new(file.path().to_str().unwrap());
        let truncated: Interactor<Truncated> =
            Interactor::new(Arc::new(provider), &OrmConfig::default()).unwrap();

        for result in [
            truncated.is_unique(&Truncated::default()).map(|_| ()),
            truncated.save(Truncated::default()).map(|_| ()),
        ] {
            assert!(matches!(
                result,
                Err(OrmError::ArityMismatch {
                    record: "Truncated",
                    expected: 3,
                    found: 2
                })
            ));
        }
    }
}
