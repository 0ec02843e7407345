//! Record mapping and SQL statement generation over SQLite.
//!
//! # Intention
//!
//! - Persist user-defined record types to one table each, without
//!   hand-written SQL.
//! - Derive the table schema and every statement from a per-type descriptor
//!   table ([`Record::fields`]).
//! - Rebuild typed records from result rows, filling in creation and update
//!   timestamps on save.
//!
//! # Architectural Boundaries
//!
//! - [`sql::Generator`] only builds statements; it never executes them.
//! - [`Interactor`] owns the connection for one record type and is the only
//!   place statements run.
//! - [`Registry`] routes by record type and owns nothing else.
//! - No pooling, transactions or migrations beyond `CREATE TABLE IF NOT EXISTS`.

pub mod config;
pub mod error;
pub mod interactor;
pub mod naming;
pub mod record;
pub mod registry;
pub mod schema;
pub mod sql;
pub mod sqlite;
pub mod trace;
pub mod types;
pub mod value;

pub use config::OrmConfig;
pub use error::{OrmError, Result};
pub use interactor::{Interactor, SaveStatus, Saved};
pub use record::{Record, Values};
pub use registry::Registry;
pub use schema::{FieldDescriptor, FieldRole, RecordSchema, SemanticType};
pub use sql::{Generator, Params, SqlQuery};
pub use sqlite::{ConnectionProvider, FnConnectionProvider, SqliteConnectionProvider};
pub use value::{FieldType, Value};
