//! The contract a user type implements to be persisted.
//!
//! Instead of inspecting fields at runtime, a record type supplies its
//! descriptor table and converts itself to and from an ordered list of
//! [`Value`]s, one per descriptor.
//!
//! ```
//! use chrono::NaiveDateTime;
//! use rust_sqlite_orm::{FieldDescriptor, Record, Result, Value, Values};
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Member {
//!     member_id: i64,
//!     xp: i64,
//!     created_at: NaiveDateTime,
//! }
//!
//! impl Record for Member {
//!     fn fields() -> Vec<FieldDescriptor> {
//!         vec![
//!             FieldDescriptor::of::<i64>("member_id").primary_key(),
//!             FieldDescriptor::of::<i64>("xp"),
//!             FieldDescriptor::of::<NaiveDateTime>("created_at").created_at(),
//!         ]
//!     }
//!
//!     fn values(&self) -> Vec<Value> {
//!         vec![self.member_id.into(), self.xp.into(), self.created_at.into()]
//!     }
//!
//!     fn from_values(mut values: Values) -> Result<Self> {
//!         Ok(Self {
//!             member_id: values.take()?,
//!             xp: values.take()?,
//!             created_at: values.take()?,
//!         })
//!     }
//! }
//!
//! assert_eq!(rust_sqlite_orm::naming::table_name::<Member>(), "members");
//! ```

use std::collections::VecDeque;

use crate::error::{OrmError, Result};
use crate::naming;
use crate::schema::{FieldDescriptor, RecordSchema};
use crate::value::{FieldType, Value};

pub trait Record: Default + Send + Sized + 'static {
    /// Explicit table name. When `None` the name is derived from
    /// [`Record::type_name`].
    const TABLE_NAME: Option<&'static str> = None;

    /// Ordered field descriptors. Must list exactly one primary key.
    fn fields() -> Vec<FieldDescriptor>;

    /// Field values in the same order as [`Record::fields`].
    fn values(&self) -> Vec<Value>;

    /// Rebuilds an instance from values in [`Record::fields`] order.
    fn from_values(values: Values) -> Result<Self>;

    fn type_name() -> &'static str {
        naming::simple_type_name(std::any::type_name::<Self>())
    }
}

/// Field values handed to [`Record::from_values`], consumed front to back.
#[derive(Debug)]
pub struct Values {
    record: &'static str,
    fields: usize,
    taken: usize,
    entries: VecDeque<(FieldDescriptor, Value)>,
}

impl Values {
    pub fn new(schema: &RecordSchema, values: Vec<Value>) -> Result<Self> {
        if values.len() != schema.len() {
            return Err(OrmError::ArityMismatch {
                record: schema.record(),
                expected: schema.len(),
                found: values.len(),
            });
        }
        Ok(Self {
            record: schema.record(),
            fields: schema.len(),
            taken: 0,
            entries: schema.fields().iter().cloned().zip(values).collect(),
        })
    }

    pub fn record(&self) -> &'static str {
        self.record
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Takes the next value as `T`. Taking more values than the record has
    /// fields is an `ArityMismatch` counting every take so far.
    pub fn take<T: FieldType>(&mut self) -> Result<T> {
        self.taken += 1;
        let (field, value) = self.entries.pop_front().ok_or(OrmError::ArityMismatch {
            record: self.record,
            expected: self.fields,
            found: self.taken,
        })?;
        let reason = match value.semantic_type() {
            Some(ty) => format!("found {ty:?} value"),
            None => "found null value".to_string(),
        };
        T::from_value(value).ok_or_else(|| OrmError::Conversion {
            field: field.name.to_string(),
            expected: T::SEMANTIC,
            reason,
        })
    }
}
