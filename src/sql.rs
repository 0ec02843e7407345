//! SQL statement generation from record metadata.
//!
//! # Intention
//!
//! - Build every statement the interactor runs from one [`RecordSchema`].
//! - Keep values out of statement text: everything the caller supplies is a
//!   positional `?N` parameter carried in [`Params`].
//!
//! The generator is side-effect free apart from the verbose statement trace.
//! Timestamp stamping is a separate step ([`Generator::stamp_for_insert`],
//! [`Generator::stamp_for_update`]) that returns new values instead of
//! touching the caller's record.

use chrono::NaiveDateTime;

use crate::error::{OrmError, Result};
use crate::naming::{self, quote_ident};
use crate::record::Record;
use crate::schema::{FieldDescriptor, FieldRole, RecordSchema};
use crate::trace;
use crate::types::column_type;
use crate::value::Value;

/// Positional parameter bindings for SQL queries
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    pub values: Vec<Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value and returns its `?N` placeholder.
    pub fn push(&mut self, value: Value) -> String {
        self.values.push(value);
        format!("?{}", self.values.len())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// SQL statement with its parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub statement: String,
    pub params: Params,
}

impl SqlQuery {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            params: Params::new(),
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

/// Builds the statements for one record type.
#[derive(Debug, Clone)]
pub struct Generator {
    schema: RecordSchema,
    table: String,
    defaults: Vec<Value>,
}

impl Generator {
    /// `defaults` are the field values of a zero-valued instance, in field order.
    pub fn new(schema: RecordSchema, table: impl Into<String>, defaults: Vec<Value>) -> Self {
        Self {
            schema,
            table: table.into(),
            defaults,
        }
    }

    pub fn for_record<R: Record>() -> Result<Self> {
        let schema = RecordSchema::extract::<R>()?;
        let defaults = R::default().values();
        Ok(Self::new(schema, naming::table_name::<R>(), defaults))
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `CREATE TABLE IF NOT EXISTS` with the primary key first, plain fields in
    /// declaration order, then the creation and update timestamps.
    pub fn table_creation(&self) -> Result<SqlQuery> {
        let pk = self.schema.primary_key();
        let mut columns = vec![format!("{} PRIMARY KEY", column_line(pk)?)];
        for (index, field) in self.schema.plain() {
            let mut line = column_line(field)?;
            if let Some(default) = self.defaults.get(index).filter(|v| !v.is_null()) {
                line.push_str(" DEFAULT ");
                line.push_str(&default.literal());
            }
            columns.push(line);
        }
        for field in [self.schema.created_at(), self.schema.updated_at()]
            .into_iter()
            .flatten()
        {
            columns.push(column_line(field)?);
        }
        let statement = format!(
            "CREATE TABLE IF NOT EXISTS {} ({});",
            quote_ident(&self.table),
            columns.join(", ")
        );
        Ok(self.emit(SqlQuery::new(statement)))
    }

    pub fn table_drop(&self) -> SqlQuery {
        self.emit(SqlQuery::new(format!(
            "DROP TABLE IF EXISTS {};",
            quote_ident(&self.table)
        )))
    }

    pub fn count_by(&self, field: &str, value: impl Into<Value>) -> Result<SqlQuery> {
        self.filtered("SELECT COUNT(*) FROM", field, value.into())
    }

    pub fn find_by(&self, field: &str, value: impl Into<Value>) -> Result<SqlQuery> {
        self.filtered("SELECT * FROM", field, value.into())
    }

    pub fn delete_by(&self, field: &str, value: impl Into<Value>) -> Result<SqlQuery> {
        self.filtered("DELETE FROM", field, value.into())
    }

    pub fn load_all(&self) -> SqlQuery {
        self.emit(SqlQuery::new(format!(
            "SELECT * FROM {}",
            quote_ident(&self.table)
        )))
    }

    pub fn delete_all(&self) -> SqlQuery {
        self.emit(SqlQuery::new(format!(
            "DELETE FROM {}",
            quote_ident(&self.table)
        )))
    }

    /// `INSERT` of every field. `values` should already be stamped.
    pub fn write(&self, values: &[Value]) -> Result<SqlQuery> {
        self.check_arity(values)?;
        let mut params = Params::new();
        let mut columns = Vec::with_capacity(values.len());
        let mut placeholders = Vec::with_capacity(values.len());
        for (field, value) in self.schema.fields().iter().zip(values) {
            columns.push(quote_ident(field.name));
            placeholders.push(params.push(bind(field, value)?));
        }
        let statement = format!(
            "INSERT INTO {} ({}) VALUES ({});",
            quote_ident(&self.table),
            columns.join(", "),
            placeholders.join(", ")
        );
        Ok(self.emit(SqlQuery::new(statement).with_params(params)))
    }

    /// `UPDATE` of every field except the creation timestamp, keyed by the
    /// primary key. `values` should already be stamped.
    pub fn update(&self, values: &[Value]) -> Result<SqlQuery> {
        self.check_arity(values)?;
        let mut params = Params::new();
        let mut assignments = Vec::with_capacity(values.len());
        for (field, value) in self.schema.fields().iter().zip(values) {
            if field.role == FieldRole::CreatedAt {
                continue;
            }
            let placeholder = params.push(bind(field, value)?);
            assignments.push(format!("{} = {}", quote_ident(field.name), placeholder));
        }
        let pk = self.schema.primary_key();
        let key = params.push(bind(pk, &values[self.schema.primary_key_index()])?);
        let statement = format!(
            "UPDATE {} SET {} WHERE {} = {};",
            quote_ident(&self.table),
            assignments.join(", "),
            quote_ident(pk.name),
            key
        );
        Ok(self.emit(SqlQuery::new(statement).with_params(params)))
    }

    /// Values to persist for a new row: both timestamps set to `now`.
    pub fn stamp_for_insert(&self, values: &[Value], now: NaiveDateTime) -> Vec<Value> {
        let mut stamped = values.to_vec();
        for index in [self.schema.created_at_index(), self.schema.updated_at_index()]
            .into_iter()
            .flatten()
        {
            if let Some(slot) = stamped.get_mut(index) {
                *slot = Value::DateTime(now);
            }
        }
        stamped
    }

    /// Values to persist for an existing row: only the update timestamp moves.
    pub fn stamp_for_update(&self, values: &[Value], now: NaiveDateTime) -> Vec<Value> {
        let mut stamped = values.to_vec();
        if let Some(slot) = self
            .schema
            .updated_at_index()
            .and_then(|index| stamped.get_mut(index))
        {
            *slot = Value::DateTime(now);
        }
        stamped
    }

    fn filtered(&self, head: &str, field: &str, value: Value) -> Result<SqlQuery> {
        let (_, descriptor) = self.schema.field(field)?;
        let mut params = Params::new();
        let placeholder = params.push(bind(descriptor, &value)?);
        let statement = format!(
            "{} {} WHERE {} = {}",
            head,
            quote_ident(&self.table),
            quote_ident(descriptor.name),
            placeholder
        );
        Ok(self.emit(SqlQuery::new(statement).with_params(params)))
    }

    fn check_arity(&self, values: &[Value]) -> Result<()> {
        if values.len() != self.schema.len() {
            return Err(OrmError::ArityMismatch {
                record: self.schema.record(),
                expected: self.schema.len(),
                found: values.len(),
            });
        }
        Ok(())
    }

    fn emit(&self, query: SqlQuery) -> SqlQuery {
        trace::statement(&query);
        query
    }
}

fn column_line(field: &FieldDescriptor) -> Result<String> {
    Ok(format!(
        "{} {} NOT NULL",
        quote_ident(field.name),
        column_type(field)?
    ))
}

fn bind(field: &FieldDescriptor, value: &Value) -> Result<Value> {
    value.coerce_to(field.ty).ok_or_else(|| OrmError::ValueMismatch {
        field: field.name.to_string(),
        expected: field.ty,
        found: value.semantic_type(),
    })
}
