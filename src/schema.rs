//! Field metadata for record types.
//!
//! A record type describes itself once through an ordered list of
//! [`FieldDescriptor`]s. [`RecordSchema`] validates that list and classifies
//! each field by role so the generator never has to search for the key or
//! the timestamp columns again.

use crate::error::{OrmError, Result};
use crate::record::Record;
use crate::value::FieldType;

/// Semantic type of a persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    DateTime,
    Bool,
    Bytes,
}

/// Role a field plays in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldRole {
    PrimaryKey,
    CreatedAt,
    UpdatedAt,
    #[default]
    Plain,
}

/// Per-field metadata: column name, semantic type and role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub ty: SemanticType,
    pub role: FieldRole,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, ty: SemanticType) -> Self {
        Self {
            name,
            ty,
            role: FieldRole::Plain,
        }
    }

    /// Descriptor whose semantic type is taken from the Rust field type.
    pub fn of<T: FieldType>(name: &'static str) -> Self {
        Self::new(name, T::SEMANTIC)
    }

    pub fn primary_key(self) -> Self {
        self.with_role(FieldRole::PrimaryKey)
    }

    pub fn created_at(self) -> Self {
        self.with_role(FieldRole::CreatedAt)
    }

    pub fn updated_at(self) -> Self {
        self.with_role(FieldRole::UpdatedAt)
    }

    pub fn with_role(mut self, role: FieldRole) -> Self {
        self.role = role;
        self
    }

    pub fn is_timestamp(&self) -> bool {
        matches!(self.role, FieldRole::CreatedAt | FieldRole::UpdatedAt)
    }
}

/// Validated, role-classified field list of one record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    record: &'static str,
    fields: Vec<FieldDescriptor>,
    primary_key: usize,
    created_at: Option<usize>,
    updated_at: Option<usize>,
}

impl RecordSchema {
    /// Reads and validates the descriptor table of `R`.
    pub fn extract<R: Record>() -> Result<Self> {
        Self::from_fields(R::type_name(), R::fields())
    }

    pub fn from_fields(record: &'static str, fields: Vec<FieldDescriptor>) -> Result<Self> {
        let mut primary_key = None;
        let mut created_at = None;
        let mut updated_at = None;

        for (index, field) in fields.iter().enumerate() {
            if fields[..index].iter().any(|f| f.name == field.name) {
                return Err(OrmError::DuplicateField {
                    record,
                    field: field.name.to_string(),
                });
            }
            let slot = match field.role {
                FieldRole::PrimaryKey => &mut primary_key,
                FieldRole::CreatedAt => &mut created_at,
                FieldRole::UpdatedAt => &mut updated_at,
                FieldRole::Plain => continue,
            };
            if let Some(previous) = *slot {
                let previous: &FieldDescriptor = &fields[previous];
                return Err(OrmError::AmbiguousRole {
                    record,
                    role: field.role,
                    first: previous.name.to_string(),
                    second: field.name.to_string(),
                });
            }
            if field.is_timestamp() && field.ty != SemanticType::DateTime {
                return Err(OrmError::InvalidTimestampField {
                    record,
                    field: field.name.to_string(),
                    role: field.role,
                    found: field.ty,
                });
            }
            *slot = Some(index);
        }

        let primary_key = primary_key.ok_or(OrmError::MissingPrimaryKey { record })?;
        Ok(Self {
            record,
            fields,
            primary_key,
            created_at,
            updated_at,
        })
    }

    pub fn record(&self) -> &'static str {
        self.record
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn primary_key(&self) -> &FieldDescriptor {
        &self.fields[self.primary_key]
    }

    pub fn primary_key_index(&self) -> usize {
        self.primary_key
    }

    pub fn created_at(&self) -> Option<&FieldDescriptor> {
        self.created_at.map(|i| &self.fields[i])
    }

    pub fn created_at_index(&self) -> Option<usize> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<&FieldDescriptor> {
        self.updated_at.map(|i| &self.fields[i])
    }

    pub fn updated_at_index(&self) -> Option<usize> {
        self.updated_at
    }

    /// Plain fields in declaration order, with their positions.
    pub fn plain(&self) -> impl Iterator<Item = (usize, &FieldDescriptor)> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.role == FieldRole::Plain)
    }

    /// Looks up a field by name, failing if `R` does not declare it.
    pub fn field(&self, name: &str) -> Result<(usize, &FieldDescriptor)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
            .ok_or_else(|| OrmError::IllegalField {
                record: self.record,
                field: name.to_string(),
            })
    }
}
