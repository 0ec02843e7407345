use chrono::NaiveDateTime;
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};

use crate::schema::SemanticType;

/// Storage format for DateTime values, also accepted on read.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A single field value of a record instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Text(String),
    DateTime(NaiveDateTime),
    Bool(bool),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn semantic_type(&self) -> Option<SemanticType> {
        match self {
            Value::Null => None,
            Value::Int16(_) => Some(SemanticType::Int16),
            Value::Int32(_) => Some(SemanticType::Int32),
            Value::Int64(_) => Some(SemanticType::Int64),
            Value::Float32(_) => Some(SemanticType::Float32),
            Value::Float64(_) => Some(SemanticType::Float64),
            Value::Text(_) => Some(SemanticType::Text),
            Value::DateTime(_) => Some(SemanticType::DateTime),
            Value::Bool(_) => Some(SemanticType::Bool),
            Value::Bytes(_) => Some(SemanticType::Bytes),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts the value to `ty`, widening or narrowing integers and floats
    /// when the result is exact. Returns `None` for any other combination.
    pub fn coerce_to(&self, ty: SemanticType) -> Option<Value> {
        if self.semantic_type() == Some(ty) {
            return Some(self.clone());
        }
        if let Some(int) = self.as_i64() {
            return match ty {
                SemanticType::Int16 => i16::try_from(int).ok().map(Value::Int16),
                SemanticType::Int32 => i32::try_from(int).ok().map(Value::Int32),
                SemanticType::Int64 => Some(Value::Int64(int)),
                _ => None,
            };
        }
        match (self, ty) {
            (Value::Float32(f), SemanticType::Float64) => Some(Value::Float64(f64::from(*f))),
            (Value::Float64(f), SemanticType::Float32) if f64::from(*f as f32) == *f => {
                Some(Value::Float32(*f as f32))
            }
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Renders the value as an SQL literal. Only used where the engine cannot
    /// bind parameters, i.e. `DEFAULT` clauses in table definitions.
    pub fn literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Float32(v) => v.to_string(),
            Value::Float64(v) => v.to_string(),
            Value::Text(v) => quote_literal(v),
            Value::DateTime(v) => quote_literal(&v.format(TIMESTAMP_FORMAT).to_string()),
            Value::Bool(v) => (*v as i64).to_string(),
            Value::Bytes(v) => {
                let hex: String = v.iter().map(|b| format!("{b:02X}")).collect();
                format!("X'{hex}'")
            }
        }
    }

    /// Reads a result cell as the given semantic type.
    pub fn from_cell(cell: ValueRef<'_>, ty: SemanticType) -> Result<Value, String> {
        match (ty, cell) {
            (_, ValueRef::Null) => Err("column is NULL".to_string()),
            (SemanticType::Int16, ValueRef::Integer(v)) => i16::try_from(v)
                .map(Value::Int16)
                .map_err(|_| format!("{v} is out of range")),
            (SemanticType::Int32, ValueRef::Integer(v)) => i32::try_from(v)
                .map(Value::Int32)
                .map_err(|_| format!("{v} is out of range")),
            (SemanticType::Int64, ValueRef::Integer(v)) => Ok(Value::Int64(v)),
            (SemanticType::Float32, ValueRef::Real(v)) => Ok(Value::Float32(v as f32)),
            (SemanticType::Float32, ValueRef::Integer(v)) => Ok(Value::Float32(v as f32)),
            (SemanticType::Float64, ValueRef::Real(v)) => Ok(Value::Float64(v)),
            (SemanticType::Float64, ValueRef::Integer(v)) => Ok(Value::Float64(v as f64)),
            (SemanticType::Text, ValueRef::Text(bytes)) => std::str::from_utf8(bytes)
                .map(|s| Value::Text(s.to_string()))
                .map_err(|e| e.to_string()),
            (SemanticType::DateTime, ValueRef::Text(bytes)) => {
                let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
                parse_timestamp(text).map(Value::DateTime)
            }
            (SemanticType::Bool, ValueRef::Integer(v)) => Ok(Value::Bool(v != 0)),
            (SemanticType::Bytes, ValueRef::Blob(bytes)) => Ok(Value::Bytes(bytes.to_vec())),
            (_, other) => Err(format!("unexpected {:?} cell", other.data_type())),
        }
    }
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Parses the engine's timestamp text, with either a space or `T` between
/// date and time.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, String> {
    let normalized = text.trim().replacen('T', " ", 1);
    NaiveDateTime::parse_from_str(&normalized, TIMESTAMP_FORMAT)
        .map_err(|e| format!("invalid timestamp `{text}`: {e}"))
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::from(rusqlite::types::Null),
            Value::Int16(v) => ToSqlOutput::from(i64::from(*v)),
            Value::Int32(v) => ToSqlOutput::from(i64::from(*v)),
            Value::Int64(v) => ToSqlOutput::from(*v),
            Value::Float32(v) => ToSqlOutput::from(f64::from(*v)),
            Value::Float64(v) => ToSqlOutput::from(*v),
            Value::Text(v) => ToSqlOutput::from(v.as_str()),
            Value::DateTime(v) => ToSqlOutput::from(v.format(TIMESTAMP_FORMAT).to_string()),
            Value::Bool(v) => ToSqlOutput::from(*v),
            Value::Bytes(v) => ToSqlOutput::from(v.as_slice()),
        })
    }
}

/// Rust types that can back a record field.
pub trait FieldType: Sized {
    const SEMANTIC: SemanticType;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! field_type {
    ($ty:ty, $variant:ident) => {
        impl FieldType for $ty {
            const SEMANTIC: SemanticType = SemanticType::$variant;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value.coerce_to(SemanticType::$variant)? {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant(value)
            }
        }
    };
}

field_type!(i16, Int16);
field_type!(i32, Int32);
field_type!(i64, Int64);
field_type!(f32, Float32);
field_type!(f64, Float64);
field_type!(String, Text);
field_type!(NaiveDateTime, DateTime);
field_type!(bool, Bool);
field_type!(Vec<u8>, Bytes);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}
