use crate::error::{OrmError, Result};
use crate::schema::{FieldDescriptor, SemanticType};

/// Column type keyword for a field's semantic type.
///
/// `Bool` and `Bytes` have no mapping; a table declaring them cannot be built.
pub fn column_type(field: &FieldDescriptor) -> Result<&'static str> {
    match field.ty {
        SemanticType::Int64 => Ok("int8"),
        SemanticType::Int32 => Ok("int4"),
        SemanticType::Int16 => Ok("smallint"),
        SemanticType::Text => Ok("text"),
        SemanticType::DateTime => Ok("timestamp"),
        SemanticType::Float32 => Ok("float4"),
        SemanticType::Float64 => Ok("float8"),
        SemanticType::Bool | SemanticType::Bytes => Err(OrmError::UnsupportedType {
            field: field.name.to_string(),
            ty: field.ty,
        }),
    }
}
