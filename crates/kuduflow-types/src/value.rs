//! Runtime record values.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::record::RecordSchema;

/// A single field value of a [`StructuredRecord`].
///
/// Byte fields may arrive either as an owned byte vector or as a shared
/// buffer; both are accepted wherever a `bytes` value is expected.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Bytes(Vec<u8>),
    Buffer(Bytes),
    String(String),
    Array(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Short type label used in mismatch messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Int32(_) => "int",
            Self::Int64(_) => "long",
            Self::Float32(_) => "float",
            Self::Float64(_) => "double",
            Self::Bytes(_) => "bytes",
            Self::Buffer(_) => "buffer",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Self::Buffer(v) => write!(f, "<{} bytes>", v.len()),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Array(v) => write!(f, "<array of {}>", v.len()),
            Self::Map(v) => write!(f, "<map of {}>", v.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Self::Buffer(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// One row of pipeline data: a schema plus a value per field.
///
/// Fields that were never set read back as [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRecord {
    schema: Arc<RecordSchema>,
    values: Vec<Value>,
}

impl StructuredRecord {
    #[must_use]
    pub fn builder(schema: Arc<RecordSchema>) -> StructuredRecordBuilder {
        let values = vec![Value::Null; schema.fields().len()];
        StructuredRecordBuilder { schema, values }
    }

    #[must_use]
    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Value of the named field, or `None` if the schema has no such field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema
            .fields()
            .iter()
            .position(|f| f.name == name)
            .map(|i| &self.values[i])
    }

    /// Iterate `(field name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .zip(self.values.iter())
    }
}

/// Builder for [`StructuredRecord`].
#[derive(Debug)]
pub struct StructuredRecordBuilder {
    schema: Arc<RecordSchema>,
    values: Vec<Value>,
}

impl StructuredRecordBuilder {
    /// Set a field value. Names that are not part of the schema are ignored.
    #[must_use]
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        if let Some(i) = self.schema.fields().iter().position(|f| f.name == name) {
            self.values[i] = value.into();
        }
        self
    }

    #[must_use]
    pub fn build(self) -> StructuredRecord {
        StructuredRecord {
            schema: self.schema,
            values: self.values,
        }
    }
}
