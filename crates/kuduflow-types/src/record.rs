//! Structured-record schema as exchanged with the orchestrating framework.
//!
//! A [`RecordSchema`] is parsed from the framework's JSON schema document:
//!
//! ```json
//! {"type":"record","name":"etlSchemaBody","fields":[
//!   {"name":"id","type":"long"},
//!   {"name":"name","type":["string","null"]}
//! ]}
//! ```
//!
//! Only the seven primitive types can be mapped to storage columns. Every other
//! type expression (nested records, arrays, maps, enums, logical types, unions
//! that are more than a nullable wrapper) is kept as [`FieldType::Complex`] so
//! callers can decide whether to reject or skip it.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};

/// Primitive field type of a structured record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "int")]
    Int32,
    #[serde(rename = "long")]
    Int64,
    #[serde(rename = "float")]
    Float32,
    #[serde(rename = "double")]
    Float64,
    #[serde(rename = "bytes")]
    Bytes,
    #[serde(rename = "string")]
    String,
}

impl PrimitiveType {
    pub const ALL: [Self; 7] = [
        Self::Boolean,
        Self::Int32,
        Self::Int64,
        Self::Float32,
        Self::Float64,
        Self::Bytes,
        Self::String,
    ];

    /// Type name used in the JSON schema document.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int32 => "int",
            Self::Int64 => "long",
            Self::Float32 => "float",
            Self::Float64 => "double",
            Self::Bytes => "bytes",
            Self::String => "string",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a type expression that is not a primitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComplexKind {
    Null,
    Record,
    Array,
    Map,
    Enum,
    Fixed,
    Union,
    /// Primitive carrying a `logicalType` annotation (decimal, timestamp-micros, ...).
    Logical(String),
}

impl fmt::Display for ComplexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Record => f.write_str("record"),
            Self::Array => f.write_str("array"),
            Self::Map => f.write_str("map"),
            Self::Enum => f.write_str("enum"),
            Self::Fixed => f.write_str("fixed"),
            Self::Union => f.write_str("union"),
            Self::Logical(name) => write!(f, "logical type '{name}'"),
        }
    }
}

/// Resolved type of a field, after unwrapping a single nullable wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Primitive(PrimitiveType),
    /// Anything else. `raw` is the original type expression, kept so the
    /// schema prints back unchanged.
    Complex { kind: ComplexKind, raw: Json },
}

impl FieldType {
    #[must_use]
    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self {
            Self::Primitive(p) => Some(*p),
            Self::Complex { .. } => None,
        }
    }

    fn to_json(&self) -> Json {
        match self {
            Self::Primitive(p) => Json::String(p.as_str().to_string()),
            Self::Complex { raw, .. } => raw.clone(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => p.fmt(f),
            Self::Complex { kind, .. } => kind.fmt(f),
        }
    }
}

/// One named field of a [`RecordSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
}

impl FieldDescriptor {
    /// Field of a primitive type.
    #[must_use]
    pub fn new(name: impl Into<String>, primitive: PrimitiveType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Primitive(primitive),
            nullable,
        }
    }

    #[must_use]
    pub fn with_type(name: impl Into<String>, field_type: FieldType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable,
        }
    }

    /// The primitive type, or `None` when the field is not representable as a column.
    #[must_use]
    pub fn primitive(&self) -> Option<PrimitiveType> {
        self.field_type.primitive()
    }

    fn to_json(&self) -> Json {
        let type_expr = self.field_type.to_json();
        let type_expr = if self.nullable {
            json!([type_expr, "null"])
        } else {
            type_expr
        };
        json!({ "name": self.name, "type": type_expr })
    }
}

/// Errors from parsing a schema document.
#[derive(Debug, thiserror::Error)]
pub enum SchemaParseError {
    #[error("schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schema must be an object with \"type\": \"record\"")]
    NotARecord,
    #[error("schema is missing '{0}'")]
    MissingAttribute(&'static str),
    #[error("field {index}: {reason}")]
    InvalidField { index: usize, reason: String },
    #[error("field name '{0}' appears more than once")]
    DuplicateField(String),
}

/// Ordered, named list of fields describing one structured record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl RecordSchema {
    /// Build a schema, rejecting duplicate field names.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaParseError::DuplicateField`] when two fields share a name.
    pub fn new(
        name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, SchemaParseError> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaParseError::DuplicateField(field.name.clone()));
            }
        }
        Ok(Self {
            name: name.into(),
            fields,
        })
    }

    /// Parse the framework's JSON schema text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON, is not a record schema, or
    /// contains a field whose type expression cannot be read.
    pub fn parse_json(text: &str) -> Result<Self, SchemaParseError> {
        let doc: Json = serde_json::from_str(text)?;
        Self::from_json(&doc)
    }

    /// Parse an already-decoded JSON schema document.
    ///
    /// # Errors
    ///
    /// See [`RecordSchema::parse_json`].
    pub fn from_json(doc: &Json) -> Result<Self, SchemaParseError> {
        let obj = doc.as_object().ok_or(SchemaParseError::NotARecord)?;
        if obj.get("type").and_then(Json::as_str) != Some("record") {
            return Err(SchemaParseError::NotARecord);
        }
        let name = obj
            .get("name")
            .and_then(Json::as_str)
            .ok_or(SchemaParseError::MissingAttribute("name"))?;
        let raw_fields = obj
            .get("fields")
            .and_then(Json::as_array)
            .ok_or(SchemaParseError::MissingAttribute("fields"))?;

        let fields = raw_fields
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                parse_field(raw).map_err(|reason| SchemaParseError::InvalidField { index, reason })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(name, fields)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Render the schema back into the framework's JSON form.
    #[must_use]
    pub fn to_json(&self) -> Json {
        json!({
            "type": "record",
            "name": self.name,
            "fields": self.fields.iter().map(FieldDescriptor::to_json).collect::<Vec<_>>(),
        })
    }
}

impl fmt::Display for RecordSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

fn parse_field(raw: &Json) -> Result<FieldDescriptor, String> {
    let obj = raw
        .as_object()
        .ok_or_else(|| "field must be a JSON object".to_string())?;
    let name = obj
        .get("name")
        .and_then(Json::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| "field is missing a non-empty 'name'".to_string())?;
    let type_expr = obj
        .get("type")
        .ok_or_else(|| format!("field '{name}' is missing 'type'"))?;
    let (field_type, nullable) =
        parse_type(type_expr).map_err(|e| format!("field '{name}': {e}"))?;
    Ok(FieldDescriptor::with_type(name, field_type, nullable))
}

/// Parse a type expression into its resolved type and nullability.
///
/// A two-member union with `"null"` is unwrapped once. A union that wraps
/// another nullable union is left as [`ComplexKind::Union`].
fn parse_type(expr: &Json) -> Result<(FieldType, bool), String> {
    match expr {
        Json::String(name) => Ok((parse_named(name, expr)?, false)),
        Json::Array(members) => {
            let non_null: Vec<&Json> = members
                .iter()
                .filter(|m| m.as_str() != Some("null"))
                .collect();
            if members.len() == 2 && non_null.len() == 1 {
                let (inner, inner_nullable) = parse_type(non_null[0])?;
                if !inner_nullable {
                    return Ok((inner, true));
                }
            }
            Ok((complex(ComplexKind::Union, expr), false))
        }
        Json::Object(obj) => parse_object_type(obj, expr),
        other => Err(format!("unsupported type expression {other}")),
    }
}

fn parse_object_type(obj: &Map<String, Json>, expr: &Json) -> Result<(FieldType, bool), String> {
    if let Some(logical) = obj.get("logicalType").and_then(Json::as_str) {
        return Ok((complex(ComplexKind::Logical(logical.to_string()), expr), false));
    }
    match obj.get("type") {
        Some(Json::String(t)) => {
            let kind = match t.as_str() {
                "record" => ComplexKind::Record,
                "array" => ComplexKind::Array,
                "map" => ComplexKind::Map,
                "enum" => ComplexKind::Enum,
                "fixed" => ComplexKind::Fixed,
                other => return Ok((parse_named(other, expr)?, false)),
            };
            Ok((complex(kind, expr), false))
        }
        Some(nested) => parse_type(nested),
        None => Err("type object is missing 'type'".to_string()),
    }
}

fn parse_named(name: &str, expr: &Json) -> Result<FieldType, String> {
    if name == "null" {
        return Ok(complex(ComplexKind::Null, expr));
    }
    PrimitiveType::from_name(name)
        .map(FieldType::Primitive)
        .ok_or_else(|| format!("unknown type '{name}'"))
}

fn complex(kind: ComplexKind, raw: &Json) -> FieldType {
    FieldType::Complex {
        kind,
        raw: raw.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const BODY: &str = r#"{"type":"record","name":"etlSchemaBody","fields":[
        {"name":"t","type":["string","null"]},
        {"name":"b","type":["long","null"]}]}"#;

    #[test]
    fn parses_nullable_primitives() {
        let schema = RecordSchema::parse_json(BODY).unwrap();
        assert_eq!(schema.name(), "etlSchemaBody");
        assert_eq!(
            schema.fields(),
            &[
                FieldDescriptor::new("t", PrimitiveType::String, true),
                FieldDescriptor::new("b", PrimitiveType::Int64, true),
            ]
        );
    }

    #[rstest]
    #[case(r#"["null","int"]"#, Some(PrimitiveType::Int32), true)]
    #[case(r#""bytes""#, Some(PrimitiveType::Bytes), false)]
    #[case(r#"{"type":"double"}"#, Some(PrimitiveType::Float64), false)]
    #[case(r#"{"type":"array","items":"int"}"#, None, false)]
    #[case(r#"{"type":"long","logicalType":"timestamp-micros"}"#, None, false)]
    #[case(r#"["int","string"]"#, None, false)]
    #[case(r#"["null",["int","null"]]"#, None, false)]
    fn resolves_type_expressions(
        #[case] expr: &str,
        #[case] primitive: Option<PrimitiveType>,
        #[case] nullable: bool,
    ) {
        let text = format!(r#"{{"type":"record","name":"r","fields":[{{"name":"f","type":{expr}}}]}}"#);
        let schema = RecordSchema::parse_json(&text).unwrap();
        let field = &schema.fields()[0];
        assert_eq!(field.primitive(), primitive, "primitive for {expr}");
        assert_eq!(field.nullable, nullable, "nullability for {expr}");
    }

    #[test]
    fn nested_record_is_complex() {
        let text = r#"{"type":"record","name":"r","fields":[
            {"name":"inner","type":{"type":"record","name":"i","fields":[]}}]}"#;
        let schema = RecordSchema::parse_json(text).unwrap();
        match &schema.fields()[0].field_type {
            FieldType::Complex { kind, .. } => assert_eq!(*kind, ComplexKind::Record),
            other => panic!("expected complex type, got {other:?}"),
        }
    }

    #[test]
    fn rejects_documents_that_are_not_records() {
        let text = r#""name":"etlSchemaBody","schema":{"type":"record"}"#;
        assert!(RecordSchema::parse_json(text).is_err());
        assert!(matches!(
            RecordSchema::parse_json(r#"{"type":"enum","name":"e"}"#),
            Err(SchemaParseError::NotARecord)
        ));
    }

    #[test]
    fn rejects_unknown_type_names() {
        let text = r#"{"type":"record","name":"r","fields":[{"name":"f","type":"integer"}]}"#;
        let err = RecordSchema::parse_json(text).unwrap_err();
        assert!(err.to_string().contains("unknown type 'integer'"), "got: {err}");
    }

    #[test]
    fn rejects_duplicate_field_names() {
        let text = r#"{"type":"record","name":"r","fields":[
            {"name":"a","type":"int"},{"name":"a","type":"long"}]}"#;
        assert!(matches!(
            RecordSchema::parse_json(text),
            Err(SchemaParseError::DuplicateField(name)) if name == "a"
        ));
    }

    #[test]
    fn field_names_are_case_sensitive() {
        let text = r#"{"type":"record","name":"r","fields":[
            {"name":"a","type":"int"},{"name":"A","type":"int"}]}"#;
        let schema = RecordSchema::parse_json(text).unwrap();
        assert!(schema.field("A").is_some());
        assert!(schema.field("b").is_none());
    }

    #[test]
    fn prints_back_to_equivalent_json() {
        let schema = RecordSchema::parse_json(BODY).unwrap();
        let reparsed = RecordSchema::from_json(&schema.to_json()).unwrap();
        assert_eq!(schema, reparsed);
    }
}
