//! Structured record <-> Kudu table type mapping.
//!
//! Single source of truth for how the seven record primitives map onto Kudu
//! storage types and back, and for converting individual rows in either
//! direction. Every function here is pure; a [`SchemaMapper`] is `Copy` and
//! can be shared freely between workers.
//!
//! Types without a mapping are handled according to one flag,
//! [`UnsupportedPolicy`]: `Fail` raises [`MappingError::UnsupportedType`],
//! `Skip` leaves the field or column out. Table creation always runs strict;
//! row conversion and schema discovery default to skipping so tables can gain
//! column types this code does not know about yet.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use kuduflow_types::error::ConnectorError;
use kuduflow_types::record::{FieldDescriptor, PrimitiveType, RecordSchema, SchemaParseError};
use kuduflow_types::storage::{Compression, Encoding, StorageType, StorageValue};
use kuduflow_types::table::{ColumnDescriptor, StorageRow, TableSchema, TableSchemaError};
use kuduflow_types::value::{StructuredRecord, Value};

/// Errors raised while translating schemas or rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("'{name}' has unsupported type {found}")]
    UnsupportedType { name: String, found: String },
    #[error("column '{column}' expects {expected} but got {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },
    #[error("key column '{0}' is not a field of the schema")]
    UnknownKeyColumn(String),
    #[error(transparent)]
    Table(#[from] TableSchemaError),
}

impl From<MappingError> for ConnectorError {
    fn from(err: MappingError) -> Self {
        match err {
            MappingError::UnsupportedType { .. } => {
                ConnectorError::schema("UNSUPPORTED_TYPE", err.to_string())
            }
            MappingError::TypeMismatch { .. } => {
                ConnectorError::data("TYPE_MISMATCH", err.to_string())
            }
            MappingError::UnknownKeyColumn(_) | MappingError::Table(_) => {
                ConnectorError::config("INVALID_TABLE_SCHEMA", err.to_string())
            }
        }
    }
}

/// What to do with a field or column whose type has no mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UnsupportedPolicy {
    /// Leave it out and carry on.
    #[default]
    Skip,
    /// Raise [`MappingError::UnsupportedType`].
    Fail,
}

/// Map a record primitive to its Kudu storage type.
#[must_use]
pub fn to_storage_type(primitive: PrimitiveType) -> StorageType {
    match primitive {
        PrimitiveType::Boolean => StorageType::Bool,
        PrimitiveType::Int32 => StorageType::Int32,
        PrimitiveType::Int64 => StorageType::Int64,
        PrimitiveType::Float32 => StorageType::Float,
        PrimitiveType::Float64 => StorageType::Double,
        PrimitiveType::Bytes => StorageType::Binary,
        PrimitiveType::String => StorageType::String,
    }
}

/// Map a Kudu storage type back to a record primitive.
///
/// `Int8` and `Int16` widen to `Int32`, so a table created elsewhere does not
/// round-trip to its narrow type. Widening keeps the sign: an `int8` cell of
/// `-1` reads as `-1`, not as the unsigned byte `255`. Returns `None` for
/// storage types with no record counterpart.
#[must_use]
pub fn from_storage_type(storage: StorageType) -> Option<PrimitiveType> {
    match storage {
        StorageType::Bool => Some(PrimitiveType::Boolean),
        StorageType::Int8 | StorageType::Int16 | StorageType::Int32 => Some(PrimitiveType::Int32),
        StorageType::Int64 => Some(PrimitiveType::Int64),
        StorageType::Float => Some(PrimitiveType::Float32),
        StorageType::Double => Some(PrimitiveType::Float64),
        StorageType::Binary => Some(PrimitiveType::Bytes),
        StorageType::String => Some(PrimitiveType::String),
        _ => None,
    }
}

/// Storage type of a field, failing for anything that is not a primitive.
///
/// # Errors
///
/// Returns [`MappingError::UnsupportedType`] for nested records, arrays,
/// maps, enums, unions and logical types.
pub fn field_storage_type(field: &FieldDescriptor) -> Result<StorageType, MappingError> {
    field
        .primitive()
        .map(to_storage_type)
        .ok_or_else(|| MappingError::UnsupportedType {
            name: field.name.clone(),
            found: field.field_type.to_string(),
        })
}

/// Schema and row translator, parameterised by the unsupported-type policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaMapper {
    unsupported: UnsupportedPolicy,
}

impl SchemaMapper {
    #[must_use]
    pub const fn new(unsupported: UnsupportedPolicy) -> Self {
        Self { unsupported }
    }

    /// Mapper that fails on any type without a mapping.
    #[must_use]
    pub const fn strict() -> Self {
        Self::new(UnsupportedPolicy::Fail)
    }

    /// Mapper that skips types without a mapping.
    #[must_use]
    pub const fn best_effort() -> Self {
        Self::new(UnsupportedPolicy::Skip)
    }

    #[must_use]
    pub fn policy(&self) -> UnsupportedPolicy {
        self.unsupported
    }

    /// Build a Kudu table schema from record fields.
    ///
    /// Field order is preserved. A field is a key column when its name is in
    /// `key_columns`; an empty `key_columns` makes every column a key column.
    /// Key columns are always non-nullable. `encoding` and `compression`
    /// apply to every column.
    ///
    /// # Errors
    ///
    /// Fails when a key column names no field, when an unsupported field is
    /// met under [`UnsupportedPolicy::Fail`] (or is itself a key column), or
    /// when the result violates the table schema invariants.
    pub fn to_table_schema(
        &self,
        fields: &[FieldDescriptor],
        key_columns: &[String],
        compression: Compression,
        encoding: Encoding,
    ) -> Result<TableSchema, MappingError> {
        if let Some(unknown) = key_columns
            .iter()
            .find(|k| !fields.iter().any(|f| &f.name == *k))
        {
            return Err(MappingError::UnknownKeyColumn(unknown.clone()));
        }

        let all_keys = key_columns.is_empty();
        let mut columns = Vec::with_capacity(fields.len());
        for field in fields {
            let is_key = all_keys || key_columns.contains(&field.name);
            let storage_type = match field_storage_type(field) {
                Ok(t) => t,
                Err(err) if is_key || self.unsupported == UnsupportedPolicy::Fail => {
                    return Err(err)
                }
                Err(err) => {
                    debug!(field = %field.name, "skipping field: {err}");
                    continue;
                }
            };
            let mut column = ColumnDescriptor::new(&field.name, storage_type, field.nullable);
            if is_key {
                column = column.key();
            }
            column.encoding = encoding;
            column.compression = compression;
            columns.push(column);
        }

        Ok(TableSchema::new(columns)?)
    }

    /// Derive the record schema of a table, optionally restricted to the
    /// columns accepted by `keep`.
    ///
    /// # Errors
    ///
    /// Fails on a column without a mapping under [`UnsupportedPolicy::Fail`].
    pub fn to_record_schema(
        &self,
        table: &TableSchema,
        record_name: &str,
        keep: impl Fn(&ColumnDescriptor) -> bool,
    ) -> Result<RecordSchema, MappingError> {
        let mut fields = Vec::new();
        for column in table.columns().iter().filter(|c| keep(*c)) {
            match from_storage_type(column.storage_type) {
                Some(primitive) => {
                    fields.push(FieldDescriptor::new(&column.name, primitive, column.nullable));
                }
                None => self.unsupported_column(column)?,
            }
        }
        RecordSchema::new(record_name, fields).map_err(|e| match e {
            SchemaParseError::DuplicateField(name) => {
                MappingError::Table(TableSchemaError::DuplicateColumn(name))
            }
            other => MappingError::UnsupportedType {
                name: record_name.to_string(),
                found: other.to_string(),
            },
        })
    }

    /// Prepare a reusable decoder for rows of `table`, restricted to the
    /// columns accepted by `keep`.
    ///
    /// # Errors
    ///
    /// Fails on a column without a mapping under [`UnsupportedPolicy::Fail`].
    pub fn decoder(
        &self,
        table: &TableSchema,
        keep: impl Fn(&ColumnDescriptor) -> bool,
    ) -> Result<RowDecoder, MappingError> {
        let record_schema = self.to_record_schema(table, "output", &keep)?;
        let columns = table
            .columns()
            .iter()
            .filter(|c| keep(*c) && from_storage_type(c.storage_type).is_some())
            .cloned()
            .collect();
        Ok(RowDecoder {
            schema: Arc::new(record_schema),
            columns,
        })
    }

    /// Convert one Kudu row into a structured record.
    ///
    /// Null or absent cells become explicit nulls. Columns without a mapping
    /// are left out of the record unless the policy is `Fail`.
    ///
    /// # Errors
    ///
    /// Fails when a cell's type disagrees with its column, or on an
    /// unsupported column under [`UnsupportedPolicy::Fail`].
    pub fn to_record(
        &self,
        row: &StorageRow,
        table: &TableSchema,
    ) -> Result<StructuredRecord, MappingError> {
        self.decoder(table, |_| true)?.decode(row)
    }

    /// Convert a structured record into typed cells for `table`.
    ///
    /// Each table column is filled from the record field of the same name.
    /// Columns the record does not declare are not written. A field whose
    /// declared type is not a primitive is skipped unless the policy is
    /// `Fail`. Null values are written as explicit nulls.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::TypeMismatch`] when a value does not match its
    /// declared type or the column's storage type, or is null for a
    /// non-nullable column.
    pub fn to_storage_row(
        &self,
        record: &StructuredRecord,
        table: &TableSchema,
    ) -> Result<StorageRow, MappingError> {
        let mut row = StorageRow::new();
        for column in table.columns() {
            let Some(field) = record.schema().field(&column.name) else {
                continue;
            };
            let Some(primitive) = field.primitive() else {
                if self.unsupported == UnsupportedPolicy::Fail {
                    return Err(MappingError::UnsupportedType {
                        name: field.name.clone(),
                        found: field.field_type.to_string(),
                    });
                }
                debug!(column = %column.name, "skipping field of type {}", field.field_type);
                continue;
            };
            let value = record.get(&column.name).unwrap_or(&Value::Null);
            row.set(column.name.clone(), encode_value(column, primitive, value)?);
        }
        Ok(row)
    }

    fn unsupported_column(&self, column: &ColumnDescriptor) -> Result<(), MappingError> {
        match self.unsupported {
            UnsupportedPolicy::Fail => Err(MappingError::UnsupportedType {
                name: column.name.clone(),
                found: column.storage_type.to_string(),
            }),
            UnsupportedPolicy::Skip => {
                debug!(column = %column.name, "skipping column of type {}", column.storage_type);
                Ok(())
            }
        }
    }
}

/// Decoder for rows of one table, built once per read.
#[derive(Debug, Clone)]
pub struct RowDecoder {
    schema: Arc<RecordSchema>,
    columns: Vec<ColumnDescriptor>,
}

impl RowDecoder {
    /// Build records against `output` instead of the schema derived from the
    /// table. Columns that `output` does not declare are no longer decoded;
    /// fields with no matching column read as null.
    #[must_use]
    pub fn with_output_schema(mut self, output: Arc<RecordSchema>) -> Self {
        self.columns.retain(|c| output.field(&c.name).is_some());
        self.schema = output;
        self
    }

    /// Record schema of decoded rows.
    #[must_use]
    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// # Errors
    ///
    /// Fails when a cell's type disagrees with its column.
    pub fn decode(&self, row: &StorageRow) -> Result<StructuredRecord, MappingError> {
        let mut builder = StructuredRecord::builder(Arc::clone(&self.schema));
        for column in &self.columns {
            let value = match row.get(&column.name) {
                None | Some(StorageValue::Null) => Value::Null,
                Some(cell) => decode_cell(column, cell)?,
            };
            builder = builder.set(&column.name, value);
        }
        Ok(builder.build())
    }
}

fn decode_cell(column: &ColumnDescriptor, cell: &StorageValue) -> Result<Value, MappingError> {
    if cell.storage_type() != Some(column.storage_type) {
        return Err(cell_mismatch(column, cell));
    }
    let value = match cell {
        StorageValue::Bool(v) => Value::Boolean(*v),
        StorageValue::Int8(v) => Value::Int32(i32::from(*v)),
        StorageValue::Int16(v) => Value::Int32(i32::from(*v)),
        StorageValue::Int32(v) => Value::Int32(*v),
        StorageValue::Int64(v) => Value::Int64(*v),
        StorageValue::Float(v) => Value::Float32(*v),
        StorageValue::Double(v) => Value::Float64(*v),
        StorageValue::String(v) => Value::String(v.clone()),
        StorageValue::Binary(v) => Value::Bytes(v.to_vec()),
        _ => return Err(cell_mismatch(column, cell)),
    };
    Ok(value)
}

fn encode_value(
    column: &ColumnDescriptor,
    primitive: PrimitiveType,
    value: &Value,
) -> Result<StorageValue, MappingError> {
    if value.is_null() {
        if column.nullable {
            return Ok(StorageValue::Null);
        }
        return Err(MappingError::TypeMismatch {
            column: column.name.clone(),
            expected: format!("non-null {primitive}"),
            found: "null".to_string(),
        });
    }

    let cell = match (primitive, value) {
        (PrimitiveType::Boolean, Value::Boolean(v)) => StorageValue::Bool(*v),
        (PrimitiveType::Int32, Value::Int32(v)) => StorageValue::Int32(*v),
        (PrimitiveType::Int64, Value::Int64(v)) => StorageValue::Int64(*v),
        (PrimitiveType::Float32, Value::Float32(v)) => StorageValue::Float(*v),
        (PrimitiveType::Float64, Value::Float64(v)) => StorageValue::Double(*v),
        (PrimitiveType::Bytes, Value::Bytes(v)) => StorageValue::Binary(Bytes::copy_from_slice(v)),
        (PrimitiveType::Bytes, Value::Buffer(v)) => StorageValue::Binary(v.clone()),
        (PrimitiveType::String, Value::String(v)) => StorageValue::String(v.clone()),
        _ => {
            return Err(MappingError::TypeMismatch {
                column: column.name.clone(),
                expected: primitive.to_string(),
                found: value.kind().to_string(),
            })
        }
    };
    fit_column(column, cell)
}

/// Adapt a cell to the column's storage type, narrowing ints for tables
/// that use `int8`/`int16` columns.
fn fit_column(column: &ColumnDescriptor, cell: StorageValue) -> Result<StorageValue, MappingError> {
    if cell.storage_type() == Some(column.storage_type) {
        return Ok(cell);
    }
    let narrowed = match (column.storage_type, &cell) {
        (StorageType::Int16, StorageValue::Int32(v)) => i16::try_from(*v).ok().map(StorageValue::Int16),
        (StorageType::Int8, StorageValue::Int32(v)) => i8::try_from(*v).ok().map(StorageValue::Int8),
        _ => None,
    };
    narrowed.ok_or_else(|| cell_mismatch(column, &cell))
}

fn cell_mismatch(column: &ColumnDescriptor, cell: &StorageValue) -> MappingError {
    let found = match cell {
        StorageValue::Int8(v) => format!("int8 {v}"),
        StorageValue::Int16(v) => format!("int16 {v}"),
        StorageValue::Int32(v) => format!("int32 {v}"),
        other => other
            .storage_type()
            .map_or_else(|| "null".to_string(), |t| t.to_string()),
    };
    MappingError::TypeMismatch {
        column: column.name.clone(),
        expected: column.storage_type.to_string(),
        found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuduflow_types::record::{ComplexKind, FieldType};
    use proptest::prelude::*;
    use rstest::rstest;

    fn nullable_pair() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("t", PrimitiveType::String, true),
            FieldDescriptor::new("b", PrimitiveType::Int64, true),
        ]
    }

    fn nested(name: &str) -> FieldDescriptor {
        FieldDescriptor::with_type(
            name,
            FieldType::Complex {
                kind: ComplexKind::Record,
                raw: serde_json::json!({"type": "record", "name": "inner", "fields": []}),
            },
            false,
        )
    }

    fn id_name_table() -> TableSchema {
        TableSchema::new(vec![
            ColumnDescriptor::new("id", StorageType::Int64, false).key(),
            ColumnDescriptor::new("name", StorageType::String, true),
        ])
        .unwrap()
    }

    fn record(fields: Vec<FieldDescriptor>) -> RecordFactory {
        RecordFactory(Arc::new(RecordSchema::new("r", fields).unwrap()))
    }

    struct RecordFactory(Arc<RecordSchema>);

    impl RecordFactory {
        fn with(&self, values: &[(&str, Value)]) -> StructuredRecord {
            values
                .iter()
                .fold(StructuredRecord::builder(Arc::clone(&self.0)), |b, (n, v)| {
                    b.set(n, v.clone())
                })
                .build()
        }
    }

    #[test]
    fn core_types_round_trip() {
        for primitive in PrimitiveType::ALL {
            assert_eq!(
                from_storage_type(to_storage_type(primitive)),
                Some(primitive),
                "round trip for {primitive}"
            );
        }
    }

    #[rstest]
    #[case(StorageType::Int16)]
    #[case(StorageType::Int8)]
    fn narrow_ints_widen_to_int32(#[case] storage: StorageType) {
        assert_eq!(from_storage_type(storage), Some(PrimitiveType::Int32));
        assert_eq!(to_storage_type(PrimitiveType::Int32), StorageType::Int32);
    }

    #[rstest]
    #[case(StorageType::UnixtimeMicros)]
    #[case(StorageType::Decimal)]
    #[case(StorageType::Date)]
    #[case(StorageType::Varchar)]
    fn newer_storage_types_have_no_mapping(#[case] storage: StorageType) {
        assert_eq!(from_storage_type(storage), None);
    }

    #[test]
    fn empty_key_list_makes_every_column_a_key() {
        let schema = SchemaMapper::strict()
            .to_table_schema(&nullable_pair(), &[], Compression::Snappy, Encoding::Auto)
            .unwrap();
        assert_eq!(schema.columns().len(), 2);
        assert!(schema.columns().iter().all(|c| c.is_key && !c.nullable));
    }

    #[test]
    fn key_list_selects_key_columns_and_keeps_order() {
        let schema = SchemaMapper::strict()
            .to_table_schema(&nullable_pair(), &["b".to_string()], Compression::Lz4, Encoding::Plain)
            .unwrap();
        let names: Vec<_> = schema.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["t", "b"]);

        let t = schema.column("t").unwrap();
        assert!(!t.is_key);
        assert!(t.nullable);
        assert_eq!(t.storage_type, StorageType::String);

        let b = schema.column("b").unwrap();
        assert!(b.is_key);
        assert!(!b.nullable);
        assert_eq!(b.storage_type, StorageType::Int64);

        assert!(schema
            .columns()
            .iter()
            .all(|c| c.compression == Compression::Lz4 && c.encoding == Encoding::Plain));
    }

    #[test]
    fn unknown_key_column_is_rejected() {
        let err = SchemaMapper::strict()
            .to_table_schema(&nullable_pair(), &["nope".to_string()], Compression::Snappy, Encoding::Auto)
            .unwrap_err();
        assert_eq!(err, MappingError::UnknownKeyColumn("nope".into()));
    }

    #[test]
    fn unsupported_field_fails_strict_table_schema() {
        let mut fields = nullable_pair();
        fields.push(nested("inner"));
        let err = SchemaMapper::strict()
            .to_table_schema(&fields, &["b".to_string()], Compression::Snappy, Encoding::Auto)
            .unwrap_err();
        assert!(
            matches!(err, MappingError::UnsupportedType { ref name, .. } if name == "inner"),
            "got: {err}"
        );
    }

    #[test]
    fn unsupported_field_is_dropped_by_best_effort_table_schema() {
        let mut fields = nullable_pair();
        fields.push(nested("inner"));
        let schema = SchemaMapper::best_effort()
            .to_table_schema(&fields, &["b".to_string()], Compression::Snappy, Encoding::Auto)
            .unwrap();
        assert!(schema.column("inner").is_none());
    }

    #[test]
    fn unsupported_key_field_fails_even_when_skipping() {
        let err = SchemaMapper::best_effort()
            .to_table_schema(&[nested("inner")], &[], Compression::Snappy, Encoding::Auto)
            .unwrap_err();
        assert!(matches!(err, MappingError::UnsupportedType { .. }));
    }

    #[test]
    fn storage_row_sets_values_and_explicit_nulls() {
        let rec = record(vec![
            FieldDescriptor::new("id", PrimitiveType::Int64, false),
            FieldDescriptor::new("name", PrimitiveType::String, true),
        ])
        .with(&[("id", Value::Int64(42)), ("name", Value::Null)]);

        let row = SchemaMapper::default().to_storage_row(&rec, &id_name_table()).unwrap();
        assert_eq!(row.get("id"), Some(&StorageValue::Int64(42)));
        assert_eq!(row.get("name"), Some(&StorageValue::Null));
    }

    #[test]
    fn nested_field_is_skipped_but_mismatch_fails() {
        let table = TableSchema::new(vec![
            ColumnDescriptor::new("id", StorageType::Int32, false).key(),
            ColumnDescriptor::new("inner", StorageType::String, true),
        ])
        .unwrap();
        let builder = record(vec![
            FieldDescriptor::new("id", PrimitiveType::Int32, false),
            nested("inner"),
        ]);

        let ok = builder.with(&[("id", Value::Int32(7)), ("inner", Value::Map(vec![]))]);
        let row = SchemaMapper::best_effort().to_storage_row(&ok, &table).unwrap();
        assert_eq!(row.get("id"), Some(&StorageValue::Int32(7)));
        assert_eq!(row.get("inner"), None);

        let bad = builder.with(&[("id", Value::from("seven"))]);
        let err = SchemaMapper::best_effort().to_storage_row(&bad, &table).unwrap_err();
        assert_eq!(
            err,
            MappingError::TypeMismatch {
                column: "id".into(),
                expected: "int".into(),
                found: "string".into(),
            }
        );
    }

    #[test]
    fn nested_field_fails_under_strict_policy() {
        let table = TableSchema::new(vec![
            ColumnDescriptor::new("id", StorageType::Int32, false).key(),
            ColumnDescriptor::new("inner", StorageType::String, true),
        ])
        .unwrap();
        let rec = record(vec![
            FieldDescriptor::new("id", PrimitiveType::Int32, false),
            nested("inner"),
        ])
        .with(&[("id", Value::Int32(7))]);
        assert!(matches!(
            SchemaMapper::strict().to_storage_row(&rec, &table),
            Err(MappingError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn bytes_and_buffers_normalize_to_the_same_cell() {
        let table = TableSchema::new(vec![
            ColumnDescriptor::new("payload", StorageType::Binary, false).key(),
        ])
        .unwrap();
        let builder = record(vec![FieldDescriptor::new("payload", PrimitiveType::Bytes, false)]);
        let mapper = SchemaMapper::default();

        let from_vec = mapper
            .to_storage_row(&builder.with(&[("payload", Value::Bytes(vec![1, 2, 3]))]), &table)
            .unwrap();
        let from_buf = mapper
            .to_storage_row(
                &builder.with(&[("payload", Value::Buffer(Bytes::from_static(&[1, 2, 3])))]),
                &table,
            )
            .unwrap();
        assert_eq!(from_vec, from_buf);
        assert_eq!(
            from_vec.get("payload"),
            Some(&StorageValue::Binary(Bytes::from_static(&[1, 2, 3])))
        );
    }

    #[test]
    fn null_for_non_nullable_column_is_a_mismatch() {
        let rec = record(vec![FieldDescriptor::new("id", PrimitiveType::Int64, true)])
            .with(&[("id", Value::Null)]);
        let err = SchemaMapper::default()
            .to_storage_row(&rec, &id_name_table())
            .unwrap_err();
        assert!(matches!(err, MappingError::TypeMismatch { ref found, .. } if found == "null"));
    }

    #[test]
    fn declared_type_must_match_column_type() {
        let rec = record(vec![FieldDescriptor::new("id", PrimitiveType::String, false)])
            .with(&[("id", Value::from("42"))]);
        let err = SchemaMapper::default()
            .to_storage_row(&rec, &id_name_table())
            .unwrap_err();
        assert!(matches!(err, MappingError::TypeMismatch { ref expected, .. } if expected == "int64"));
    }

    proptest! {
        #[test]
        fn int32_narrows_into_int16_columns_when_it_fits(v in any::<i32>()) {
            let table = TableSchema::new(vec![
                ColumnDescriptor::new("n", StorageType::Int16, false).key(),
            ])
            .unwrap();
            let rec = record(vec![FieldDescriptor::new("n", PrimitiveType::Int32, false)])
                .with(&[("n", Value::Int32(v))]);
            let result = SchemaMapper::default().to_storage_row(&rec, &table);
            match i16::try_from(v) {
                Ok(n) => {
                    let row = result.unwrap();
                    prop_assert_eq!(row.get("n"), Some(&StorageValue::Int16(n)));
                }
                Err(_) => prop_assert!(result.is_err()),
            }
        }
    }

    #[test]
    fn record_gets_explicit_nulls_and_widened_ints() {
        let table = TableSchema::new(vec![
            ColumnDescriptor::new("id", StorageType::Int8, false).key(),
            ColumnDescriptor::new("small", StorageType::Int16, true),
            ColumnDescriptor::new("name", StorageType::String, true),
        ])
        .unwrap();
        let row: StorageRow = [
            ("id".to_string(), StorageValue::Int8(-5)),
            ("small".to_string(), StorageValue::Int16(300)),
        ]
        .into_iter()
        .collect();

        let rec = SchemaMapper::default().to_record(&row, &table).unwrap();
        assert_eq!(rec.get("id"), Some(&Value::Int32(-5)));
        assert_eq!(rec.get("small"), Some(&Value::Int32(300)));
        assert_eq!(rec.get("name"), Some(&Value::Null));
        assert_eq!(
            rec.schema().field("id"),
            Some(&FieldDescriptor::new("id", PrimitiveType::Int32, false))
        );
    }

    #[test]
    fn decoder_builds_records_against_output_schema() {
        let table = TableSchema::new(vec![
            ColumnDescriptor::new("id", StorageType::Int64, false).key(),
            ColumnDescriptor::new("name", StorageType::String, true),
        ])
        .unwrap();
        let output = Arc::new(
            RecordSchema::new(
                "users",
                vec![
                    FieldDescriptor::new("id", PrimitiveType::Int64, false),
                    FieldDescriptor::new("extra", PrimitiveType::String, true),
                ],
            )
            .unwrap(),
        );
        let row: StorageRow = [
            ("id".to_string(), StorageValue::Int64(7)),
            ("name".to_string(), StorageValue::String("ada".into())),
        ]
        .into_iter()
        .collect();

        let decoder = SchemaMapper::best_effort()
            .decoder(&table, |_| true)
            .unwrap()
            .with_output_schema(Arc::clone(&output));
        let rec = decoder.decode(&row).unwrap();
        assert_eq!(rec.schema(), output.as_ref());
        assert_eq!(rec.get("id"), Some(&Value::Int64(7)));
        assert_eq!(rec.get("extra"), Some(&Value::Null));
        assert_eq!(rec.get("name"), None);
    }

    #[test]
    fn record_skips_unmapped_columns_unless_strict() {
        let table = TableSchema::new(vec![
            ColumnDescriptor::new("id", StorageType::Int64, false).key(),
            ColumnDescriptor::new("at", StorageType::UnixtimeMicros, true),
        ])
        .unwrap();
        let row: StorageRow = [
            ("id".to_string(), StorageValue::Int64(1)),
            ("at".to_string(), StorageValue::UnixtimeMicros(1_700_000_000_000_000)),
        ]
        .into_iter()
        .collect();

        let rec = SchemaMapper::best_effort().to_record(&row, &table).unwrap();
        assert_eq!(rec.get("id"), Some(&Value::Int64(1)));
        assert_eq!(rec.get("at"), None);

        assert!(matches!(
            SchemaMapper::strict().to_record(&row, &table),
            Err(MappingError::UnsupportedType { ref name, .. }) if name == "at"
        ));
    }

    #[test]
    fn record_cell_of_wrong_type_is_a_mismatch() {
        let row: StorageRow = [("id".to_string(), StorageValue::String("x".into()))]
            .into_iter()
            .collect();
        let err = SchemaMapper::default()
            .to_record(&row, &id_name_table())
            .unwrap_err();
        assert!(matches!(err, MappingError::TypeMismatch { .. }));
    }

    #[test]
    fn mapping_errors_convert_to_categorised_connector_errors() {
        use kuduflow_types::error::{ErrorCategory, ErrorScope};

        let unsupported: ConnectorError = MappingError::UnsupportedType {
            name: "f".into(),
            found: "array".into(),
        }
        .into();
        assert_eq!(unsupported.category, ErrorCategory::Schema);

        let mismatch: ConnectorError = MappingError::TypeMismatch {
            column: "c".into(),
            expected: "int".into(),
            found: "string".into(),
        }
        .into();
        assert_eq!(mismatch.category, ErrorCategory::Data);
        assert_eq!(mismatch.scope, ErrorScope::Record);
    }
}
