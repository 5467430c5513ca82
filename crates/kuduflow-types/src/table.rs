//! Kudu table definitions, creation requests and row operations.

use serde::Serialize;

use crate::storage::{Compression, Encoding, StorageType, StorageValue};

/// One column of a Kudu table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub storage_type: StorageType,
    pub nullable: bool,
    pub is_key: bool,
    pub encoding: Encoding,
    pub compression: Compression,
}

impl ColumnDescriptor {
    /// Non-key column with default encoding and compression.
    #[must_use]
    pub fn new(name: impl Into<String>, storage_type: StorageType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            storage_type,
            nullable,
            is_key: false,
            encoding: Encoding::default(),
            compression: Compression::default(),
        }
    }

    /// Mark the column as part of the key. Key columns are never nullable.
    #[must_use]
    pub fn key(mut self) -> Self {
        self.is_key = true;
        self.nullable = false;
        self
    }
}

/// Violations of the table schema invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableSchemaError {
    #[error("table schema must mark at least one key column")]
    NoKeyColumn,
    #[error("key column '{0}' must not be nullable")]
    NullableKey(String),
    #[error("column '{0}' is defined more than once")]
    DuplicateColumn(String),
}

/// Ordered column list of a Kudu table.
///
/// At least one column is a key column and no key column is nullable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TableSchema {
    columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    /// # Errors
    ///
    /// Returns an error if no column is a key, a key column is nullable, or
    /// two columns share a name.
    pub fn new(columns: Vec<ColumnDescriptor>) -> Result<Self, TableSchemaError> {
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(TableSchemaError::DuplicateColumn(column.name.clone()));
            }
            if column.is_key && column.nullable {
                return Err(TableSchemaError::NullableKey(column.name.clone()));
            }
        }
        if !columns.iter().any(|c| c.is_key) {
            return Err(TableSchemaError::NoKeyColumn);
        }
        Ok(Self { columns })
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_key)
    }
}

/// Hash partitioning over a set of key columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashPartition {
    pub columns: Vec<String>,
    pub buckets: u32,
    pub seed: i32,
}

/// Everything Kudu needs to create a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateTableRequest {
    pub table_name: String,
    pub schema: TableSchema,
    pub partitioning: HashPartition,
    pub replicas: u32,
}

/// Typed cells of one row, keyed by column name in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageRow {
    cells: Vec<(String, StorageValue)>,
}

impl StorageRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell, replacing an earlier value for the same column.
    pub fn set(&mut self, column: impl Into<String>, value: StorageValue) {
        let column = column.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    /// Cell for the column, `None` if the column was never set.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&StorageValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StorageValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, StorageValue)> for StorageRow {
    fn from_iter<I: IntoIterator<Item = (String, StorageValue)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

/// A write applied to a Kudu table.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOperation {
    Insert(StorageRow),
}

impl RowOperation {
    #[must_use]
    pub fn row(&self) -> &StorageRow {
        match self {
            Self::Insert(row) => row,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_builder_clears_nullability() {
        let column = ColumnDescriptor::new("id", StorageType::Int64, true).key();
        assert!(column.is_key);
        assert!(!column.nullable);
    }

    #[test]
    fn schema_requires_a_key() {
        let err = TableSchema::new(vec![ColumnDescriptor::new("a", StorageType::String, true)])
            .unwrap_err();
        assert_eq!(err, TableSchemaError::NoKeyColumn);
        assert_eq!(TableSchema::new(vec![]).unwrap_err(), TableSchemaError::NoKeyColumn);
    }

    #[test]
    fn schema_rejects_nullable_keys() {
        let mut column = ColumnDescriptor::new("id", StorageType::Int64, false).key();
        column.nullable = true;
        assert_eq!(
            TableSchema::new(vec![column]).unwrap_err(),
            TableSchemaError::NullableKey("id".into())
        );
    }

    #[test]
    fn schema_rejects_duplicate_columns() {
        let err = TableSchema::new(vec![
            ColumnDescriptor::new("id", StorageType::Int64, false).key(),
            ColumnDescriptor::new("id", StorageType::String, true),
        ])
        .unwrap_err();
        assert_eq!(err, TableSchemaError::DuplicateColumn("id".into()));
    }

    #[test]
    fn row_set_replaces_existing_cell() {
        let mut row = StorageRow::new();
        row.set("id", StorageValue::Int64(1));
        row.set("id", StorageValue::Int64(2));
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("id"), Some(&StorageValue::Int64(2)));
        assert_eq!(row.get("name"), None);
    }

    #[test]
    fn create_request_serializes_columns_as_list() {
        let schema = TableSchema::new(vec![
            ColumnDescriptor::new("id", StorageType::Int64, false).key(),
        ])
        .unwrap();
        let request = CreateTableRequest {
            table_name: "events".into(),
            schema,
            partitioning: HashPartition {
                columns: vec!["id".into()],
                buckets: 16,
                seed: 0,
            },
            replicas: 1,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["schema"][0]["name"], "id");
        assert_eq!(json["schema"][0]["storage_type"], "int64");
        assert_eq!(json["partitioning"]["buckets"], 16);
    }
}
