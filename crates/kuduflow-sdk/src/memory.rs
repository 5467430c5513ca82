//! In-memory Kudu cluster for connector tests.
//!
//! Behaves like a single-master cluster: tables are created from
//! [`CreateTableRequest`]s, writes are checked against the table schema and
//! scans return rows in insertion order. Individual calls can be made to fail
//! to exercise error paths.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use kuduflow_types::table::{CreateTableRequest, RowOperation, StorageRow, TableSchema};

use crate::client::{ClientError, ConnectionConfig, KuduClient, KuduConnect};

#[derive(Debug, Default)]
struct Table {
    schema: Option<TableSchema>,
    rows: Vec<StorageRow>,
    flushes: usize,
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, Table>,
    created: Vec<CreateTableRequest>,
    connections: Vec<ConnectionConfig>,
    closed: usize,
    fail_connect: Option<String>,
    fail_exists: Option<String>,
    fail_create: Option<String>,
}

/// Shared handle to an in-memory cluster. Clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryCluster {
    state: Arc<Mutex<State>>,
}

impl MemoryCluster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a table as if someone else had created it.
    pub fn insert_table(&self, name: &str, schema: TableSchema, rows: Vec<StorageRow>) {
        self.state().tables.insert(
            name.to_string(),
            Table {
                schema: Some(schema),
                rows,
                flushes: 0,
            },
        );
    }

    /// Make `connect` fail with a connectivity error.
    pub fn fail_connect(&self, reason: &str) {
        self.state().fail_connect = Some(reason.to_string());
    }

    /// Make `table_exists` fail with a connectivity error.
    pub fn fail_exists(&self, reason: &str) {
        self.state().fail_exists = Some(reason.to_string());
    }

    /// Make `create_table` fail with a rejection.
    pub fn fail_create(&self, reason: &str) {
        self.state().fail_create = Some(reason.to_string());
    }

    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<StorageRow> {
        self.state()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Number of `apply` calls that reached the table.
    #[must_use]
    pub fn flushes(&self, table: &str) -> usize {
        self.state().tables.get(table).map_or(0, |t| t.flushes)
    }

    #[must_use]
    pub fn created(&self) -> Vec<CreateTableRequest> {
        self.state().created.clone()
    }

    #[must_use]
    pub fn connections(&self) -> Vec<ConnectionConfig> {
        self.state().connections.clone()
    }

    #[must_use]
    pub fn closed(&self) -> usize {
        self.state().closed
    }
}

impl KuduConnect for MemoryCluster {
    type Client = MemoryCluster;

    async fn connect(&self, config: &ConnectionConfig) -> Result<Self::Client, ClientError> {
        let mut state = self.state();
        if let Some(reason) = &state.fail_connect {
            return Err(ClientError::Connectivity(reason.clone()));
        }
        state.connections.push(config.clone());
        Ok(self.clone())
    }
}

impl KuduClient for MemoryCluster {
    async fn table_exists(&self, table: &str) -> Result<bool, ClientError> {
        let state = self.state();
        if let Some(reason) = &state.fail_exists {
            return Err(ClientError::Connectivity(reason.clone()));
        }
        Ok(state.tables.contains_key(table))
    }

    async fn create_table(&self, request: &CreateTableRequest) -> Result<(), ClientError> {
        let mut state = self.state();
        if let Some(reason) = &state.fail_create {
            return Err(ClientError::Rejected(reason.clone()));
        }
        if state.tables.contains_key(&request.table_name) {
            return Err(ClientError::Rejected(format!(
                "table '{}' already exists",
                request.table_name
            )));
        }
        state.tables.insert(
            request.table_name.clone(),
            Table {
                schema: Some(request.schema.clone()),
                ..Table::default()
            },
        );
        state.created.push(request.clone());
        Ok(())
    }

    async fn table_schema(&self, table: &str) -> Result<TableSchema, ClientError> {
        self.state()
            .tables
            .get(table)
            .and_then(|t| t.schema.clone())
            .ok_or_else(|| ClientError::TableNotFound(table.to_string()))
    }

    async fn scan(
        &self,
        table: &str,
        projection: Option<&[String]>,
    ) -> Result<Vec<StorageRow>, ClientError> {
        let state = self.state();
        let entry = state
            .tables
            .get(table)
            .ok_or_else(|| ClientError::TableNotFound(table.to_string()))?;
        let Some(columns) = projection else {
            return Ok(entry.rows.clone());
        };
        if let Some(schema) = &entry.schema {
            if let Some(unknown) = columns.iter().find(|c| schema.column(c).is_none()) {
                return Err(ClientError::Rejected(format!("unknown column '{unknown}'")));
            }
        }
        Ok(entry
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .filter(|(name, _)| columns.iter().any(|c| c == name))
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect()
            })
            .collect())
    }

    async fn apply(&self, table: &str, operations: Vec<RowOperation>) -> Result<(), ClientError> {
        let mut state = self.state();
        let entry = state
            .tables
            .get_mut(table)
            .ok_or_else(|| ClientError::TableNotFound(table.to_string()))?;
        if let Some(schema) = &entry.schema {
            for op in &operations {
                check_row(schema, op.row())?;
            }
        }
        entry.flushes += 1;
        entry
            .rows
            .extend(operations.into_iter().map(|RowOperation::Insert(row)| row));
        Ok(())
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.state().closed += 1;
        Ok(())
    }
}

fn check_row(schema: &TableSchema, row: &StorageRow) -> Result<(), ClientError> {
    for (name, value) in row.iter() {
        let column = schema
            .column(name)
            .ok_or_else(|| ClientError::Rejected(format!("unknown column '{name}'")))?;
        match value.storage_type() {
            None if !column.nullable => {
                return Err(ClientError::Rejected(format!("column '{name}' is not nullable")))
            }
            Some(t) if t != column.storage_type => {
                return Err(ClientError::Rejected(format!(
                    "column '{name}' is {} but got {t}",
                    column.storage_type
                )))
            }
            _ => {}
        }
    }
    if let Some(key) = schema.key_columns().find(|k| row.get(&k.name).is_none()) {
        return Err(ClientError::Rejected(format!("key column '{}' is not set", key.name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuduflow_types::storage::{StorageType, StorageValue};
    use kuduflow_types::table::{ColumnDescriptor, HashPartition};

    fn schema() -> TableSchema {
        TableSchema::new(vec![
            ColumnDescriptor::new("id", StorageType::Int64, false).key(),
            ColumnDescriptor::new("name", StorageType::String, true),
        ])
        .unwrap()
    }

    fn row(id: i64) -> StorageRow {
        [("id".to_string(), StorageValue::Int64(id))].into_iter().collect()
    }

    #[tokio::test]
    async fn create_then_write_then_scan() {
        let cluster = MemoryCluster::new();
        let client = cluster.connect(&ConnectionConfig::new(vec![])).await.unwrap();
        assert!(!client.table_exists("t").await.unwrap());

        client
            .create_table(&CreateTableRequest {
                table_name: "t".into(),
                schema: schema(),
                partitioning: HashPartition {
                    columns: vec!["id".into()],
                    buckets: 2,
                    seed: 0,
                },
                replicas: 1,
            })
            .await
            .unwrap();
        client
            .apply("t", vec![RowOperation::Insert(row(1)), RowOperation::Insert(row(2))])
            .await
            .unwrap();

        assert_eq!(cluster.flushes("t"), 1);
        let scanned = client.scan("t", Some(&["id".to_string()][..])).await.unwrap();
        assert_eq!(scanned, vec![row(1), row(2)]);
    }

    #[tokio::test]
    async fn writes_are_checked_against_the_schema() {
        let cluster = MemoryCluster::new();
        cluster.insert_table("t", schema(), vec![]);

        let missing_key: StorageRow = [("name".to_string(), StorageValue::Null)]
            .into_iter()
            .collect();
        let err = cluster
            .apply("t", vec![RowOperation::Insert(missing_key)])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected(_)));

        let wrong_type: StorageRow = [("id".to_string(), StorageValue::Int32(1))]
            .into_iter()
            .collect();
        assert!(cluster
            .apply("t", vec![RowOperation::Insert(wrong_type)])
            .await
            .is_err());
        assert!(cluster.rows("t").is_empty());
    }

    #[tokio::test]
    async fn injected_failures() {
        let cluster = MemoryCluster::new();
        cluster.fail_exists("timed out");
        assert_eq!(
            cluster.table_exists("t").await.unwrap_err(),
            ClientError::Connectivity("timed out".into())
        );

        cluster.fail_connect("refused");
        assert!(cluster.connect(&ConnectionConfig::new(vec![])).await.is_err());
    }
}
