//! Buffered inserts into an open Kudu table.

use kuduflow_sdk::client::KuduClient;
use kuduflow_sdk::connector::WriteSummary;
use kuduflow_sdk::mapper::SchemaMapper;
use kuduflow_types::error::ConnectorError;
use kuduflow_types::table::{RowOperation, TableSchema};
use kuduflow_types::value::StructuredRecord;
use tracing::debug;

pub const DEFAULT_ROW_FLUSH: u32 = 30_000;

/// Converts records against the table's actual schema and applies them in
/// batches of `row_flush` inserts.
pub struct RowWriter {
    table: String,
    schema: TableSchema,
    mapper: SchemaMapper,
    row_flush: usize,
    pending: Vec<RowOperation>,
    summary: WriteSummary,
}

impl RowWriter {
    /// Open `table` and read its current schema.
    ///
    /// # Errors
    ///
    /// Fails when the table does not exist or cannot be reached.
    pub async fn open<K: KuduClient>(
        client: &K,
        table: &str,
        row_flush: usize,
    ) -> Result<Self, ConnectorError> {
        let schema = client.table_schema(table).await?;
        Ok(Self {
            table: table.to_string(),
            schema,
            mapper: SchemaMapper::best_effort(),
            row_flush: row_flush.max(1),
            pending: Vec::with_capacity(row_flush.clamp(1, 4096)),
            summary: WriteSummary::default(),
        })
    }

    /// Buffer one insert, flushing when the buffer is full.
    ///
    /// # Errors
    ///
    /// A value that does not fit its column is a record-scoped data error.
    /// Flush failures are returned as-is.
    pub async fn write<K: KuduClient>(
        &mut self,
        client: &K,
        record: &StructuredRecord,
    ) -> Result<(), ConnectorError> {
        let row = self.mapper.to_storage_row(record, &self.schema)?;
        self.pending.push(RowOperation::Insert(row));
        if self.pending.len() >= self.row_flush {
            self.flush(client).await?;
        }
        Ok(())
    }

    /// Apply every buffered insert.
    ///
    /// # Errors
    ///
    /// Fails when Kudu rejects the batch or cannot be reached.
    pub async fn flush<K: KuduClient>(&mut self, client: &K) -> Result<(), ConnectorError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        let rows = batch.len() as u64;
        client.apply(&self.table, batch).await?;
        self.summary.records_written += rows;
        self.summary.flushes += 1;
        debug!(table = %self.table, rows, "dest-kudu: flushed");
        Ok(())
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn summary(&self) -> WriteSummary {
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use kuduflow_sdk::memory::MemoryCluster;
    use kuduflow_types::error::{ErrorCategory, ErrorScope};
    use kuduflow_types::record::{FieldDescriptor, PrimitiveType, RecordSchema};
    use kuduflow_types::storage::{StorageType, StorageValue};
    use kuduflow_types::table::ColumnDescriptor;

    fn cluster() -> MemoryCluster {
        let cluster = MemoryCluster::new();
        cluster.insert_table(
            "users",
            TableSchema::new(vec![
                ColumnDescriptor::new("id", StorageType::Int64, false).key(),
                ColumnDescriptor::new("name", StorageType::String, true),
            ])
            .unwrap(),
            vec![],
        );
        cluster
    }

    fn record(id: i64) -> StructuredRecord {
        let schema = RecordSchema::new(
            "body",
            vec![
                FieldDescriptor::new("id", PrimitiveType::Int64, false),
                FieldDescriptor::new("name", PrimitiveType::String, true),
            ],
        )
        .unwrap();
        StructuredRecord::builder(Arc::new(schema)).set("id", id).build()
    }

    #[tokio::test]
    async fn flushes_every_row_flush_rows() {
        let cluster = cluster();
        let mut writer = RowWriter::open(&cluster, "users", 2).await.unwrap();
        for id in 1..=5 {
            writer.write(&cluster, &record(id)).await.unwrap();
        }
        assert_eq!(cluster.flushes("users"), 2);
        assert_eq!(writer.pending(), 1);

        writer.flush(&cluster).await.unwrap();
        assert_eq!(cluster.flushes("users"), 3);
        assert_eq!(
            writer.summary(),
            WriteSummary {
                records_written: 5,
                flushes: 3
            }
        );

        let rows = cluster.rows("users");
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].get("id"), Some(&StorageValue::Int64(1)));
        assert_eq!(rows[0].get("name"), Some(&StorageValue::Null));
    }

    #[tokio::test]
    async fn mismatched_value_is_a_record_error() {
        let cluster = cluster();
        let mut writer = RowWriter::open(&cluster, "users", 10).await.unwrap();
        let schema = RecordSchema::new(
            "body",
            vec![FieldDescriptor::new("id", PrimitiveType::Int32, false)],
        )
        .unwrap();
        let bad = StructuredRecord::builder(Arc::new(schema)).set("id", 1_i32).build();

        let err = writer.write(&cluster, &bad).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Data);
        assert_eq!(err.scope, ErrorScope::Record);
        assert_eq!(writer.pending(), 0);
    }

    #[tokio::test]
    async fn missing_table_fails_to_open() {
        let err = RowWriter::open(&MemoryCluster::new(), "users", 10)
            .await
            .err()
            .unwrap();
        assert_eq!(err.code, "TABLE_NOT_FOUND");
    }

    proptest::proptest! {
        #[test]
        fn every_row_lands_in_ceil_n_over_k_flushes(n in 0_i64..60, k in 1_usize..16) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let cluster = cluster();
            let summary = runtime.block_on(async {
                let mut writer = RowWriter::open(&cluster, "users", k).await.unwrap();
                for id in 0..n {
                    writer.write(&cluster, &record(id)).await.unwrap();
                }
                writer.flush(&cluster).await.unwrap();
                writer.summary()
            });
            let n = n as u64;
            proptest::prop_assert_eq!(summary.records_written, n);
            proptest::prop_assert_eq!(summary.flushes, n.div_ceil(k as u64));
            proptest::prop_assert_eq!(cluster.rows("users").len() as u64, n);
        }
    }
}
