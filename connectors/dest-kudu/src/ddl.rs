//! Table provisioning: create the target table when it is missing.
//!
//! An existing table is trusted as-is. Its schema is not compared with the
//! pipeline schema, so divergence only shows up later as per-row type
//! mismatches while writing.

use kuduflow_sdk::client::KuduClient;
use kuduflow_sdk::mapper::{MappingError, SchemaMapper};
use kuduflow_types::error::ConnectorError;
use kuduflow_types::record::FieldDescriptor;
use kuduflow_types::storage::{Compression, Encoding};
use kuduflow_types::table::{CreateTableRequest, HashPartition};
use tracing::{info, warn};

pub const DEFAULT_BUCKETS: u32 = 16;
pub const DEFAULT_REPLICAS: u32 = 1;
pub const DEFAULT_SEED: i32 = 0;

/// How a missing table gets created. Ignored when the table already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningPolicy {
    /// Key and hash-partition columns. Empty means every column.
    pub key_columns: Vec<String>,
    pub buckets: u32,
    pub replicas: u32,
    pub encoding: Encoding,
    pub compression: Compression,
    pub seed: i32,
}

impl Default for ProvisioningPolicy {
    fn default() -> Self {
        Self {
            key_columns: Vec::new(),
            buckets: DEFAULT_BUCKETS,
            replicas: DEFAULT_REPLICAS,
            encoding: Encoding::default(),
            compression: Compression::default(),
            seed: DEFAULT_SEED,
        }
    }
}

/// Outcome of [`ensure_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionResult {
    AlreadyExists,
    Created,
    /// Existence could not be checked. Nothing was created; the write phase
    /// will fail if the table is really absent.
    Deferred { reason: String },
}

/// Build the creation request for `table` from the pipeline fields.
///
/// Every field must map to a storage type. Hash partitioning runs over the
/// key columns.
///
/// # Errors
///
/// Fails on unsupported field types and unknown key columns.
pub fn create_table_request(
    table: &str,
    fields: &[FieldDescriptor],
    policy: &ProvisioningPolicy,
) -> Result<CreateTableRequest, MappingError> {
    let schema = SchemaMapper::strict().to_table_schema(
        fields,
        &policy.key_columns,
        policy.compression,
        policy.encoding,
    )?;
    let partition_columns = schema.key_columns().map(|c| c.name.clone()).collect();
    Ok(CreateTableRequest {
        table_name: table.to_string(),
        schema,
        partitioning: HashPartition {
            columns: partition_columns,
            buckets: policy.buckets,
            seed: policy.seed,
        },
        replicas: policy.replicas,
    })
}

/// Make sure `table` exists, creating it from `fields` and `policy` if not.
///
/// # Errors
///
/// Unsupported field types surface as schema errors; a rejected creation is
/// a provisioning error. A failed existence check is not an error.
pub async fn ensure_table<K: KuduClient>(
    client: &K,
    table: &str,
    fields: &[FieldDescriptor],
    policy: &ProvisioningPolicy,
) -> Result<ProvisionResult, ConnectorError> {
    match client.table_exists(table).await {
        Ok(true) => {
            info!(table, "dest-kudu: table exists, using its schema as-is");
            return Ok(ProvisionResult::AlreadyExists);
        }
        Ok(false) => {}
        Err(e) => {
            warn!(
                table,
                "dest-kudu: unable to check if the table exists, skipping creation: {e}"
            );
            return Ok(ProvisionResult::Deferred {
                reason: e.to_string(),
            });
        }
    }

    let request = create_table_request(table, fields, policy)?;
    client.create_table(&request).await.map_err(|e| {
        ConnectorError::provisioning(
            "CREATE_TABLE_FAILED",
            format!("Unable to create table '{table}': {e}"),
        )
    })?;
    info!(
        table,
        columns = request.schema.columns().len(),
        buckets = request.partitioning.buckets,
        replicas = request.replicas,
        "dest-kudu: created table"
    );
    Ok(ProvisionResult::Created)
}
