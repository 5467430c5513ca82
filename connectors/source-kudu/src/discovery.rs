//! Schema retrieval for the pipeline editor.
//!
//! Given masters, a table name and an optional projection, connect to Kudu
//! and describe the table as the record schema this source would emit.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use kuduflow_sdk::client::{parse_masters, ClientError, ConnectionConfig, KuduClient, KuduConnect};
use kuduflow_sdk::mapper::SchemaMapper;
use kuduflow_types::error::ConnectorError;
use kuduflow_types::record::RecordSchema;
use kuduflow_types::table::TableSchema;
use serde::Deserialize;
use tracing::{debug, warn};

/// Admin timeout used by the short-lived discovery client.
pub const DISCOVERY_ADMIN_TIMEOUT_MS: u64 = 10_000;

/// Which table columns to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    /// Lower-cased, trimmed column names.
    Columns(Vec<String>),
}

impl Projection {
    /// Parse `*`, a comma-separated list, or nothing (all columns).
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::All;
        };
        if value == "*" {
            return Self::All;
        }
        let mut seen = HashSet::new();
        let columns = value
            .split(',')
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty() && seen.insert(c.clone()))
            .collect();
        Self::Columns(columns)
    }

    /// Case-insensitive match against a table column name.
    #[must_use]
    pub fn includes(&self, column: &str) -> bool {
        match self {
            Self::All => true,
            Self::Columns(names) => {
                let wanted = column.trim().to_lowercase();
                names.iter().any(|n| *n == wanted)
            }
        }
    }

    /// Actual column names of `table` selected by this projection, in table
    /// order. `None` means every column.
    #[must_use]
    pub fn resolve(&self, table: &TableSchema) -> Option<Vec<String>> {
        match self {
            Self::All => None,
            Self::Columns(_) => Some(
                table
                    .columns()
                    .iter()
                    .filter(|c| self.includes(&c.name))
                    .map(|c| c.name.clone())
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::Columns(names) => f.write_str(&names.join(",")),
        }
    }
}

/// Body of a schema-retrieval request.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaRequest {
    pub master: String,
    pub name: String,
    #[serde(default)]
    pub columns: Option<String>,
}

/// Connection settings for the discovery client.
///
/// # Errors
///
/// Fails on a malformed or empty master list.
pub fn discovery_connection(master: &str) -> Result<ConnectionConfig, ConnectorError> {
    let masters = parse_masters(master)
        .map_err(|e| ConnectorError::config("INVALID_MASTER", format!("master '{master}': {e}")))?;
    if masters.is_empty() {
        return Err(ConnectorError::config(
            "INVALID_MASTER",
            "Kudu master address list is empty",
        ));
    }
    Ok(ConnectionConfig::new(masters)
        .with_admin_timeout(Duration::from_millis(DISCOVERY_ADMIN_TIMEOUT_MS))
        .with_statistics(false))
}

/// Describe a table as a record schema named `output`.
///
/// Columns outside the projection and columns whose type has no record
/// counterpart are left out.
///
/// # Errors
///
/// A missing table is a config error; failing to reach Kudu is a transient
/// network error.
pub async fn discover_schema<C: KuduConnect>(
    connector: &C,
    request: &SchemaRequest,
) -> Result<RecordSchema, ConnectorError> {
    let table = request.name.trim();
    let config = discovery_connection(&request.master)?;
    let client = connector
        .connect(&config)
        .await
        .map_err(|e| connect_error(table, &e))?;

    let result = describe(&client, table, &Projection::parse(request.columns.as_deref())).await;
    if let Err(e) = client.close().await {
        warn!("source-kudu: closing discovery client failed: {e}");
    }
    result
}

async fn describe<K: KuduClient>(
    client: &K,
    table: &str,
    projection: &Projection,
) -> Result<RecordSchema, ConnectorError> {
    let exists = client
        .table_exists(table)
        .await
        .map_err(|e| connect_error(table, &e))?;
    if !exists {
        return Err(ConnectorError::config(
            "TABLE_NOT_FOUND",
            format!("Table '{table}' specified in the configuration does not exist."),
        ));
    }

    let schema = client
        .table_schema(table)
        .await
        .map_err(|e| connect_error(table, &e))?;
    let record = SchemaMapper::best_effort()
        .to_record_schema(&schema, "output", |c| projection.includes(&c.name))?;
    debug!(
        table,
        fields = record.fields().len(),
        "source-kudu: discovered schema"
    );
    Ok(record)
}

fn connect_error(table: &str, err: &ClientError) -> ConnectorError {
    match err {
        ClientError::Connectivity(_) => ConnectorError::transient_network(
            "KUDU_UNREACHABLE",
            format!("Unable to connect to Kudu to extract information for table '{table}'. {err}"),
        ),
        other => other.clone().into(),
    }
}
