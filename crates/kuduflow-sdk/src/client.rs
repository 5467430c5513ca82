//! Boundary to the Kudu client library.
//!
//! The plugins never talk to Kudu directly: they build a [`ConnectionConfig`]
//! from their options and go through [`KuduConnect`] / [`KuduClient`]. The
//! client owns timeout enforcement and batching; nothing here retries.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use kuduflow_types::error::ConnectorError;
use kuduflow_types::table::{CreateTableRequest, RowOperation, StorageRow, TableSchema};

pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_ADMIN_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_BOSS_THREADS: u32 = 1;

/// One Kudu master endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MasterAddress {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for MasterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Why a `host:port` token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("expected host:port")]
    MissingPort,
    #[error("expected exactly one ':' between host and port")]
    TooManyColons,
    #[error("host is empty")]
    EmptyHost,
    #[error("port '{0}' is not a number between 0 and 65535")]
    InvalidPort(String),
}

impl FromStr for MasterAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let (host, port) = token.split_once(':').ok_or(AddressError::MissingPort)?;
        if port.contains(':') {
            return Err(AddressError::TooManyColons);
        }
        let host = host.trim();
        if host.is_empty() {
            return Err(AddressError::EmptyHost);
        }
        let port = port.trim();
        let port = port
            .parse::<u16>()
            .map_err(|_| AddressError::InvalidPort(port.to_string()))?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

/// Parse a comma-separated master list, ignoring blank entries.
///
/// # Errors
///
/// Returns the first malformed token's error. Use
/// [`crate::validation::validate_master_addresses`] to see all of them.
pub fn parse_masters(masters: &str) -> Result<Vec<MasterAddress>, AddressError> {
    masters
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::parse)
        .collect()
}

/// Everything needed to open a client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub masters: Vec<MasterAddress>,
    pub operation_timeout: Duration,
    pub admin_timeout: Duration,
    pub boss_threads: u32,
    /// Client-side statistics collection.
    pub statistics: bool,
}

impl ConnectionConfig {
    /// Config with the plugin defaults for every timeout.
    #[must_use]
    pub fn new(masters: Vec<MasterAddress>) -> Self {
        Self {
            masters,
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
            admin_timeout: Duration::from_millis(DEFAULT_ADMIN_TIMEOUT_MS),
            boss_threads: DEFAULT_BOSS_THREADS,
            statistics: true,
        }
    }

    #[must_use]
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_admin_timeout(mut self, timeout: Duration) -> Self {
        self.admin_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_boss_threads(mut self, threads: u32) -> Self {
        self.boss_threads = threads;
        self
    }

    #[must_use]
    pub fn with_statistics(mut self, enabled: bool) -> Self {
        self.statistics = enabled;
        self
    }

    /// Masters joined back into `host:port,host:port` form.
    #[must_use]
    pub fn master_list(&self) -> String {
        self.masters
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Failures reported by the Kudu client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("cannot reach Kudu masters: {0}")]
    Connectivity(String),
    #[error("table '{0}' does not exist")]
    TableNotFound(String),
    #[error("Kudu rejected the request: {0}")]
    Rejected(String),
}

impl From<ClientError> for ConnectorError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Connectivity(_) => {
                ConnectorError::transient_network("KUDU_UNREACHABLE", err.to_string())
            }
            ClientError::TableNotFound(_) => {
                ConnectorError::config("TABLE_NOT_FOUND", err.to_string())
            }
            ClientError::Rejected(_) => ConnectorError::internal("KUDU_REJECTED", err.to_string()),
        }
    }
}

/// An open client session.
#[allow(async_fn_in_trait)]
pub trait KuduClient {
    async fn table_exists(&self, table: &str) -> Result<bool, ClientError>;

    async fn create_table(&self, request: &CreateTableRequest) -> Result<(), ClientError>;

    /// Schema of an existing table.
    async fn table_schema(&self, table: &str) -> Result<TableSchema, ClientError>;

    /// Read every row, restricted to `projection` when given.
    async fn scan(
        &self,
        table: &str,
        projection: Option<&[String]>,
    ) -> Result<Vec<StorageRow>, ClientError>;

    /// Apply a batch of write operations as one flush.
    async fn apply(&self, table: &str, operations: Vec<RowOperation>) -> Result<(), ClientError>;

    async fn close(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Opens client sessions.
#[allow(async_fn_in_trait)]
pub trait KuduConnect {
    type Client: KuduClient;

    async fn connect(&self, config: &ConnectionConfig) -> Result<Self::Client, ClientError>;
}
