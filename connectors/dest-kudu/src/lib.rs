//! Batch sink plugin for Apache Kudu.
//!
//! [`configure`] runs at pipeline deployment: it validates the properties and
//! provisions the target table when it is missing. [`DestKudu`] is the run
//! stage: it opens the existing table, converts each record against the
//! table's actual schema and writes buffered inserts.

pub mod config;
pub mod ddl;
pub mod writer;

use std::collections::BTreeMap;

use kuduflow_sdk::client::{ClientError, KuduClient, KuduConnect};
use kuduflow_sdk::connector::{Destination, WriteSummary};
use kuduflow_types::error::{ConnectorError, ValidationResult};
use kuduflow_types::value::StructuredRecord;
use tracing::{info, warn};

pub use config::{Config, SinkSettings};
pub use ddl::{ProvisionResult, ProvisioningPolicy};

use writer::RowWriter;

/// Validate `config` and make sure its table exists.
///
/// # Errors
///
/// Fails with every validation problem at once, on unsupported schema
/// fields, or when table creation is rejected. Unresolved macros, an
/// unreachable cluster or a failed existence check only yield
/// [`ProvisionResult::Deferred`].
pub async fn configure<C: KuduConnect>(
    config: &Config,
    connector: &C,
) -> Result<ProvisionResult, ConnectorError> {
    config.validate().into_result()?;
    let macros = config.macro_properties();
    if !macros.is_empty() {
        info!(
            table = config.table_name(),
            "dest-kudu: macros in {}, table creation left to run time",
            macros.join(", ")
        );
        return Ok(ProvisionResult::Deferred {
            reason: format!("unresolved macros in {}", macros.join(", ")),
        });
    }
    let settings = config.settings()?;
    let client = match connector.connect(&settings.connection).await {
        Ok(client) => client,
        Err(e @ ClientError::Connectivity(_)) => {
            warn!(
                table = %settings.table,
                "dest-kudu: unable to reach Kudu, skipping table creation: {e}"
            );
            return Ok(ProvisionResult::Deferred {
                reason: e.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    let result = ddl::ensure_table(
        &client,
        &settings.table,
        settings.schema.fields(),
        &settings.policy,
    )
    .await;
    if let Err(e) = client.close().await {
        warn!("dest-kudu: closing client failed: {e}");
    }
    result
}

pub struct DestKudu<C: KuduConnect> {
    config: Config,
    client: C::Client,
    writer: RowWriter,
}

impl<C: KuduConnect> DestKudu<C> {
    /// Properties for the write job's output format.
    ///
    /// # Errors
    ///
    /// Fails when the timeout or row-flush option does not parse.
    pub fn output_format_conf(&self) -> Result<BTreeMap<String, String>, ConnectorError> {
        self.config.output_format_conf()
    }
}

impl<C: KuduConnect> Destination for DestKudu<C> {
    type Config = Config;
    type Connector = C;

    async fn init(config: Self::Config, connector: Self::Connector) -> Result<Self, ConnectorError> {
        config.validate().into_result()?;
        let settings = config.settings()?;
        info!(
            table = %settings.table,
            masters = %settings.connection.master_list(),
            row_flush = settings.row_flush,
            "dest-kudu: open"
        );
        let client = connector.connect(&settings.connection).await?;
        let row_flush = usize::try_from(settings.row_flush).unwrap_or(usize::MAX);
        let writer = RowWriter::open(&client, &settings.table, row_flush).await?;
        Ok(Self {
            config,
            client,
            writer,
        })
    }

    async fn validate(config: &Self::Config) -> Result<ValidationResult, ConnectorError> {
        Ok(config.validate().to_validation_result())
    }

    async fn write(&mut self, records: &[StructuredRecord]) -> Result<(), ConnectorError> {
        for record in records {
            self.writer.write(&self.client, record).await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<WriteSummary, ConnectorError> {
        self.writer.flush(&self.client).await?;
        if let Err(e) = self.client.close().await {
            warn!("dest-kudu: close failed: {e}");
        }
        let summary = self.writer.summary();
        info!(
            records = summary.records_written,
            flushes = summary.flushes,
            "dest-kudu: close"
        );
        Ok(summary)
    }
}
