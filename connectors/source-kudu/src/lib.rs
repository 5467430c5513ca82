//! Batch source plugin for Apache Kudu.
//!
//! Validates its properties, connects to the configured masters and emits
//! every row of the table (within the column projection) as a structured
//! record. [`discovery`] backs the pipeline editor's schema lookup.

pub mod config;
pub mod discovery;
pub mod reader;

use std::collections::BTreeMap;
use std::sync::Arc;

use kuduflow_sdk::client::{KuduClient, KuduConnect};
use kuduflow_sdk::connector::{Emitter, ReadSummary, Source};
use kuduflow_types::error::{ConnectorError, ValidationResult};
use kuduflow_types::record::RecordSchema;
use kuduflow_types::value::StructuredRecord;
use tracing::{info, warn};

pub use config::Config;

pub struct SourceKudu<C: KuduConnect> {
    config: Config,
    client: C::Client,
}

impl<C: KuduConnect> SourceKudu<C> {
    /// Properties for the scan job's input format.
    #[must_use]
    pub fn input_format_conf(&self) -> BTreeMap<String, String> {
        self.config.input_format_conf()
    }
}

impl<C: KuduConnect> Source for SourceKudu<C> {
    type Config = Config;
    type Connector = C;

    async fn init(config: Self::Config, connector: Self::Connector) -> Result<Self, ConnectorError> {
        config.validate().into_result()?;
        let connection = config.connection_config()?;
        info!(
            table = config.table_name(),
            masters = %connection.master_list(),
            "source-kudu: open"
        );
        let client = connector.connect(&connection).await?;
        Ok(Self { config, client })
    }

    async fn validate(config: &Self::Config) -> Result<ValidationResult, ConnectorError> {
        Ok(config.validate().to_validation_result())
    }

    async fn discover(&mut self) -> Result<RecordSchema, ConnectorError> {
        self.config.output_schema()
    }

    async fn read(
        &mut self,
        emitter: &mut impl Emitter<StructuredRecord>,
    ) -> Result<ReadSummary, ConnectorError> {
        let output = Arc::new(self.config.output_schema()?);
        reader::read_table(
            &self.client,
            self.config.table_name(),
            &self.config.projection(),
            Some(output),
            emitter,
        )
        .await
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        if let Err(e) = self.client.close().await {
            warn!("source-kudu: close failed: {e}");
        }
        info!("source-kudu: close");
        Ok(())
    }
}
