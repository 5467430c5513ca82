use std::collections::BTreeMap;
use std::time::Duration;

use kuduflow_sdk::client::{
    parse_masters, ConnectionConfig, DEFAULT_ADMIN_TIMEOUT_MS, DEFAULT_OPERATION_TIMEOUT_MS,
};
use kuduflow_sdk::macros::contains_macro;
use kuduflow_sdk::options::{lenient_string, parse_or};
use kuduflow_sdk::validation::{
    property, validate_master_addresses, validate_reference_name, validate_schema,
    FailureCollector,
};
use kuduflow_types::error::ConnectorError;
use kuduflow_types::record::RecordSchema;
use serde::Deserialize;

use crate::discovery::Projection;

/// Kudu source properties as stored by the pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(rename = "referenceName", default)]
    pub reference_name: String,
    /// Comma-separated `host:port` list of Kudu masters.
    #[serde(default)]
    pub master: String,
    /// Table to read.
    #[serde(default)]
    pub name: String,
    /// Output record schema as JSON text.
    #[serde(default)]
    pub schema: String,
    /// Column projection, comma-separated names or `*`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub columns: Option<String>,
    #[serde(rename = "opt-timeout", default, deserialize_with = "lenient_string")]
    pub operation_timeout_ms: Option<String>,
}

impl Config {
    /// Collect every configuration problem.
    ///
    /// Properties holding a `${...}` macro skip their format checks.
    #[must_use]
    pub fn validate(&self) -> FailureCollector {
        let mut collector = FailureCollector::new();
        collector.extend(validate_reference_name(&self.reference_name));
        if !contains_macro(&self.schema) {
            collector.extend(validate_schema(&self.schema));
        }

        if !contains_macro(&self.master) {
            if self.master.trim().is_empty() {
                collector
                    .add_failure(
                        "Kudu master address list is empty",
                        Some("Provide at least one host:port"),
                    )
                    .set_property(property::MASTER);
            } else {
                collector.extend(validate_master_addresses(&self.master));
            }
        }

        if !contains_macro(&self.name) && self.name.trim().is_empty() {
            collector
                .add_failure("Kudu table is not specified", Some("Set the table name"))
                .set_property(property::TABLE_NAME);
        }

        let timeout_is_macro = self
            .operation_timeout_ms
            .as_deref()
            .is_some_and(contains_macro);
        if !timeout_is_macro {
            if let Err(err) = self.operation_timeout() {
                collector
                    .add_failure(err.message, None)
                    .set_property(property::OPERATION_TIMEOUT);
            }
        }

        collector
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        self.name.trim()
    }

    /// # Errors
    ///
    /// Fails when the timeout is not a non-negative integer.
    pub fn operation_timeout(&self) -> Result<Duration, ConnectorError> {
        parse_or(
            self.operation_timeout_ms.as_deref(),
            DEFAULT_OPERATION_TIMEOUT_MS,
            "timeout in milliseconds",
        )
        .map(Duration::from_millis)
        .map_err(|e| ConnectorError::config("INVALID_TIMEOUT", format!("opt-timeout: {e}")))
    }

    /// # Errors
    ///
    /// Fails on a malformed master list or timeout.
    pub fn connection_config(&self) -> Result<ConnectionConfig, ConnectorError> {
        let masters = parse_masters(&self.master).map_err(|e| {
            ConnectorError::config("INVALID_MASTER", format!("master '{}': {e}", self.master))
        })?;
        if masters.is_empty() {
            return Err(ConnectorError::config(
                "INVALID_MASTER",
                "Kudu master address list is empty",
            ));
        }
        Ok(ConnectionConfig::new(masters)
            .with_operation_timeout(self.operation_timeout()?)
            .with_admin_timeout(Duration::from_millis(DEFAULT_ADMIN_TIMEOUT_MS)))
    }

    /// # Errors
    ///
    /// Fails when the schema text does not parse.
    pub fn output_schema(&self) -> Result<RecordSchema, ConnectorError> {
        RecordSchema::parse_json(&self.schema).map_err(|e| {
            ConnectorError::config("INVALID_SCHEMA", format!("Unable to parse schema: {e}"))
        })
    }

    #[must_use]
    pub fn projection(&self) -> Projection {
        Projection::parse(self.columns.as_deref())
    }

    /// Properties handed to the scan job's input format.
    #[must_use]
    pub fn input_format_conf(&self) -> BTreeMap<String, String> {
        let timeout = self
            .operation_timeout()
            .map_or(DEFAULT_OPERATION_TIMEOUT_MS, |d| {
                u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
            });
        BTreeMap::from([
            ("kudu.mapreduce.input.table".to_string(), self.table_name().to_string()),
            ("kudu.mapreduce.master.address".to_string(), self.master.trim().to_string()),
            ("kudu.mapreduce.operation.timeout.ms".to_string(), timeout.to_string()),
            (
                "kudu.mapreduce.column.projection".to_string(),
                self.projection().to_string(),
            ),
        ])
    }
}
