use std::collections::BTreeMap;
use std::time::Duration;

use kuduflow_sdk::client::{
    parse_masters, ConnectionConfig, DEFAULT_ADMIN_TIMEOUT_MS, DEFAULT_BOSS_THREADS,
    DEFAULT_OPERATION_TIMEOUT_MS,
};
use kuduflow_sdk::macros::contains_macro;
use kuduflow_sdk::mapper::field_storage_type;
use kuduflow_sdk::options::{lenient_string, parse_list, parse_or, parse_positive_or, OptionError};
use kuduflow_sdk::validation::{
    property, validate_master_addresses, validate_reference_name, validate_schema,
    FailureCollector,
};
use kuduflow_types::error::ConnectorError;
use kuduflow_types::record::RecordSchema;
use kuduflow_types::storage::{Compression, Encoding};
use serde::Deserialize;

use crate::ddl::{ProvisioningPolicy, DEFAULT_BUCKETS, DEFAULT_REPLICAS, DEFAULT_SEED};
use crate::writer::DEFAULT_ROW_FLUSH;

/// Kudu sink properties as stored by the pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(rename = "referenceName", default)]
    pub reference_name: String,
    /// Table to write to.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub master: String,
    #[serde(default)]
    pub schema: String,
    #[serde(rename = "opt-timeout", default, deserialize_with = "lenient_string")]
    pub operation_timeout_ms: Option<String>,
    #[serde(rename = "admin-timeout", default, deserialize_with = "lenient_string")]
    pub admin_timeout_ms: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub seed: Option<String>,
    /// Key columns to hash by. Unset means every column.
    #[serde(default, deserialize_with = "lenient_string")]
    pub columns: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub replicas: Option<String>,
    #[serde(rename = "compression-algo", default, deserialize_with = "lenient_string")]
    pub compression: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub encoding: Option<String>,
    #[serde(rename = "row-flush", default, deserialize_with = "lenient_string")]
    pub row_flush: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub buckets: Option<String>,
    #[serde(rename = "boss-threads", default, deserialize_with = "lenient_string")]
    pub boss_threads: Option<String>,
}

/// Typed sink settings with every default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkSettings {
    pub table: String,
    pub connection: ConnectionConfig,
    pub schema: RecordSchema,
    pub policy: ProvisioningPolicy,
    pub row_flush: u32,
}

impl Config {
    #[must_use]
    pub fn table_name(&self) -> &str {
        self.name.trim()
    }

    /// Collect every configuration problem.
    ///
    /// Format checks are skipped for every property that still holds a
    /// `${...}` macro; it is checked again once resolved at run time.
    #[must_use]
    pub fn validate(&self) -> FailureCollector {
        let mut collector = FailureCollector::new();
        collector.extend(validate_reference_name(&self.reference_name));

        let schema_is_macro = contains_macro(&self.schema);
        if !schema_is_macro {
            collector.extend(validate_schema(&self.schema));
        }

        if !contains_macro(&self.master) {
            if self.master.trim().is_empty() {
                collector
                    .add_failure(
                        "Kudu master address list is empty",
                        Some("Provide Master Address in format - <hostname>:<port>"),
                    )
                    .set_property(property::MASTER);
            } else {
                collector.extend(validate_master_addresses(&self.master));
            }
        }

        if !contains_macro(&self.name) && self.table_name().is_empty() {
            collector
                .add_failure("Kudu table is not specified", Some("Set the table name"))
                .set_property(property::TABLE_NAME);
        }

        let mut check = |prop: &str, raw: Option<&String>, result: Result<(), OptionError>| {
            if is_macro(raw) {
                return;
            }
            if let Err(e) = result {
                collector.add_failure(e.to_string(), None).set_property(prop);
            }
        };
        check(
            property::OPERATION_TIMEOUT,
            self.operation_timeout_ms.as_ref(),
            self.operation_timeout().map(drop),
        );
        check(
            property::ADMIN_TIMEOUT,
            self.admin_timeout_ms.as_ref(),
            self.admin_timeout().map(drop),
        );
        check(property::SEED, self.seed.as_ref(), self.seed().map(drop));
        check(property::REPLICAS, self.replicas.as_ref(), self.replicas().map(drop));
        check(property::BUCKETS, self.buckets.as_ref(), self.buckets().map(drop));
        check(property::ROW_FLUSH, self.row_flush.as_ref(), self.row_flush().map(drop));
        check(
            property::BOSS_THREADS,
            self.boss_threads.as_ref(),
            self.boss_threads().map(drop),
        );

        if !is_macro(self.compression.as_ref()) {
            if let Err(e) = self.compression() {
                collector
                    .add_failure(e, Some("Use snappy, lz4, zlib, backend configured or No Compression"))
                    .set_property(property::COMPRESSION);
            }
        }
        if !is_macro(self.encoding.as_ref()) {
            if let Err(e) = self.encoding() {
                collector
                    .add_failure(
                        e,
                        Some("Use auto, plain, prefix, group variant, rle, dictionary or bit shuffle"),
                    )
                    .set_property(property::ENCODING);
            }
        }

        if !schema_is_macro {
            if let Ok(schema) = RecordSchema::parse_json(&self.schema) {
                self.validate_fields(&schema, &mut collector);
            }
        }

        collector
    }

    fn validate_fields(&self, schema: &RecordSchema, collector: &mut FailureCollector) {
        let keys = if is_macro(self.columns.as_ref()) {
            Vec::new()
        } else {
            self.key_columns()
        };
        for key in keys {
            if schema.field(&key).is_none() {
                collector
                    .add_failure(
                        format!("key column '{key}' is not a field of the schema"),
                        Some("List only schema fields as key columns"),
                    )
                    .set_property(property::COLUMNS);
            }
        }
        for field in schema.fields() {
            if let Err(e) = field_storage_type(field) {
                collector
                    .add_failure(
                        format!("field {e}"),
                        Some("Use boolean, int, long, float, double, bytes or string fields"),
                    )
                    .set_property(property::SCHEMA);
            }
        }
    }

    /// Properties that still hold `${...}` macros, in declaration order.
    #[must_use]
    pub fn macro_properties(&self) -> Vec<&'static str> {
        let required = [
            (property::TABLE_NAME, &self.name),
            (property::MASTER, &self.master),
            (property::SCHEMA, &self.schema),
        ];
        let optional = [
            (property::OPERATION_TIMEOUT, &self.operation_timeout_ms),
            (property::ADMIN_TIMEOUT, &self.admin_timeout_ms),
            (property::SEED, &self.seed),
            (property::COLUMNS, &self.columns),
            (property::REPLICAS, &self.replicas),
            (property::COMPRESSION, &self.compression),
            (property::ENCODING, &self.encoding),
            (property::ROW_FLUSH, &self.row_flush),
            (property::BUCKETS, &self.buckets),
            (property::BOSS_THREADS, &self.boss_threads),
        ];
        required
            .into_iter()
            .filter(|(_, v)| contains_macro(v))
            .map(|(name, _)| name)
            .chain(
                optional
                    .into_iter()
                    .filter(|(_, v)| is_macro(v.as_ref()))
                    .map(|(name, _)| name),
            )
            .collect()
    }

    /// Key columns as listed, empty when unset.
    #[must_use]
    pub fn key_columns(&self) -> Vec<String> {
        self.columns.as_deref().map(parse_list).unwrap_or_default()
    }

    fn millis(value: Option<&str>, default: u64) -> Result<Duration, OptionError> {
        parse_or(value, default, "timeout in milliseconds").map(Duration::from_millis)
    }

    /// # Errors
    ///
    /// Fails when the value is not a non-negative integer.
    pub fn operation_timeout(&self) -> Result<Duration, OptionError> {
        Self::millis(self.operation_timeout_ms.as_deref(), DEFAULT_OPERATION_TIMEOUT_MS)
    }

    /// # Errors
    ///
    /// Fails when the value is not a non-negative integer.
    pub fn admin_timeout(&self) -> Result<Duration, OptionError> {
        Self::millis(self.admin_timeout_ms.as_deref(), DEFAULT_ADMIN_TIMEOUT_MS)
    }

    /// # Errors
    ///
    /// Fails when the value is not an integer.
    pub fn seed(&self) -> Result<i32, OptionError> {
        parse_or(self.seed.as_deref(), DEFAULT_SEED, "integer seed")
    }

    /// # Errors
    ///
    /// Fails unless the value is a positive integer.
    pub fn replicas(&self) -> Result<u32, OptionError> {
        parse_positive_or(self.replicas.as_deref(), DEFAULT_REPLICAS)
    }

    /// # Errors
    ///
    /// Fails unless the value is a positive integer.
    pub fn buckets(&self) -> Result<u32, OptionError> {
        parse_positive_or(self.buckets.as_deref(), DEFAULT_BUCKETS)
    }

    /// # Errors
    ///
    /// Fails unless the value is a positive integer.
    pub fn row_flush(&self) -> Result<u32, OptionError> {
        parse_positive_or(self.row_flush.as_deref(), DEFAULT_ROW_FLUSH)
    }

    /// # Errors
    ///
    /// Fails unless the value is a positive integer.
    pub fn boss_threads(&self) -> Result<u32, OptionError> {
        parse_positive_or(self.boss_threads.as_deref(), DEFAULT_BOSS_THREADS)
    }

    /// # Errors
    ///
    /// Fails on an unrecognised codec name.
    pub fn compression(&self) -> Result<Compression, String> {
        match self.compression.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(Compression::default()),
            Some(v) => v.parse::<Compression>().map_err(|e| e.to_string()),
        }
    }

    /// # Errors
    ///
    /// Fails on an unrecognised encoding name.
    pub fn encoding(&self) -> Result<Encoding, String> {
        match self.encoding.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(Encoding::default()),
            Some(v) => v.parse::<Encoding>().map_err(|e| e.to_string()),
        }
    }

    /// Table-creation policy with defaults applied.
    ///
    /// # Errors
    ///
    /// Fails on the first option that does not parse.
    pub fn provisioning_policy(&self) -> Result<ProvisioningPolicy, ConnectorError> {
        Ok(ProvisioningPolicy {
            key_columns: self.key_columns(),
            buckets: self.buckets().map_err(|e| invalid(property::BUCKETS, &e))?,
            replicas: self.replicas().map_err(|e| invalid(property::REPLICAS, &e))?,
            encoding: self.encoding().map_err(|e| invalid(property::ENCODING, &e))?,
            compression: self
                .compression()
                .map_err(|e| invalid(property::COMPRESSION, &e))?,
            seed: self.seed().map_err(|e| invalid(property::SEED, &e))?,
        })
    }

    /// # Errors
    ///
    /// Fails on a malformed master list, timeout or thread count.
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
            .with_operation_timeout(
                self.operation_timeout()
                    .map_err(|e| invalid(property::OPERATION_TIMEOUT, &e))?,
            )
            .with_admin_timeout(
                self.admin_timeout()
                    .map_err(|e| invalid(property::ADMIN_TIMEOUT, &e))?,
            )
            .with_boss_threads(
                self.boss_threads()
                    .map_err(|e| invalid(property::BOSS_THREADS, &e))?,
            ))
    }

    /// Resolve into typed settings. Run [`Config::validate`] first to see
    /// every problem at once.
    ///
    /// # Errors
    ///
    /// Fails on the first property that does not resolve.
    pub fn settings(&self) -> Result<SinkSettings, ConnectorError> {
        let schema = RecordSchema::parse_json(&self.schema).map_err(|e| {
            ConnectorError::config("INVALID_SCHEMA", format!("Unable to parse output schema: {e}"))
        })?;
        Ok(SinkSettings {
            table: self.table_name().to_string(),
            connection: self.connection_config()?,
            schema,
            policy: self.provisioning_policy()?,
            row_flush: self.row_flush().map_err(|e| invalid(property::ROW_FLUSH, &e))?,
        })
    }

    /// Properties handed to the write job's output format.
    ///
    /// # Errors
    ///
    /// Fails when the timeout or row-flush option does not parse.
    pub fn output_format_conf(&self) -> Result<BTreeMap<String, String>, ConnectorError> {
        let timeout = self
            .operation_timeout()
            .map_err(|e| invalid(property::OPERATION_TIMEOUT, &e))?;
        let row_flush = self.row_flush().map_err(|e| invalid(property::ROW_FLUSH, &e))?;
        Ok(BTreeMap::from([
            ("kudu.mapreduce.master.addresses".to_string(), self.master.trim().to_string()),
            ("kudu.mapreduce.output.table".to_string(), self.table_name().to_string()),
            (
                "kudu.mapreduce.operation.timeout.ms".to_string(),
                timeout.as_millis().to_string(),
            ),
            ("kudu.mapreduce.buffer.row.count".to_string(), row_flush.to_string()),
        ]))
    }
}

fn is_macro(value: Option<&String>) -> bool {
    value.is_some_and(|v| contains_macro(v))
}

fn invalid(prop: &str, err: &dyn std::fmt::Display) -> ConnectorError {
    ConnectorError::config("INVALID_CONFIG", format!("{prop}: {err}"))
}
