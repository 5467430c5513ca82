//! Configuration validation that reports every problem in one pass.
//!
//! Each validator returns the list of [`ValidationFailure`]s it found rather
//! than stopping at the first one. Plugins push everything into a
//! [`FailureCollector`] and only turn it into an error at the end.

use serde::Serialize;

use kuduflow_types::error::{ConnectorError, ValidationResult, ValidationStatus};
use kuduflow_types::record::RecordSchema;

use crate::client::MasterAddress;

/// Property names as they appear in plugin configuration.
pub mod property {
    pub const REFERENCE_NAME: &str = "referenceName";
    pub const TABLE_NAME: &str = "name";
    pub const MASTER: &str = "master";
    pub const SCHEMA: &str = "schema";
    pub const OPERATION_TIMEOUT: &str = "opt-timeout";
    pub const ADMIN_TIMEOUT: &str = "admin-timeout";
    pub const SEED: &str = "seed";
    pub const COLUMNS: &str = "columns";
    pub const REPLICAS: &str = "replicas";
    pub const COMPRESSION: &str = "compression-algo";
    pub const ENCODING: &str = "encoding";
    pub const ROW_FLUSH: &str = "row-flush";
    pub const BUCKETS: &str = "buckets";
    pub const BOSS_THREADS: &str = "boss-threads";
}

/// One configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrective_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

impl ValidationFailure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            corrective_action: None,
            property: None,
        }
    }

    #[must_use]
    pub fn with_corrective_action(mut self, action: impl Into<String>) -> Self {
        self.corrective_action = Some(action.into());
        self
    }

    #[must_use]
    pub fn with_config_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Attach the property to a failure already held by a collector.
    pub fn set_property(&mut self, property: impl Into<String>) -> &mut Self {
        self.property = Some(property.into());
        self
    }
}

/// Accumulates validation failures across every property of a config.
#[derive(Debug, Clone, Default)]
pub struct FailureCollector {
    failures: Vec<ValidationFailure>,
}

impl FailureCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and return it for further decoration.
    pub fn add_failure(
        &mut self,
        message: impl Into<String>,
        corrective_action: Option<&str>,
    ) -> &mut ValidationFailure {
        let mut failure = ValidationFailure::new(message);
        failure.corrective_action = corrective_action.map(str::to_string);
        self.failures.push(failure);
        let last = self.failures.len() - 1;
        &mut self.failures[last]
    }

    pub fn extend(&mut self, failures: impl IntoIterator<Item = ValidationFailure>) {
        self.failures.extend(failures);
    }

    #[must_use]
    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn the collected failures into a single validation error.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::validation("INVALID_CONFIG")` carrying every
    /// failure in `details` when at least one was collected.
    pub fn into_result(self) -> Result<(), ConnectorError> {
        if self.failures.is_empty() {
            return Ok(());
        }
        let message = summarize(&self.failures);
        let details = serde_json::to_value(&self.failures).unwrap_or_default();
        Err(ConnectorError::validation("INVALID_CONFIG", message).with_details(details))
    }

    #[must_use]
    pub fn to_validation_result(&self) -> ValidationResult {
        if self.failures.is_empty() {
            ValidationResult {
                status: ValidationStatus::Success,
                message: "configuration is valid".to_string(),
            }
        } else {
            ValidationResult {
                status: ValidationStatus::Failed,
                message: summarize(&self.failures),
            }
        }
    }
}

fn summarize(failures: &[ValidationFailure]) -> String {
    let lines: Vec<String> = failures
        .iter()
        .map(|f| match &f.property {
            Some(p) => format!("{p}: {}", f.message),
            None => f.message.clone(),
        })
        .collect();
    format!(
        "{} configuration problem(s): {}",
        failures.len(),
        lines.join("; ")
    )
}

/// Check a comma-separated `host:port` master list.
///
/// Every malformed token is reported, each under the `master` property.
/// Empty tokens between commas are ignored.
#[must_use]
pub fn validate_master_addresses(masters: &str) -> Vec<ValidationFailure> {
    masters
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse::<MasterAddress>().err().map(|e| (token, e)))
        .map(|(token, err)| {
            ValidationFailure::new(format!("invalid master address '{token}': {err}"))
                .with_corrective_action("Use host:port pairs separated by commas, e.g. kudu-1:7051,kudu-2:7051")
                .with_config_property(property::MASTER)
        })
        .collect()
}

/// Check that the schema text parses as a record schema.
#[must_use]
pub fn validate_schema(schema: &str) -> Vec<ValidationFailure> {
    match RecordSchema::parse_json(schema) {
        Ok(_) => Vec::new(),
        Err(err) => vec![ValidationFailure::new(format!("invalid schema: {err}"))
            .with_corrective_action("Provide a record schema with a name and a list of fields")
            .with_config_property(property::SCHEMA)],
    }
}

/// Check a lineage reference name: non-empty, letters, digits and `_ . $ -`.
#[must_use]
pub fn validate_reference_name(name: &str) -> Vec<ValidationFailure> {
    let problem = if name.is_empty() {
        Some("reference name must not be empty".to_string())
    } else {
        name.chars()
            .find(|&ch| !is_reference_char(ch))
            .map(|ch| format!("reference name '{name}' contains invalid character '{ch}'"))
    };
    problem
        .map(|message| {
            ValidationFailure::new(message)
                .with_corrective_action("Use only letters, numbers and '_', '.', '$', '-'")
                .with_config_property(property::REFERENCE_NAME)
        })
        .into_iter()
        .collect()
}

fn is_reference_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '$' | '-')
}
