//! Structured error model for plugin operations.
//!
//! [`ConnectorError`] carries classification, scope and optional diagnostic
//! details. Construct via category-specific factory methods.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad classification of a plugin error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid or unresolvable plugin configuration.
    Config,
    /// One or more configuration properties failed validation.
    Validation,
    /// A schema or type has no mapping between the two schema systems.
    Schema,
    /// A record value does not fit its declared column.
    Data,
    /// Connectivity failure talking to the Kudu masters.
    TransientNetwork,
    /// Table creation was rejected.
    Provisioning,
    /// Internal plugin error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::Validation => "validation",
            Self::Schema => "schema",
            Self::Data => "data",
            Self::TransientNetwork => "transient_network",
            Self::Provisioning => "provisioning",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Blast radius of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorScope {
    /// Affects the whole pipeline stage.
    Stage,
    /// Affects an individual record.
    Record,
}

impl fmt::Display for ErrorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stage => "stage",
            Self::Record => "record",
        };
        f.write_str(s)
    }
}

/// Validation check outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Success,
    Failed,
    Warning,
}

/// Result of a plugin validation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub message: String,
}

/// Structured error from a plugin operation.
///
/// Construct via category-specific factory methods (e.g., [`ConnectorError::config`]).
/// Nothing in the plugins retries on its own; `retryable` only tells the
/// orchestrating framework whether a retry could plausibly succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("[{category}] {code}: {message}")]
pub struct ConnectorError {
    pub category: ErrorCategory,
    pub scope: ErrorScope,
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ConnectorError {
    fn new(
        category: ErrorCategory,
        scope: ErrorScope,
        retryable: bool,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            scope,
            code: code.into(),
            message: message.into(),
            retryable,
            details: None,
        }
    }

    /// Configuration error (not retryable).
    #[must_use]
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Config, ErrorScope::Stage, false, code, message)
    }

    /// Batch of validation failures (not retryable).
    #[must_use]
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, ErrorScope::Stage, false, code, message)
    }

    /// Unsupported schema or type (not retryable).
    #[must_use]
    pub fn schema(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Schema, ErrorScope::Stage, false, code, message)
    }

    /// Data error (not retryable, record scope).
    #[must_use]
    pub fn data(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Data, ErrorScope::Record, false, code, message)
    }

    /// Transient network error (retryable by the framework).
    #[must_use]
    pub fn transient_network(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::TransientNetwork, ErrorScope::Stage, true, code, message)
    }

    /// Table provisioning failure (not retryable).
    #[must_use]
    pub fn provisioning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Provisioning, ErrorScope::Stage, false, code, message)
    }

    /// Internal plugin error (not retryable).
    #[must_use]
    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, ErrorScope::Stage, false, code, message)
    }

    /// Attach structured diagnostic details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Override the default error scope.
    #[must_use]
    pub fn with_scope(mut self, scope: ErrorScope) -> Self {
        self.scope = scope;
        self
    }
}
