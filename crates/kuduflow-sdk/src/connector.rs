//! Async plugin lifecycle traits.

use serde::de::DeserializeOwned;
use serde::Serialize;

use kuduflow_types::error::{ConnectorError, ValidationResult, ValidationStatus};
use kuduflow_types::record::RecordSchema;
use kuduflow_types::value::StructuredRecord;

use crate::client::KuduConnect;

/// Default validation response for plugins that do not implement validation.
pub fn default_validation<C>(_config: &C) -> Result<ValidationResult, ConnectorError> {
    Ok(ValidationResult {
        status: ValidationStatus::Success,
        message: "Validation not implemented".to_string(),
    })
}

/// Receives records produced by a source.
pub trait Emitter<T> {
    /// # Errors
    ///
    /// Implementations may refuse a record, which stops the read.
    fn emit(&mut self, item: T) -> Result<(), ConnectorError>;
}

impl<T> Emitter<T> for Vec<T> {
    fn emit(&mut self, item: T) -> Result<(), ConnectorError> {
        self.push(item);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReadSummary {
    pub records_read: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub records_written: u64,
    pub flushes: u64,
}

/// Batch source lifecycle.
#[allow(async_fn_in_trait)]
pub trait Source: Sized {
    type Config: DeserializeOwned;
    type Connector: KuduConnect;

    async fn init(config: Self::Config, connector: Self::Connector) -> Result<Self, ConnectorError>;

    async fn validate(config: &Self::Config) -> Result<ValidationResult, ConnectorError> {
        default_validation(config)
    }

    /// Schema of the records this source will emit.
    async fn discover(&mut self) -> Result<RecordSchema, ConnectorError>;

    async fn read(
        &mut self,
        emitter: &mut impl Emitter<StructuredRecord>,
    ) -> Result<ReadSummary, ConnectorError>;

    async fn close(&mut self) -> Result<(), ConnectorError> {
        Ok(())
    }
}

/// Batch sink lifecycle.
#[allow(async_fn_in_trait)]
pub trait Destination: Sized {
    type Config: DeserializeOwned;
    type Connector: KuduConnect;

    async fn init(config: Self::Config, connector: Self::Connector) -> Result<Self, ConnectorError>;

    async fn validate(config: &Self::Config) -> Result<ValidationResult, ConnectorError> {
        default_validation(config)
    }

    /// Accept a batch of records. Rows may stay buffered until a later call.
    async fn write(&mut self, records: &[StructuredRecord]) -> Result<(), ConnectorError>;

    /// Flush whatever is still buffered and report the totals.
    async fn close(&mut self) -> Result<WriteSummary, ConnectorError>;
}
