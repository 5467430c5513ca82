//! Convenience re-exports for plugin authors.
//!
//! ```ignore
//! use kuduflow_sdk::prelude::*;
//! ```

// Plugin traits
pub use crate::connector::{Destination, Emitter, ReadSummary, Source, WriteSummary};

// Client boundary
pub use crate::client::{ClientError, ConnectionConfig, KuduClient, KuduConnect, MasterAddress};

// Mapping and validation
pub use crate::mapper::{MappingError, SchemaMapper, UnsupportedPolicy};
pub use crate::validation::{FailureCollector, ValidationFailure};

// Errors
pub use kuduflow_types::error::{ConnectorError, ValidationResult, ValidationStatus};

// Data model
pub use kuduflow_types::record::{FieldDescriptor, PrimitiveType, RecordSchema};
pub use kuduflow_types::storage::{Compression, Encoding, StorageType, StorageValue};
pub use kuduflow_types::table::{
    ColumnDescriptor, CreateTableRequest, HashPartition, RowOperation, StorageRow, TableSchema,
};
pub use kuduflow_types::value::{StructuredRecord, Value};
