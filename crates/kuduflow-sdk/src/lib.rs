//! SDK shared by the Kudu batch source and sink plugins.
//!
//! Holds everything both plugins need: the schema mapper between structured
//! records and Kudu tables, configuration validation, macro resolution, the
//! Kudu client boundary and the plugin lifecycle traits.

pub mod client;
pub mod connector;
pub mod macros;
pub mod mapper;
pub mod options;
pub mod prelude;
pub mod validation;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use kuduflow_types as types;
