//! Shared record, storage and error model types for the Kudu batch plugins.
//!
//! This crate carries no client or I/O code so both plugins, the SDK and the
//! CLI can depend on it.

pub mod error;
pub mod record;
pub mod storage;
pub mod table;
pub mod value;
