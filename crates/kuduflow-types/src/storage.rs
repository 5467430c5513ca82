//! Kudu column storage types, encodings and compression codecs.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Column type as stored by Kudu.
///
/// `Int8` and `Int16` only show up when reading tables created outside the
/// plugins. `UnixtimeMicros`, `Decimal`, `Varchar` and `Date` have no
/// structured-record counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    String,
    Binary,
    UnixtimeMicros,
    Decimal,
    Varchar,
    Date,
}

impl StorageType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Binary => "binary",
            Self::UnixtimeMicros => "unixtime_micros",
            Self::Decimal => "decimal",
            Self::Varchar => "varchar",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Option value that names no known encoding or compression codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownOptionError {
    pub kind: &'static str,
    pub value: String,
}

/// Column encoding applied at table creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    #[default]
    Auto,
    Plain,
    Prefix,
    GroupVarint,
    Rle,
    Dictionary,
    BitShuffle,
}

impl Encoding {
    pub const ALL: [Self; 7] = [
        Self::Auto,
        Self::Plain,
        Self::Prefix,
        Self::GroupVarint,
        Self::Rle,
        Self::Dictionary,
        Self::BitShuffle,
    ];

    /// Name accepted in the plugin's `encoding` property.
    #[must_use]
    pub fn option_name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Plain => "plain",
            Self::Prefix => "prefix",
            Self::GroupVarint => "group variant",
            Self::Rle => "rle",
            Self::Dictionary => "dictionary",
            Self::BitShuffle => "bit shuffle",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.option_name())
    }
}

impl FromStr for Encoding {
    type Err = UnknownOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|e| e.option_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownOptionError {
                kind: "encoding",
                value: s.to_string(),
            })
    }
}

/// Column compression codec applied at table creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    #[default]
    Snappy,
    Lz4,
    Zlib,
    /// Leave the codec to the tablet server's configured default.
    Default,
    None,
}

impl Compression {
    pub const ALL: [Self; 5] = [
        Self::Snappy,
        Self::Lz4,
        Self::Zlib,
        Self::Default,
        Self::None,
    ];

    /// Name accepted in the plugin's `compression-algo` property.
    #[must_use]
    pub fn option_name(self) -> &'static str {
        match self {
            Self::Snappy => "snappy",
            Self::Lz4 => "lz4",
            Self::Zlib => "zlib",
            Self::Default => "backend configured",
            Self::None => "No Compression",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.option_name())
    }
}

impl FromStr for Compression {
    type Err = UnknownOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.option_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownOptionError {
                kind: "compression algorithm",
                value: s.to_string(),
            })
    }
}

/// A single typed cell as read from or written to a Kudu row.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageValue {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    Binary(Bytes),
    UnixtimeMicros(i64),
    Date(i32),
    Decimal { unscaled: i128, scale: u8 },
}

impl StorageValue {
    /// Storage type of the cell, `None` for null.
    #[must_use]
    pub fn storage_type(&self) -> Option<StorageType> {
        let t = match self {
            Self::Null => return None,
            Self::Bool(_) => StorageType::Bool,
            Self::Int8(_) => StorageType::Int8,
            Self::Int16(_) => StorageType::Int16,
            Self::Int32(_) => StorageType::Int32,
            Self::Int64(_) => StorageType::Int64,
            Self::Float(_) => StorageType::Float,
            Self::Double(_) => StorageType::Double,
            Self::String(_) => StorageType::String,
            Self::Binary(_) => StorageType::Binary,
            Self::UnixtimeMicros(_) => StorageType::UnixtimeMicros,
            Self::Date(_) => StorageType::Date,
            Self::Decimal { .. } => StorageType::Decimal,
        };
        Some(t)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}
