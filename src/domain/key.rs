//! Identity of a monitored telemetry source.
//!
//! A source is identified by the kind of value it carries, its name and the
//! human-readable value kind announced by the producer. The channel is not
//! part of the key; the store partitions keys by channel.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of value a telemetry source carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceType {
    Int,
    UInt,
    LongLong,
    ULongLong,
    String,
    Double,
    DateTime,
    Time,
}

impl SourceType {
    /// All source types, in declaration order.
    pub const ALL: [SourceType; 8] = [
        SourceType::Int,
        SourceType::UInt,
        SourceType::LongLong,
        SourceType::ULongLong,
        SourceType::String,
        SourceType::Double,
        SourceType::DateTime,
        SourceType::Time,
    ];

    /// Stable textual name used in persisted files.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Int => "Int",
            SourceType::UInt => "UInt",
            SourceType::LongLong => "LongLong",
            SourceType::ULongLong => "ULongLong",
            SourceType::String => "String",
            SourceType::Double => "Double",
            SourceType::DateTime => "DateTime",
            SourceType::Time => "Time",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a textual source type is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source type \"{0}\"")]
pub struct UnknownSourceType(pub String);

impl FromStr for SourceType {
    type Err = UnknownSourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownSourceType(s.to_string()))
    }
}

/// Key under which a source's mute state is tracked within a channel.
///
/// Two keys are equal iff the source type, name and type name all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SuppressionKey {
    source_type: SourceType,
    name: String,
    type_name: String,
}

impl SuppressionKey {
    /// Create a key for a source.
    pub fn new(
        source_type: SourceType,
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            source_type,
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    /// Kind of value the source carries.
    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    /// Source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value kind announced by the producer (e.g. "Temperature").
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl fmt::Display for SuppressionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.source_type, self.name, self.type_name)
    }
}
