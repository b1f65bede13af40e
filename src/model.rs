//! Request and result types of the conversion pipeline.

use crate::proto::Format;
use serde::{Deserialize, Serialize};

/// One conversion request.
///
/// Format fields hold the raw wire value so that numbers outside the
/// [`Format`] enum reach validation intact instead of being coerced to a
/// default member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    from_format: i32,
    to_format: i32,
    content: Vec<u8>,
}

impl ConversionRequest {
    pub fn new(from_format: Format, to_format: Format, content: impl Into<Vec<u8>>) -> Self {
        Self::from_raw(from_format as i32, to_format as i32, content)
    }

    /// Build a request from raw wire values.
    pub fn from_raw(from_format: i32, to_format: i32, content: impl Into<Vec<u8>>) -> Self {
        Self {
            from_format,
            to_format,
            content: content.into(),
        }
    }

    pub fn from_format(&self) -> i32 {
        self.from_format
    }

    pub fn to_format(&self) -> i32 {
        self.to_format
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

/// The converted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub to_format: Format,
    pub content: Vec<u8>,
    pub stats: ConversionStats,
}

/// Timing and size figures for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub input_bytes: usize,
    pub output_bytes: usize,
    /// Wall-clock time spent in the converter process.
    pub converter_duration_ms: u64,
    /// Wall-clock time for the whole call, workspace setup and teardown included.
    pub total_duration_ms: u64,
}
