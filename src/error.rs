//! Error types for the pandoc-converter library.
//!
//! Every failure of a conversion call is a [`ConverterError`]. Callers that
//! need the coarse protocol category (client fault, server fault, deadline)
//! ask for [`ConverterError::kind`]; the service façade maps that category to
//! a gRPC status code and uses the `Display` text as the status message.
//!
//! Configuration errors ([`ConverterError::InvalidConfig`],
//! [`ConverterError::ConverterNotFound`]) are raised while building a
//! [`crate::config::ConverterConfig`] and never by an individual call.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse failure category of a conversion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request itself is wrong; the caller must fix it.
    InvalidArgument,
    /// Environment or converter failure on the server side.
    Internal,
    /// The converter did not finish within the configured timeout.
    DeadlineExceeded,
}

/// All errors returned by the pandoc-converter library.
#[derive(Debug, Error)]
pub enum ConverterError {
    // ── Request validation ────────────────────────────────────────────────
    /// `from_format` is not a registered format.
    #[error("invalid from format {}", describe_format(.format))]
    InvalidFromFormat { format: i32 },

    /// `to_format` is not a registered format.
    #[error("invalid to format {}", describe_format(.format))]
    InvalidToFormat { format: i32 },

    /// The request carried no content.
    #[error("empty input content")]
    EmptyContent,

    // ── Resource failures ─────────────────────────────────────────────────
    /// The per-call scratch directory could not be created.
    #[error("failed to create temporary directory for call under '{root}': {source}")]
    WorkspaceCreateFailed {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request content could not be written into the workspace.
    #[error("failed to write input to temporary file '{path}': {source}")]
    InputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The converter reported success but its output could not be read.
    #[error("failed to read output file '{path}': {source}")]
    OutputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The converter process could not be started at all.
    #[error("failed to start converter '{program}': {source}")]
    SpawnFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Converter failures ────────────────────────────────────────────────
    /// The converter exited unsuccessfully. `output` is its combined
    /// stdout/stderr, kept verbatim.
    #[error("conversion failed - {status}")]
    ConversionFailed { status: String, output: String },

    /// The converter was killed after running longer than the configured timeout.
    #[error("conversion timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    // ── Output ────────────────────────────────────────────────────────────
    /// Could not write the converted document to its destination file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    // ── Configuration ─────────────────────────────────────────────────────
    /// No converter binary was configured and none was found on `PATH`.
    #[error("converter binary '{name}' not found on PATH; set an explicit pandoc path")]
    ConverterNotFound { name: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ConverterError {
    /// The protocol-level category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            ConverterError::InvalidFromFormat { .. }
            | ConverterError::InvalidToFormat { .. }
            | ConverterError::EmptyContent => FailureKind::InvalidArgument,
            ConverterError::Timeout { .. } => FailureKind::DeadlineExceeded,
            _ => FailureKind::Internal,
        }
    }

    /// Raw converter diagnostics, when the failure came from the converter.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            ConverterError::ConversionFailed { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }
}

/// Render a raw format value as `NAME (n)` or `unknown (n)`.
fn describe_format(value: &i32) -> String {
    match crate::proto::Format::try_from(*value) {
        Ok(format) => format!("{} ({})", format.as_str_name(), value),
        Err(_) => format!("unknown ({})", value),
    }
}
