//! # pandoc-converter
//!
//! A gRPC service that converts documents between markup formats by running
//! the external [pandoc](https://pandoc.org) converter once per request.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ConvertRequest
//!  │
//!  ├─ 1. Validate   resolve from/to format tokens, reject empty content
//!  ├─ 2. Workspace  fresh session-XXXXXX directory under the scratch root
//!  ├─ 3. Invoke     pandoc -i input-file -f <from> -o output-file -t <to>
//!  ├─ 4. Release    remove the workspace (also on failure and on drop)
//!  └─ 5. Respond    converted bytes, or a status classified by FailureKind
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pandoc_converter::{convert, ConversionRequest, ConverterConfig, Format};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // pandoc is looked up on PATH when no explicit path is given
//!     let config = ConverterConfig::builder().build()?;
//!     let request = ConversionRequest::new(Format::Markdown, Format::Html5, "# Title");
//!     let result = convert(request, &config).await?;
//!     println!("{}", String::from_utf8_lossy(&result.content));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pandoc-converter` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the service in another server:
//! ```toml
//! pandoc-converter = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod model;
pub mod pipeline;
pub mod server;
pub mod service;
pub mod settings;

/// Generated protobuf messages and gRPC stubs for `converter.v1`.
pub mod proto {
    tonic::include_proto!("converter.v1");
}

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterConfig, ConverterConfigBuilder};
pub use convert::{convert, convert_sync, convert_to_file};
pub use error::{ConverterError, FailureKind};
pub use model::{ConversionRequest, ConversionResult, ConversionStats};
pub use proto::Format;
pub use server::{Protocol, ServerConfig, ServerError, TlsFiles};
pub use service::ConverterService;
pub use settings::{Settings, SettingsError};
