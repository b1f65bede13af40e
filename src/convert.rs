//! Conversion entry points.
//!
//! [`convert`] drives one call through its states:
//!
//! ```text
//! Received ─▶ Validating ─▶ WorkspacePrepared ─▶ Converting ─▶ Completed
//!                 │                 │                  │
//!                 └──────── Failed(kind) ◀─────────────┘
//! ```
//!
//! Validation happens before any filesystem work, so a rejected request never
//! creates a workspace. Once a workspace exists it is released on the way into
//! either terminal state; if the future is dropped mid-conversion the
//! workspace guard and `kill_on_drop` clean up instead.

use crate::config::ConverterConfig;
use crate::error::ConverterError;
use crate::format;
use crate::model::{ConversionRequest, ConversionResult, ConversionStats};
use crate::pipeline::{invoke, workspace::Workspace};
use crate::proto::Format;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};

/// Tokens resolved for a request that passed validation.
#[derive(Debug)]
struct Validated {
    input_token: &'static str,
    output_token: &'static str,
    to_format: Format,
}

/// Convert one document.
///
/// # Errors
/// - `InvalidFromFormat` / `InvalidToFormat` / `EmptyContent` for bad requests
/// - `WorkspaceCreateFailed`, `InputWriteFailed`, `SpawnFailed`,
///   `ConversionFailed`, `OutputReadFailed` for server-side failures
/// - `Timeout` when `config.timeout` elapses first
pub async fn convert(
    request: ConversionRequest,
    config: &ConverterConfig,
) -> Result<ConversionResult, ConverterError> {
    let total_start = Instant::now();

    // ── Validating ───────────────────────────────────────────────────────
    let validated = validate(&request).inspect_err(|e| error!("{}", e))?;
    debug!(
        input_format = validated.input_token,
        output_format = validated.output_token,
        input_size = request.content().len(),
        "request validated"
    );

    // ── WorkspacePrepared ────────────────────────────────────────────────
    let workspace = Workspace::acquire(&config.scratch_root).inspect_err(|e| error!("{}", e))?;

    // ── Converting ───────────────────────────────────────────────────────
    let converter_start = Instant::now();
    let outcome = invoke::invoke(
        &workspace,
        validated.input_token,
        validated.output_token,
        request.content(),
        config,
    )
    .await;
    let converter_duration_ms = converter_start.elapsed().as_millis() as u64;

    // ── Completed / Failed ───────────────────────────────────────────────
    workspace.release().await;
    let content = outcome?;

    let stats = ConversionStats {
        input_bytes: request.content().len(),
        output_bytes: content.len(),
        converter_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "converted {} → {}: {} → {} bytes in {}ms",
        validated.input_token,
        validated.output_token,
        stats.input_bytes,
        stats.output_bytes,
        stats.total_duration_ms
    );

    Ok(ConversionResult {
        to_format: validated.to_format,
        content,
        stats,
    })
}

/// Convert a document and write the result to `output_path`.
///
/// The bytes are staged in a uniquely named temp file beside the target and
/// renamed over it, so a failed or interrupted call never leaves a truncated
/// file behind and concurrent writers to the same path do not collide.
pub async fn convert_to_file(
    request: ConversionRequest,
    output_path: impl AsRef<Path>,
    config: &ConverterConfig,
) -> Result<ConversionStats, ConverterError> {
    let result = convert(request, config).await?;
    let path = output_path.as_ref().to_path_buf();
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.to_path_buf(),
        None => PathBuf::from("."),
    };

    let target = path.clone();
    let content = result.content;
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        std::fs::create_dir_all(&parent)?;
        let mut staged = tempfile::NamedTempFile::new_in(&parent)?;
        staged.write_all(&content)?;
        // On failure the returned temp file is dropped and deleted.
        staged.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| ConverterError::Internal(format!("output write task failed: {}", e)))?
    .map_err(|e| ConverterError::OutputWriteFailed { path, source: e })?;

    Ok(result.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    request: ConversionRequest,
    config: &ConverterConfig,
) -> Result<ConversionResult, ConverterError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConverterError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(request, config))
}

/// Check formats and content. Never touches the filesystem.
fn validate(request: &ConversionRequest) -> Result<Validated, ConverterError> {
    let input_token = format::resolve(request.from_format()).ok_or(
        ConverterError::InvalidFromFormat {
            format: request.from_format(),
        },
    )?;

    let output_token =
        format::resolve(request.to_format()).ok_or(ConverterError::InvalidToFormat {
            format: request.to_format(),
        })?;

    if request.content().is_empty() {
        return Err(ConverterError::EmptyContent);
    }

    // A registered value is always a known enum member.
    let to_format = Format::try_from(request.to_format()).map_err(|_| {
        ConverterError::InvalidToFormat {
            format: request.to_format(),
        }
    })?;

    Ok(Validated {
        input_token,
        output_token,
        to_format,
    })
}
