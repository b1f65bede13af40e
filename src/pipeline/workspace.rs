//! Per-call workspace: an isolated scratch directory with guaranteed cleanup.
//!
//! pandoc is driven through explicit input and output paths, so every call
//! needs somewhere on disk to stage its content. Each call gets its own
//! `session-XXXXXX` directory under the scratch root; the random suffix comes
//! from [`tempfile`], which also retries on name collisions.
//!
//! The directory is removed exactly once: by [`Workspace::release`] on the
//! normal path (off the async workers), or by `Drop` when the owning future
//! is dropped early
//! (client cancellation, deadline expiry, panic). Removal failures are logged
//! and swallowed because the outcome of the call is already decided by then.

use crate::error::ConverterError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

const INPUT_FILE: &str = "input-file";
const OUTPUT_FILE: &str = "output-file";

/// An exclusively owned scratch directory for one conversion call.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Create a fresh, uniquely named workspace under `scratch_root`.
    pub fn acquire(scratch_root: &Path) -> Result<Self, ConverterError> {
        let dir = tempfile::Builder::new()
            .prefix("session-")
            .tempdir_in(scratch_root)
            .map_err(|e| ConverterError::WorkspaceCreateFailed {
                root: scratch_root.to_path_buf(),
                source: e,
            })?;
        let path = dir.path().to_path_buf();
        debug!("created temporary directory {}", path.display());
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the request content is written.
    pub fn input_path(&self) -> PathBuf {
        self.path.join(INPUT_FILE)
    }

    /// Where the converter is told to write its result.
    pub fn output_path(&self) -> PathBuf {
        self.path.join(OUTPUT_FILE)
    }

    /// Remove the directory and everything in it.
    ///
    /// The recursive delete runs on the blocking pool; a workspace full of
    /// extracted media must not stall the async workers.
    pub async fn release(mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        debug!("removing temporary content and directory {}", self.path.display());
        let path = self.path.clone();
        match tokio::task::spawn_blocking(move || dir.close()).await {
            Ok(result) => log_removal(&path, result),
            Err(e) => warn!("removal task for {} failed: {}", path.display(), e),
        }
    }

    fn remove(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        debug!("removing temporary content and directory {}", self.path.display());
        log_removal(&self.path, dir.close());
    }
}

fn log_removal(path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => debug!("removal complete"),
        Err(e) => warn!("failed to remove temporary directory {}: {}", path.display(), e),
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove();
    }
}
