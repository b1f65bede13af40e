//! Converter invocation: run pandoc once against a prepared workspace.
//!
//! pandoc is given explicit file paths rather than stdin/stdout so it can
//! sniff encodings and apply format-specific output handling (zip containers
//! for docx/epub/odt, a LaTeX run for pdf) exactly as it does on the command
//! line:
//!
//! ```text
//! pandoc -i <workspace>/input-file -f <from> -o <workspace>/output-file -t <to>
//! ```
//!
//! The child runs in its own process group. Dropping the returned future
//! (caller cancelled, deadline hit, configured timeout elapsed) kills that
//! group, so helper processes pandoc started go down with it. The converter's stdout/stderr are opaque
//! diagnostics: they are captured and passed through verbatim on failure,
//! never parsed.

use crate::config::ConverterConfig;
use crate::error::ConverterError;
use crate::pipeline::workspace::Workspace;
use std::process::{Output, Stdio};
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, error};

/// Convert `content` from `input_token` to `output_token` inside `workspace`.
///
/// Returns the bytes pandoc wrote to the output path.
pub async fn invoke(
    workspace: &Workspace,
    input_token: &str,
    output_token: &str,
    content: &[u8],
    config: &ConverterConfig,
) -> Result<Vec<u8>, ConverterError> {
    let input_path = workspace.input_path();
    let output_path = workspace.output_path();

    debug!("writing {} bytes to {}", content.len(), input_path.display());
    tokio::fs::write(&input_path, content)
        .await
        .map_err(|e| ConverterError::InputWriteFailed {
            path: input_path.clone(),
            source: e,
        })?;

    let mut cmd = Command::new(&config.pandoc_path);
    cmd.arg("-i")
        .arg(&input_path)
        .arg("-f")
        .arg(input_token)
        .arg("-o")
        .arg(&output_path)
        .arg("-t")
        .arg(output_token)
        .current_dir(workspace.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(ref path) = config.path_env {
        cmd.env("PATH", path);
    }
    // Own process group, so helpers pandoc starts (LaTeX for pdf) die with it.
    #[cfg(unix)]
    cmd.process_group(0);

    debug!(cmd = ?cmd.as_std(), "calling pandoc");
    let start = Instant::now();
    let child = cmd.spawn().map_err(|e| ConverterError::SpawnFailed {
        program: config.pandoc_path.clone(),
        source: e,
    })?;
    let mut group = ProcessGroup::new(child.id());

    let run = child.wait_with_output();
    let result = match config.timeout {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(result) => result,
            Err(_) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                error!("pandoc killed after {}ms", elapsed_ms);
                return Err(ConverterError::Timeout { elapsed_ms });
            }
        },
        None => run.await,
    };
    group.disarm();

    let output = result.map_err(|e| {
        ConverterError::Internal(format!("failed to collect converter output: {}", e))
    })?;
    let diagnostics = combined_output(&output);

    if !output.status.success() {
        error!(status = %output.status, output = %diagnostics, "call failed");
        return Err(ConverterError::ConversionFailed {
            status: output.status.to_string(),
            output: diagnostics,
        });
    }
    if !diagnostics.is_empty() {
        debug!(output = %diagnostics, "pandoc diagnostics");
    }

    debug!("reading output file {}", output_path.display());
    tokio::fs::read(&output_path)
        .await
        .map_err(|e| ConverterError::OutputReadFailed {
            path: output_path,
            source: e,
        })
}

/// Kills the converter's whole process group when dropped while armed.
///
/// Dropping happens on timeout and when the caller abandons the call; after
/// a normal exit the guard is disarmed so a recycled group id is never hit.
#[derive(Debug)]
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
                Ok(()) => debug!(pgid, "killed converter process group"),
                // Already gone.
                Err(nix::errno::Errno::ESRCH) => {}
                Err(e) => tracing::warn!(pgid, "failed to kill converter process group: {}", e),
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;
    }
}

/// stdout followed by stderr, decoded lossily.
fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}
