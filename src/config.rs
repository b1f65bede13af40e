//! Configuration for the conversion pipeline.
//!
//! [`ConverterConfig`] is built once at process start and shared read-only
//! (behind an `Arc`) by every call. It carries only what the core needs: where
//! the converter binary lives, the `PATH` its child process sees, where
//! workspaces are created, and an optional wall-clock limit per conversion.
//!
//! # Example
//! ```rust,no_run
//! use pandoc_converter::ConverterConfig;
//! use std::time::Duration;
//!
//! let config = ConverterConfig::builder()
//!     .pandoc_path("/usr/local/bin/pandoc")
//!     .timeout(Duration::from_secs(120))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::ConverterError;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name searched on `PATH` when no explicit converter path is configured.
pub const DEFAULT_CONVERTER: &str = "pandoc";

/// Immutable configuration shared by every conversion call.
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Resolved path of the converter executable.
    pub pandoc_path: PathBuf,

    /// `PATH` handed to the converter process. `None` inherits the server's.
    ///
    /// pandoc shells out to helpers (LaTeX engines for PDF output, for one),
    /// so deployments often need a different search path than the server.
    pub path_env: Option<OsString>,

    /// Directory under which per-call workspaces are created.
    /// Default: the system temp directory.
    pub scratch_root: PathBuf,

    /// Kill the converter after this long. Default: no limit besides the
    /// caller's own deadline.
    pub timeout: Option<Duration>,
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder::default()
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug, Default)]
pub struct ConverterConfigBuilder {
    pandoc_path: Option<PathBuf>,
    path_env: Option<OsString>,
    scratch_root: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ConverterConfigBuilder {
    pub fn pandoc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.pandoc_path = Some(path.into());
        self
    }

    pub fn path_env(mut self, path: impl Into<OsString>) -> Self {
        self.path_env = Some(path.into());
        self
    }

    pub fn scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the configuration, resolving the converter binary if needed.
    ///
    /// Without an explicit path, `pandoc` is searched on the configured
    /// `path_env`, falling back to the server's own `PATH`.
    pub fn build(self) -> Result<ConverterConfig, ConverterError> {
        if let Some(ref path) = self.pandoc_path {
            if path.as_os_str().is_empty() {
                return Err(ConverterError::InvalidConfig(
                    "pandoc path must not be empty".into(),
                ));
            }
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(ConverterError::InvalidConfig(
                "timeout must be greater than zero".into(),
            ));
        }

        let pandoc_path = match self.pandoc_path {
            Some(path) => path,
            None => {
                let search = self
                    .path_env
                    .clone()
                    .or_else(|| std::env::var_os("PATH"))
                    .unwrap_or_default();
                find_on_path(DEFAULT_CONVERTER, &search).ok_or_else(|| {
                    ConverterError::ConverterNotFound {
                        name: DEFAULT_CONVERTER.to_string(),
                    }
                })?
            }
        };

        Ok(ConverterConfig {
            pandoc_path,
            path_env: self.path_env,
            scratch_root: self.scratch_root.unwrap_or_else(std::env::temp_dir),
            timeout: self.timeout,
        })
    }
}

/// Find the first executable file called `name` in a `PATH`-style list.
pub fn find_on_path(name: &str, search: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_is_taken_as_is() {
        let config = ConverterConfig::builder()
            .pandoc_path("/opt/pandoc/bin/pandoc")
            .build()
            .unwrap();
        assert_eq!(config.pandoc_path, PathBuf::from("/opt/pandoc/bin/pandoc"));
        assert_eq!(config.scratch_root, std::env::temp_dir());
        assert!(config.timeout.is_none());
        assert!(config.path_env.is_none());
    }

    #[test]
    fn empty_path_is_rejected() {
        let err = ConverterConfig::builder().pandoc_path("").build().unwrap_err();
        assert!(matches!(err, ConverterError::InvalidConfig(_)), "got: {err}");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ConverterConfig::builder()
            .pandoc_path("pandoc")
            .timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("timeout"), "got: {err}");
    }

    #[test]
    fn missing_converter_is_reported() {
        let empty = tempfile::tempdir().unwrap();
        let err = ConverterConfig::builder()
            .path_env(empty.path().as_os_str())
            .build()
            .unwrap_err();
        assert!(
            matches!(err, ConverterError::ConverterNotFound { ref name } if name == "pandoc"),
            "got: {err}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn converter_is_found_on_configured_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("pandoc");
        std::fs::write(&bin, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = ConverterConfig::builder()
            .path_env(dir.path().as_os_str())
            .build()
            .unwrap();
        assert_eq!(config.pandoc_path, bin);
        assert_eq!(config.path_env.as_deref(), Some(dir.path().as_os_str()));
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pandoc"), "not a program").unwrap();
        assert_eq!(find_on_path("pandoc", dir.path().as_os_str()), None);
    }
}
