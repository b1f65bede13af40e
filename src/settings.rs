//! Layered server settings.
//!
//! Every setting can come from four places, highest precedence first:
//!
//! ```text
//! command-line flag ─▶ PANDOC_CONVERTER_* env ─▶ config file ─▶ built-in default
//! ```
//!
//! The binary folds flags and env together (clap's `env` fallback) into one
//! [`Settings`], layers it over the file with [`Settings::or`], and resolves
//! defaults in [`Settings::converter_config`] / [`Settings::server_config`].
//!
//! The config file is YAML with the same kebab-case keys as the flags:
//!
//! ```yaml
//! bind: 127.0.0.1:6000
//! pandoc-path: /usr/local/bin/pandoc
//! path-env-var: /opt/texlive/bin:/usr/bin:/bin
//! timeout-secs: 120
//! ```

use crate::config::ConverterConfig;
use crate::error::ConverterError;
use crate::server::{Protocol, ServerConfig, TlsFiles};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Looked up in the home directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = ".pandoc-converter.yaml";

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_MAX_MESSAGE_MB: u64 = 64;
pub const MAX_MESSAGE_MB: u64 = 4096;

/// One layer of settings. `None` means "not set at this layer".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    pub verbose: Option<bool>,
    pub protocol: Option<Protocol>,
    pub bind: Option<String>,
    pub pandoc_path: Option<PathBuf>,
    pub path_env_var: Option<String>,
    pub tls_key: Option<PathBuf>,
    pub tls_crt: Option<PathBuf>,
    pub scratch_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub max_message_mb: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("TLS needs both tls-crt and tls-key")]
    IncompleteTls,

    #[error("max-message-mb must be between 1 and {max}, got {value}")]
    MessageLimit { value: u64, max: u64 },
}

impl Settings {
    /// `$HOME/.pandoc-converter.yaml`, when a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    /// Parse a YAML document. An empty document sets nothing.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find and load the config file.
    ///
    /// An explicit path must exist. The home-directory default is optional
    /// and silently skipped when absent.
    pub fn discover(explicit: Option<&Path>) -> Result<Option<(PathBuf, Self)>, SettingsError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => path,
                None => return Ok(None),
            },
        };
        let settings = Self::load(&path)?;
        Ok(Some((path, settings)))
    }

    /// Fill every unset field of `self` from `lower`.
    pub fn or(self, lower: Settings) -> Settings {
        Settings {
            verbose: self.verbose.or(lower.verbose),
            protocol: self.protocol.or(lower.protocol),
            bind: self.bind.or(lower.bind),
            pandoc_path: self.pandoc_path.or(lower.pandoc_path),
            path_env_var: self.path_env_var.or(lower.path_env_var),
            tls_key: self.tls_key.or(lower.tls_key),
            tls_crt: self.tls_crt.or(lower.tls_crt),
            scratch_dir: self.scratch_dir.or(lower.scratch_dir),
            timeout_secs: self.timeout_secs.or(lower.timeout_secs),
            max_message_mb: self.max_message_mb.or(lower.max_message_mb),
        }
    }

    pub fn verbose(&self) -> bool {
        self.verbose.unwrap_or(false)
    }

    /// Resolve the converter configuration; unset fields take builder defaults.
    pub fn converter_config(&self) -> Result<ConverterConfig, ConverterError> {
        let mut builder = ConverterConfig::builder();
        if let Some(ref path) = self.pandoc_path {
            builder = builder.pandoc_path(path);
        }
        if let Some(ref path) = self.path_env_var {
            builder = builder.path_env(path);
        }
        if let Some(ref dir) = self.scratch_dir {
            builder = builder.scratch_root(dir);
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    /// Resolve the listener configuration.
    pub fn server_config(&self) -> Result<ServerConfig, SettingsError> {
        let tls = match (&self.tls_crt, &self.tls_key) {
            (Some(cert), Some(key)) => Some(TlsFiles {
                cert: cert.clone(),
                key: key.clone(),
            }),
            (None, None) => None,
            _ => return Err(SettingsError::IncompleteTls),
        };

        let mb = self.max_message_mb.unwrap_or(DEFAULT_MAX_MESSAGE_MB);
        let max_message_bytes = Some(mb)
            .filter(|mb| (1..=MAX_MESSAGE_MB).contains(mb))
            .and_then(|mb| usize::try_from(mb).ok())
            .and_then(|mb| mb.checked_mul(1024 * 1024))
            .ok_or(SettingsError::MessageLimit {
                value: mb,
                max: MAX_MESSAGE_MB,
            })?;

        Ok(ServerConfig {
            protocol: self.protocol.unwrap_or_default(),
            bind: self.bind.clone().unwrap_or_else(|| DEFAULT_BIND.to_string()),
            tls,
            max_message_bytes,
        })
    }
}
