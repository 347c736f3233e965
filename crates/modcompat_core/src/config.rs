//! Scan configuration.
//!
//! # Responsibility
//! - Hold the toggles consumed when the handler registry is built.
//! - Load them from JSON with defaults for every omitted key.
//!
//! # Invariants
//! - Host versions are validated while parsing (`major.minor.patch`).
//! - A validated config names at least one trusted assembly and no blank
//!   ones.

use crate::epoch::{HostEpoch, HostVersionError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Host assemblies whose references are checked for breakage by default.
pub const DEFAULT_TRUSTED_ASSEMBLIES: &[&str] =
    &["StardewModdingAPI", "Stardew Valley", "StardewValley", "Netcode"];

/// Which finder set runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    #[default]
    Normal,
    /// Also flags filesystem and shell access.
    Heightened,
}

impl ScanMode {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "heightened" => Ok(Self::Heightened),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Heightened => "heightened",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Json(String),
    InvalidMode(String),
    InvalidHostVersion(HostVersionError),
    NoTrustedAssemblies,
    BlankTrustedAssembly,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "failed to read config `{}`: {message}", path.display())
            }
            Self::Json(message) => write!(f, "invalid config document: {message}"),
            Self::InvalidMode(mode) => {
                write!(f, "unsupported scan mode `{mode}`; expected normal|heightened")
            }
            Self::InvalidHostVersion(err) => write!(f, "{err}"),
            Self::NoTrustedAssemblies => write!(f, "trusted_assemblies must not be empty"),
            Self::BlankTrustedAssembly => {
                write!(f, "trusted_assemblies must not contain blank names")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidHostVersion(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HostVersionError> for ConfigError {
    fn from(value: HostVersionError) -> Self {
        Self::InvalidHostVersion(value)
    }
}

/// Toggles and epoch for one loader run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub mode: ScanMode,
    pub trusted_assemblies: Vec<String>,
    /// Drop detections for APIs that no longer exist in strict builds.
    pub strict_api: bool,
    pub epoch: HostEpoch,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            mode: ScanMode::Normal,
            trusted_assemblies: DEFAULT_TRUSTED_ASSEMBLIES
                .iter()
                .map(|name| name.to_string())
                .collect(),
            strict_api: false,
            epoch: HostEpoch::default(),
        }
    }
}

impl ScanConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Json(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trusted_assemblies.is_empty() {
            return Err(ConfigError::NoTrustedAssemblies);
        }
        if self
            .trusted_assemblies
            .iter()
            .any(|name| name.trim().is_empty())
        {
            return Err(ConfigError::BlankTrustedAssembly);
        }
        Ok(())
    }

    pub fn is_heightened(&self) -> bool {
        self.mode == ScanMode::Heightened
    }
}
