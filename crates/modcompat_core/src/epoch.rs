//! Host-compatibility epoch: the running host's version and platform.
//!
//! # Responsibility
//! - Identify which rewrite rules apply to the running host.
//! - Decide whether a module was compiled for a different platform family.
//!
//! # Invariants
//! - Versions are `major.minor.patch` triplets of ASCII digits.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Operating platform a host runs on or a module was compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
    Android,
}

/// Graphics framework family; modules built against one family need
/// facade redirection to run on the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    Xna,
    MonoGame,
}

impl Platform {
    pub fn family(self) -> PlatformFamily {
        match self {
            Self::Windows => PlatformFamily::Xna,
            Self::Linux | Self::MacOs | Self::Android => PlatformFamily::MonoGame,
        }
    }

    /// Platform of the current build target.
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => Self::Windows,
            "macos" => Self::MacOs,
            "android" => Self::Android,
            _ => Self::Linux,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::MacOs => "mac_os",
            Self::Android => "android",
        }
    }
}

/// Host version triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl HostVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses `major.minor.patch`.
    pub fn parse(value: &str) -> Result<Self, HostVersionError> {
        let trimmed = value.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() != 3
            || !parts
                .iter()
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(HostVersionError(trimmed.to_string()));
        }

        let number = |part: &str| {
            part.parse::<u32>()
                .map_err(|_| HostVersionError(trimmed.to_string()))
        };
        Ok(Self::new(
            number(parts[0])?,
            number(parts[1])?,
            number(parts[2])?,
        ))
    }
}

impl PartialOrd for HostVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HostVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl Display for HostVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl TryFrom<String> for HostVersion {
    type Error = HostVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HostVersion> for String {
    fn from(value: HostVersion) -> Self {
        value.to_string()
    }
}

/// Invalid version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostVersionError(pub String);

impl Display for HostVersionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "host version is invalid: {} (expected major.minor.patch)",
            self.0
        )
    }
}

impl Error for HostVersionError {}

/// Version context of the running host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEpoch {
    pub host_version: HostVersion,
    pub platform: Platform,
}

impl HostEpoch {
    pub fn new(host_version: HostVersion, platform: Platform) -> Self {
        Self {
            host_version,
            platform,
        }
    }

    /// Whether a module built for `target` needs platform facades here.
    ///
    /// Modules that do not declare a target are assumed to match the host.
    pub fn platform_changed_for(&self, target: Option<Platform>) -> bool {
        target.is_some_and(|platform| platform.family() != self.platform.family())
    }

    pub fn is_at_least(&self, version: HostVersion) -> bool {
        self.host_version >= version
    }
}

impl Default for HostEpoch {
    fn default() -> Self {
        Self::new(HostVersion::new(1, 3, 36), Platform::current())
    }
}
