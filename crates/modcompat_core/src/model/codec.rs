//! On-disk module container.
//!
//! Binary containers start with the `MODC` magic and a little-endian format
//! version, followed by a `bincode` payload. JSON documents are accepted for
//! hand-written fixtures. Rewritten modules are written through
//! [`ModuleDef::encode_lowered`].

use crate::model::module::ModuleDef;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAGIC: &[u8; 4] = b"MODC";
const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = MAGIC.len() + 2;

/// Module decode/encode errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleDecodeError {
    Empty,
    Truncated,
    UnknownFormat,
    UnsupportedVersion { found: u16, supported: u16 },
    Binary(String),
    Json(String),
}

impl Display for ModuleDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "module image is empty"),
            Self::Truncated => write!(f, "module image is truncated"),
            Self::UnknownFormat => write!(f, "module image has an unknown format"),
            Self::UnsupportedVersion { found, supported } => write!(
                f,
                "module format version {found} is not supported (latest supported {supported})"
            ),
            Self::Binary(message) => write!(f, "invalid binary module: {message}"),
            Self::Json(message) => write!(f, "invalid module document: {message}"),
        }
    }
}

impl Error for ModuleDecodeError {}

impl ModuleDef {
    /// Decodes a binary container or a JSON document.
    pub fn decode(bytes: &[u8]) -> Result<Self, ModuleDecodeError> {
        if bytes.is_empty() {
            return Err(ModuleDecodeError::Empty);
        }

        if bytes.starts_with(MAGIC) {
            if bytes.len() < HEADER_LEN {
                return Err(ModuleDecodeError::Truncated);
            }
            let found = u16::from_le_bytes([bytes[MAGIC.len()], bytes[MAGIC.len() + 1]]);
            if found != FORMAT_VERSION {
                return Err(ModuleDecodeError::UnsupportedVersion {
                    found,
                    supported: FORMAT_VERSION,
                });
            }
            return bincode::deserialize(&bytes[HEADER_LEN..])
                .map_err(|err| ModuleDecodeError::Binary(err.to_string()));
        }

        let first = bytes.iter().find(|byte| !byte.is_ascii_whitespace());
        if first == Some(&b'{') {
            return serde_json::from_slice(bytes)
                .map_err(|err| ModuleDecodeError::Json(err.to_string()));
        }

        Err(ModuleDecodeError::UnknownFormat)
    }

    /// Encodes this module as a binary container.
    pub fn encode(&self) -> Result<Vec<u8>, ModuleDecodeError> {
        let payload =
            bincode::serialize(self).map_err(|err| ModuleDecodeError::Binary(err.to_string()))?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Encodes the physical form of this module, with accessor-field slots
    /// expanded. This is what gets written for the host to load.
    pub fn encode_lowered(&self) -> Result<Vec<u8>, ModuleDecodeError> {
        self.lowered().encode()
    }
}
