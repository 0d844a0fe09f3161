//! # Core Type Definitions
//!
//! This module contains the types shared by every Keyscope component:
//! - Stored value representation (`RawValue`, `ContainerKind`)
//! - Encoding classification (`DetectedEncoding`)
//! - Error types (`KeyscopeError`, `GraphDecodeError`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// STORED VALUES
// =============================================================================

/// Container kind declared by the key-value store for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    String,
    Hash,
    List,
    Set,
    ZSet,
}

impl ContainerKind {
    /// The store's own name for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Hash => "hash",
            Self::List => "list",
            Self::Set => "set",
            Self::ZSet => "zset",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerKind {
    type Err = KeyscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(Self::String),
            "hash" => Ok(Self::Hash),
            "list" => Ok(Self::List),
            "set" => Ok(Self::Set),
            "zset" => Ok(Self::ZSet),
            other => Err(KeyscopeError::InvalidContainerKind(other.to_string())),
        }
    }
}

/// A value fetched from the store for one display request.
///
/// Ephemeral: it is built per request and never persisted by the CORE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    /// Container kind declared by the store.
    pub kind: ContainerKind,
    /// The stored bytes.
    pub bytes: Vec<u8>,
}

impl RawValue {
    /// Create a raw value of the given kind.
    #[must_use]
    pub fn new(kind: ContainerKind, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            bytes: bytes.into(),
        }
    }

    /// Create a raw value for a plain string key.
    #[must_use]
    pub fn string(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(ContainerKind::String, bytes)
    }

    /// UTF-8 view of the bytes, if they are valid UTF-8.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Best-effort classification of a stored value's encoding.
///
/// This is a guess made from content alone, never a guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectedEncoding {
    Json,
    ForeignObject,
    Base64,
    Hex,
    #[serde(rename = "url")]
    UrlEncoded,
    Raw,
}

impl DetectedEncoding {
    /// Every encoding, in detection priority order.
    pub const ALL: [Self; 6] = [
        Self::ForeignObject,
        Self::Json,
        Self::UrlEncoded,
        Self::Hex,
        Self::Base64,
        Self::Raw,
    ];

    /// Machine name, accepted back by `FromStr`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::ForeignObject => "foreign-object",
            Self::Base64 => "base64",
            Self::Hex => "hex",
            Self::UrlEncoded => "url",
            Self::Raw => "raw",
        }
    }

    /// Human label for format pickers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::ForeignObject => "Serialized Object",
            Self::Base64 => "Base64",
            Self::Hex => "Hex",
            Self::UrlEncoded => "URL Encoded",
            Self::Raw => "Raw Text",
        }
    }

    /// Parse an encoding selection where `auto` means "no override".
    pub fn parse_selection(s: &str) -> Result<Option<Self>, KeyscopeError> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(None);
        }
        s.parse().map(Some)
    }
}

impl fmt::Display for DetectedEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectedEncoding {
    type Err = KeyscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "foreign-object" | "object" | "java" => Ok(Self::ForeignObject),
            "base64" => Ok(Self::Base64),
            "hex" => Ok(Self::Hex),
            "url" | "url-encoded" => Ok(Self::UrlEncoded),
            "raw" | "utf-8" | "utf8" => Ok(Self::Raw),
            other => Err(KeyscopeError::InvalidEncoding(other.to_string())),
        }
    }
}

/// Direction of a codec operation, used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Decode,
    Encode,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode => f.write_str("decoded"),
            Self::Encode => f.write_str("encoded"),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Failure reported by an external object stream decoder.
///
/// This is the one failure the CORE never degrades: the byte stream could not
/// be parsed as an object stream at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", .offset.map(|o| format!(" (at byte {o})")).unwrap_or_default())]
pub struct GraphDecodeError {
    /// What went wrong.
    pub message: String,
    /// Byte offset of the failure, when the decoder knows it.
    pub offset: Option<usize>,
}

impl GraphDecodeError {
    /// Create an error without position information.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: None,
        }
    }

    /// Create an error pointing at a byte offset.
    #[must_use]
    pub fn at(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset: Some(offset),
        }
    }
}

/// Errors that can occur in the Keyscope system.
///
/// - Heuristic failures are not errors: detection falls back to `Raw`,
///   base64/url decoding falls back to the input
/// - Depth truncation is data in the output tree, not an error
/// - The CORE never panics
#[derive(Debug, Error)]
pub enum KeyscopeError {
    /// Hex input with an odd number of digits.
    #[error("Hex input has an odd number of digits ({0})")]
    OddLengthHex(usize),

    /// Input that is not valid JSON where JSON is required.
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// The encoding has no text form in this direction.
    #[error("{encoding} values cannot be {direction} as text")]
    Unsupported {
        encoding: DetectedEncoding,
        direction: Direction,
    },

    /// The external object stream decoder could not parse the value.
    #[error("Object stream decode failed: {0}")]
    GraphDecode(#[from] GraphDecodeError),

    /// Unknown encoding name.
    #[error("Unknown encoding: {0}")]
    InvalidEncoding(String),

    /// Unknown container kind name.
    #[error("Unknown container kind: {0}")]
    InvalidContainerKind(String),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A serialization error occurred while rendering output.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
