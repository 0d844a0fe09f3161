//! # Value Codec
//!
//! Pure conversion between stored bytes and display text for the text
//! encodings Keyscope understands.
//!
//! Two layers are exposed:
//! - `decode_bytes` / `encode_bytes` work on payload bytes and are exact
//!   inverses for hex and base64 over every byte sequence
//! - `decode` / `encode` work on display text (payload read as UTF-8)
//!
//! Failure policy:
//! - base64 and url decode failures fall back to the input unchanged
//! - hex with an odd number of digits is an error surfaced to the caller
//! - JSON is pretty-printed with two-space indentation and integers beyond
//!   `MAX_SAFE_INTEGER` become decimal strings

use crate::detector::{is_likely_json, is_separator};
use crate::primitives::MAX_SAFE_INTEGER;
use crate::{DetectedEncoding, Direction, KeyscopeError};
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::Value;
use std::borrow::Cow;

/// Decoder accepting padded and unpadded input.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// The ValueCodec converts between stored bytes and display strings.
pub struct ValueCodec;

impl ValueCodec {
    // =========================================================================
    // TEXT LAYER
    // =========================================================================

    /// Decode stored bytes into a display string.
    pub fn decode(input: &[u8], encoding: DetectedEncoding) -> Result<String, KeyscopeError> {
        match encoding {
            DetectedEncoding::Json => Self::pretty_json(&String::from_utf8_lossy(input)),
            DetectedEncoding::UrlEncoded => {
                let text = String::from_utf8_lossy(input);
                Ok(match urlencoding::decode(&text) {
                    Ok(decoded) => decoded.into_owned(),
                    Err(_) => text.into_owned(),
                })
            }
            DetectedEncoding::Base64 | DetectedEncoding::Hex | DetectedEncoding::Raw => {
                let payload = Self::decode_bytes(input, encoding)?;
                Ok(String::from_utf8_lossy(&payload).into_owned())
            }
            DetectedEncoding::ForeignObject => Err(KeyscopeError::Unsupported {
                encoding,
                direction: Direction::Decode,
            }),
        }
    }

    /// Encode display text back into stored bytes.
    pub fn encode(text: &str, encoding: DetectedEncoding) -> Result<Vec<u8>, KeyscopeError> {
        Self::encode_bytes(text.as_bytes(), encoding)
    }

    // =========================================================================
    // BYTE LAYER
    // =========================================================================

    /// Decode stored bytes into payload bytes.
    ///
    /// JSON and raw values are their own payload.
    pub fn decode_bytes(input: &[u8], encoding: DetectedEncoding) -> Result<Vec<u8>, KeyscopeError> {
        match encoding {
            DetectedEncoding::Base64 => {
                let cleaned = strip_ascii_whitespace(input);
                Ok(LENIENT_BASE64
                    .decode(&cleaned)
                    .unwrap_or_else(|_| input.to_vec()))
            }
            DetectedEncoding::Hex => decode_hex(input),
            DetectedEncoding::UrlEncoded => Ok(urlencoding::decode_binary(input).into_owned()),
            DetectedEncoding::Json | DetectedEncoding::Raw => Ok(input.to_vec()),
            DetectedEncoding::ForeignObject => Err(KeyscopeError::Unsupported {
                encoding,
                direction: Direction::Decode,
            }),
        }
    }

    /// Encode payload bytes into stored bytes.
    ///
    /// JSON payloads are validated and stored as written.
    pub fn encode_bytes(payload: &[u8], encoding: DetectedEncoding) -> Result<Vec<u8>, KeyscopeError> {
        match encoding {
            DetectedEncoding::Base64 => Ok(STANDARD.encode(payload).into_bytes()),
            DetectedEncoding::Hex => Ok(hex::encode(payload).into_bytes()),
            DetectedEncoding::UrlEncoded => {
                Ok(urlencoding::encode_binary(payload).into_owned().into_bytes())
            }
            DetectedEncoding::Json => {
                serde_json::from_slice::<serde::de::IgnoredAny>(payload)
                    .map_err(|e| KeyscopeError::InvalidJson(e.to_string()))?;
                Ok(payload.to_vec())
            }
            DetectedEncoding::Raw => Ok(payload.to_vec()),
            DetectedEncoding::ForeignObject => Err(KeyscopeError::Unsupported {
                encoding,
                direction: Direction::Encode,
            }),
        }
    }

    // =========================================================================
    // JSON
    // =========================================================================

    /// Parse JSON text and pretty-print it with two-space indentation.
    ///
    /// Object key order is kept as written.
    pub fn pretty_json(text: &str) -> Result<String, KeyscopeError> {
        let value = Self::parse_json(text)?;
        serde_json::to_string_pretty(&value)
            .map_err(|e| KeyscopeError::SerializationError(e.to_string()))
    }

    /// Parse JSON text, replacing unsafe integers with decimal strings.
    pub fn parse_json(text: &str) -> Result<Value, KeyscopeError> {
        let value: Value = serde_json::from_str(text.trim())
            .map_err(|e| KeyscopeError::InvalidJson(e.to_string()))?;
        Ok(safe_integers(value))
    }
}

/// Replace integers outside `±MAX_SAFE_INTEGER` with their decimal string.
///
/// Floating point numbers are left alone.
pub fn safe_integers(value: Value) -> Value {
    match value {
        Value::Number(n) => {
            let digits = n.to_string();
            let is_integer = !digits.contains(['.', 'e', 'E']);
            let is_safe = n
                .as_i64()
                .is_some_and(|i| (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&i));
            if is_integer && !is_safe {
                Value::String(digits)
            } else {
                Value::Number(n)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(safe_integers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, safe_integers(value)))
                .collect(),
        ),
        other => other,
    }
}

/// Pretty-print text that looks like a JSON object or array and parses;
/// return anything else unchanged.
#[must_use]
pub fn format_for_edit(text: &str) -> String {
    if !is_likely_json(text) {
        return text.to_string();
    }
    ValueCodec::pretty_json(text).unwrap_or_else(|_| text.to_string())
}

fn strip_ascii_whitespace(input: &[u8]) -> Cow<'_, [u8]> {
    if input.iter().any(u8::is_ascii_whitespace) {
        Cow::Owned(
            input
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect(),
        )
    } else {
        Cow::Borrowed(input)
    }
}

/// Hex digits may be separated by whitespace. Non-hex input is returned
/// unchanged; an odd digit count is an error.
fn decode_hex(input: &[u8]) -> Result<Vec<u8>, KeyscopeError> {
    let Ok(text) = std::str::from_utf8(input) else {
        return Ok(input.to_vec());
    };
    let cleaned: String = text.chars().filter(|c| !is_separator(*c)).collect();
    if !cleaned.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Ok(input.to_vec());
    }
    if cleaned.len() % 2 != 0 {
        return Err(KeyscopeError::OddLengthHex(cleaned.len()));
    }
    hex::decode(&cleaned).map_err(|e| KeyscopeError::SerializationError(e.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================
