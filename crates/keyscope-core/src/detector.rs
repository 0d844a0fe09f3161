//! # Format Detector
//!
//! Classifies a raw value into one [`DetectedEncoding`] using ordered
//! heuristics. First match wins; an explicit override short-circuits all.
//!
//! 1. Object stream magic and length above the configured floor
//! 2. Bracketed text that parses as strict JSON
//! 3. A `%XX` escape anywhere in the text
//! 4. Only hex digits (whitespace ignored), non-empty, even count
//! 5. Only base64 alphabet characters, length a multiple of 4
//! 6. Anything else is `Raw`

use crate::DetectedEncoding;
use crate::config::DetectorConfig;
use crate::primitives::{BINARY_RATIO_PER_THOUSAND, BINARY_SAMPLE_CHARS, STREAM_MAGIC};

/// Ordered-heuristic encoding classifier.
#[derive(Debug, Clone, Default)]
pub struct FormatDetector {
    config: DetectorConfig,
}

impl FormatDetector {
    /// Create a detector with the given thresholds.
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use.
    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Classify `bytes`, honoring `override_encoding` when present.
    #[must_use]
    pub fn detect(
        &self,
        bytes: &[u8],
        override_encoding: Option<DetectedEncoding>,
    ) -> DetectedEncoding {
        if let Some(encoding) = override_encoding {
            return encoding;
        }
        let detected = self.classify(bytes);
        tracing::trace!(len = bytes.len(), encoding = %detected, "classified value");
        detected
    }

    fn classify(&self, bytes: &[u8]) -> DetectedEncoding {
        if self.is_object_stream(bytes) {
            return DetectedEncoding::ForeignObject;
        }
        match std::str::from_utf8(bytes) {
            Ok(text) => detect_text(text),
            Err(_) => DetectedEncoding::Raw,
        }
    }

    /// Magic probe: stream magic followed by enough bytes to be an object.
    #[must_use]
    pub fn is_object_stream(&self, bytes: &[u8]) -> bool {
        bytes.len() >= STREAM_MAGIC.len()
            && bytes[..STREAM_MAGIC.len()] == STREAM_MAGIC
            && bytes.len() > self.config.magic_min_length
    }
}

/// Text rules 2-6, in priority order.
#[must_use]
pub fn detect_text(text: &str) -> DetectedEncoding {
    let trimmed = text.trim();

    if is_likely_json(trimmed) && serde_json::from_str::<serde::de::IgnoredAny>(trimmed).is_ok() {
        return DetectedEncoding::Json;
    }
    if has_percent_escape(trimmed) {
        return DetectedEncoding::UrlEncoded;
    }
    if is_hex_text(trimmed) {
        return DetectedEncoding::Hex;
    }
    if is_base64_text(trimmed) {
        return DetectedEncoding::Base64;
    }
    DetectedEncoding::Raw
}

/// Bracket test only: `{...}` or `[...]` after trimming.
#[must_use]
pub fn is_likely_json(text: &str) -> bool {
    let trimmed = text.trim();
    (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
}

fn has_percent_escape(text: &str) -> bool {
    text.as_bytes()
        .windows(3)
        .any(|w| w[0] == b'%' && w[1].is_ascii_hexdigit() && w[2].is_ascii_hexdigit())
}

/// Characters skipped between hex digits, by detection and decoding alike.
pub(crate) fn is_separator(c: char) -> bool {
    c.is_whitespace()
}

fn is_hex_text(text: &str) -> bool {
    let mut digits = 0usize;
    for c in text.chars().filter(|c| !is_separator(*c)) {
        if !c.is_ascii_hexdigit() {
            return false;
        }
        digits += 1;
    }
    digits > 0 && digits % 2 == 0
}

fn is_base64_text(text: &str) -> bool {
    !text.is_empty()
        && text.len() % 4 == 0
        && text
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
}

/// True when more than a tenth of the sampled characters are control
/// characters other than newline, carriage return and tab.
#[must_use]
pub fn is_likely_binary(text: &str) -> bool {
    let total = text.chars().count();
    let control = text
        .chars()
        .take(BINARY_SAMPLE_CHARS)
        .filter(|&c| (c as u32) < 0x20 && !matches!(c, '\n' | '\r' | '\t'))
        .count();
    control * 1000 > total * BINARY_RATIO_PER_THOUSAND
}

/// True when any byte falls in `0x00..=0x08` or `0x0E..=0x1F`.
#[must_use]
pub fn has_binary_control_bytes(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .any(|&b| matches!(b, 0x00..=0x08 | 0x0E..=0x1F))
}

// =============================================================================
// TESTS
// =============================================================================
