//! # Inspector Pipeline
//!
//! Wires the components together for one stored value:
//!
//! ```text
//! RawValue ──► FormatDetector ──► ForeignObject? ──yes──► GraphDecoder ──► GraphMaterializer
//!                                      │                                        │
//!                                      no                                       ▼
//!                                      └────────► ValueCodec ──────────► Inspection
//! ```
//!
//! Only two failures reach the caller: a fatal codec error (odd-length hex,
//! invalid JSON under an explicit override) and an object stream the external
//! decoder could not parse.

use crate::codec::ValueCodec;
use crate::config::InspectConfig;
use crate::detector::{FormatDetector, is_likely_binary};
use crate::materializer::GraphMaterializer;
use crate::object_graph::{GraphDecoder, NoGraphDecoder};
use crate::tree::MaterializedNode;
use crate::{ContainerKind, DetectedEncoding, KeyscopeError, RawValue};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

/// Result of inspecting one value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inspection {
    pub kind: ContainerKind,
    pub encoding: DetectedEncoding,
    /// Text for the display layer. For object streams, the plain JSON form of
    /// the materialized tree.
    pub display: String,
    /// The value is binary: either not UTF-8 (and shown as base64) or text
    /// dominated by control characters.
    pub binary: bool,
    /// Materialized tree for object streams.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<MaterializedNode>,
}

/// Detect, decode and materialize stored values.
///
/// Holds no per-call state; share one instance across threads freely.
#[derive(Debug, Clone)]
pub struct Inspector<D = NoGraphDecoder> {
    detector: FormatDetector,
    materializer: GraphMaterializer,
    decoder: D,
}

impl Inspector<NoGraphDecoder> {
    /// Inspector without an object stream decoder.
    #[must_use]
    pub fn new(config: &InspectConfig) -> Self {
        Self::with_decoder(config, NoGraphDecoder)
    }
}

impl Default for Inspector<NoGraphDecoder> {
    fn default() -> Self {
        Self::new(&InspectConfig::default())
    }
}

impl<D: GraphDecoder> Inspector<D> {
    /// Inspector delegating object streams to `decoder`.
    #[must_use]
    pub fn with_decoder(config: &InspectConfig, decoder: D) -> Self {
        Self {
            detector: FormatDetector::new(config.detector.clone()),
            materializer: GraphMaterializer::new(config.materializer),
            decoder,
        }
    }

    #[must_use]
    pub fn detector(&self) -> &FormatDetector {
        &self.detector
    }

    #[must_use]
    pub fn materializer(&self) -> &GraphMaterializer {
        &self.materializer
    }

    /// Inspect a stored value, honoring an explicit encoding override.
    pub fn inspect(
        &self,
        raw: &RawValue,
        override_encoding: Option<DetectedEncoding>,
    ) -> Result<Inspection, KeyscopeError> {
        let encoding = self.detector.detect(&raw.bytes, override_encoding);
        tracing::debug!(
            kind = %raw.kind,
            len = raw.bytes.len(),
            %encoding,
            overridden = override_encoding.is_some(),
            "inspecting value"
        );

        if encoding == DetectedEncoding::ForeignObject {
            return self.inspect_object_stream(raw);
        }

        if encoding == DetectedEncoding::Raw && raw.text().is_none() {
            return Ok(Inspection {
                kind: raw.kind,
                encoding,
                display: STANDARD.encode(&raw.bytes),
                binary: true,
                tree: None,
            });
        }

        let display = ValueCodec::decode(&raw.bytes, encoding)?;
        let binary = encoding == DetectedEncoding::Raw && is_likely_binary(&display);
        Ok(Inspection {
            kind: raw.kind,
            encoding,
            display,
            binary,
            tree: None,
        })
    }

    fn inspect_object_stream(&self, raw: &RawValue) -> Result<Inspection, KeyscopeError> {
        let graph = self.decoder.decode(&raw.bytes).inspect_err(|e| {
            tracing::warn!(error = %e, len = raw.bytes.len(), "object stream decode failed");
        })?;
        let tree = self.materializer.materialize_graph(&graph);
        let display = serde_json::to_string_pretty(&tree.to_plain_json())
            .map_err(|e| KeyscopeError::SerializationError(e.to_string()))?;
        Ok(Inspection {
            kind: raw.kind,
            encoding: DetectedEncoding::ForeignObject,
            display,
            binary: true,
            tree: Some(tree),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
