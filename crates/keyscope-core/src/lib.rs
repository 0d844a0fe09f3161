//! # keyscope-core
//!
//! The value inspection engine for Keyscope - THE LOGIC.
//!
//! Given the raw bytes of a key-value store value, this crate:
//! - classifies the encoding without relying on metadata (`detector`)
//! - converts between stored bytes and display text (`codec`)
//! - turns an externally decoded object graph, possibly cyclic, into a
//!   bounded and JSON-safe tree (`materializer`, `classifier`, `tree`)
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is pure: no I/O, no async, no global state
//! - Never parses the object stream wire format itself; decoders plug in
//!   through [`GraphDecoder`]
//! - Never panics; heuristics degrade, only real decode failures are errors
//! - Bounds every recursion by an explicit depth and a per-call node budget

// =============================================================================
// MODULES
// =============================================================================

pub mod classifier;
pub mod codec;
pub mod config;
pub mod container;
pub mod detector;
pub mod inspector;
pub mod materializer;
pub mod object_graph;
pub mod primitives;
pub mod tree;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{ContainerKind, DetectedEncoding, Direction, GraphDecodeError, KeyscopeError, RawValue};

// =============================================================================
// RE-EXPORTS: Components
// =============================================================================

pub use classifier::{FieldType, FieldTypeClassifier, TypeCode};
pub use codec::{ValueCodec, format_for_edit};
pub use config::{DetectorConfig, InspectConfig, MaterializeOptions};
pub use container::{ContainerValue, ContainerView, MemberEncoding, ScoredMember, view_container};
pub use detector::{
    FormatDetector, detect_text, has_binary_control_bytes, is_likely_binary, is_likely_json,
};
pub use inspector::{Inspection, Inspector};
pub use materializer::GraphMaterializer;
pub use object_graph::{
    ClassInstance, DumpDecoder, GraphDecoder, GraphNode, Handle, JsonGraphDecoder,
    NoGraphDecoder, ObjectGraph, Scalar,
};
pub use tree::{Children, Composite, FieldDescriptor, Leaf, MaterializedNode};
