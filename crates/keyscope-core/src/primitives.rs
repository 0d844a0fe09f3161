//! # Innate Primitives
//!
//! Hardcoded constants for the Keyscope CORE.
//!
//! Thresholds that are heuristics rather than format facts (the object
//! stream length floor, the depth cap, the node budget) are only the
//! *defaults* of the configurable values in [`crate::config`].

/// Magic bytes opening every Java Object Serialization stream (`0xACED`).
pub const STREAM_MAGIC: [u8; 2] = [0xAC, 0xED];

/// Default minimum length (exclusive) for the object stream probe.
///
/// A value must be strictly longer than this to be classified as a
/// serialized object. Short values starting with the magic are left to the
/// text heuristics.
pub const DEFAULT_MAGIC_MIN_LENGTH: usize = 32;

/// Default maximum structural depth of a materialized tree.
///
/// At this depth the materializer emits a `Truncated` node instead of
/// recursing.
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Default number of nodes one materialization call may emit.
///
/// Shared references are expanded once per occurrence, so a small graph can
/// describe an exponentially large tree. The budget keeps output bounded.
pub const DEFAULT_MAX_NODES: usize = 100_000;

/// First handle assigned by an object stream writer.
pub const BASE_WIRE_HANDLE: u32 = 0x7E_0000;

/// Largest integer a JSON consumer using IEEE-754 doubles represents exactly
/// (2^53 - 1).
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Number of leading characters sampled by the binary text heuristic.
pub const BINARY_SAMPLE_CHARS: usize = 1000;

/// Control character ratio (per thousand) above which text is "likely binary".
pub const BINARY_RATIO_PER_THOUSAND: usize = 100;

/// Version id rendered for class instances that carry none.
pub const UNKNOWN_VERSION_ID: &str = "unknown";
