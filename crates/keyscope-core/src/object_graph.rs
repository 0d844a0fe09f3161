//! # Object Graph Input Model
//!
//! The graph produced by an external object stream decoder.
//!
//! Identity sharing is expressed with explicit handles: the first occurrence
//! of a shared object is written inline and registered in the handle table,
//! later occurrences are `BackReference(handle)`. Nothing in this model points
//! at another node by reference, so cyclic streams are representable without
//! cyclic ownership.
//!
//! Parsing the wire format is out of scope. Decoders plug in through the
//! [`GraphDecoder`] trait.

use crate::GraphDecodeError;
use crate::primitives::BASE_WIRE_HANDLE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// HANDLES
// =============================================================================

/// Identifier of a previously written object in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle(pub u32);

impl Handle {
    /// First handle a stream writer assigns; later objects count up from it.
    pub const BASE: Self = Self(BASE_WIRE_HANDLE);
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

// =============================================================================
// NODES
// =============================================================================

/// Scalar payload of a `Primitive` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scalar {
    Null,
    Bool(bool),
    /// 32-bit or narrower integer.
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// Arbitrary-precision integer as decimal digits, optionally signed.
    BigInteger(String),
    Double(f64),
    String(String),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    /// Raw byte buffer.
    Bytes(Vec<u8>),
    /// A value the decoder could not map to a known kind, with whatever
    /// properties it could see.
    Opaque {
        type_name: String,
        properties: Vec<(String, Scalar)>,
    },
}

/// A serialized class instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInstance {
    pub class_name: String,
    /// Stream version id (serialVersionUID) when present.
    #[serde(default)]
    pub version_id: Option<i64>,
    /// Field values in declared order.
    #[serde(default)]
    pub fields: Vec<(String, GraphNode)>,
    /// Custom data written by the class's own write hook.
    #[serde(default)]
    pub annotations: Vec<GraphNode>,
}

impl ClassInstance {
    /// Create an instance with no fields.
    #[must_use]
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            version_id: None,
            fields: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Set the version id.
    #[must_use]
    pub fn with_version(mut self, version_id: i64) -> Self {
        self.version_id = Some(version_id);
        self
    }

    /// Append a field after the existing ones.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: GraphNode) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    /// Append an annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: GraphNode) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// One node of a decoded object graph.
///
/// Closed set: every consumer matches exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphNode {
    Primitive(Scalar),
    ClassInstance(ClassInstance),
    Collection(Vec<GraphNode>),
    MapLike(Vec<(GraphNode, GraphNode)>),
    BackReference(Handle),
}

impl GraphNode {
    #[must_use]
    pub fn null() -> Self {
        Self::Primitive(Scalar::Null)
    }

    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::Primitive(Scalar::String(s.into()))
    }

    #[must_use]
    pub fn int(i: i32) -> Self {
        Self::Primitive(Scalar::Int(i))
    }

    #[must_use]
    pub fn long(i: i64) -> Self {
        Self::Primitive(Scalar::Long(i))
    }

    #[must_use]
    pub fn boolean(b: bool) -> Self {
        Self::Primitive(Scalar::Bool(b))
    }

    #[must_use]
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Primitive(Scalar::Bytes(b.into()))
    }

    #[must_use]
    pub fn reference(handle: Handle) -> Self {
        Self::BackReference(handle)
    }
}

impl From<ClassInstance> for GraphNode {
    fn from(instance: ClassInstance) -> Self {
        Self::ClassInstance(instance)
    }
}

impl From<Scalar> for GraphNode {
    fn from(scalar: Scalar) -> Self {
        Self::Primitive(scalar)
    }
}

// =============================================================================
// GRAPH
// =============================================================================

/// A decoded graph: the root node plus the handle table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "GraphDump", into = "GraphDump")]
pub struct ObjectGraph {
    root: GraphNode,
    handles: BTreeMap<Handle, GraphNode>,
}

/// Wire shape of a graph dump. Handles are a list of pairs so that dumps do
/// not rely on integer map keys.
#[derive(Serialize, Deserialize)]
struct GraphDump {
    root: GraphNode,
    #[serde(default)]
    handles: Vec<(Handle, GraphNode)>,
}

impl From<GraphDump> for ObjectGraph {
    fn from(dump: GraphDump) -> Self {
        Self {
            root: dump.root,
            handles: dump.handles.into_iter().collect(),
        }
    }
}

impl From<ObjectGraph> for GraphDump {
    fn from(graph: ObjectGraph) -> Self {
        Self {
            root: graph.root,
            handles: graph.handles.into_iter().collect(),
        }
    }
}

impl ObjectGraph {
    /// Create a graph with an empty handle table.
    #[must_use]
    pub fn new(root: GraphNode) -> Self {
        Self {
            root,
            handles: BTreeMap::new(),
        }
    }

    /// Register a handle while building.
    #[must_use]
    pub fn with_handle(mut self, handle: Handle, node: impl Into<GraphNode>) -> Self {
        self.handles.insert(handle, node.into());
        self
    }

    /// Register a handle, returning the node it replaced.
    pub fn insert_handle(&mut self, handle: Handle, node: GraphNode) -> Option<GraphNode> {
        self.handles.insert(handle, node)
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> &GraphNode {
        &self.root
    }

    /// Look up the node registered under `handle`.
    #[must_use]
    pub fn resolve(&self, handle: Handle) -> Option<&GraphNode> {
        self.handles.get(&handle)
    }

    /// Number of registered handles.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }
}

// =============================================================================
// DECODER SEAM
// =============================================================================

/// External object stream decoder.
///
/// Implementors parse the wire format and hand back a graph. A failure here
/// is the one error the pipeline surfaces instead of degrading.
///
/// Decoders must be `Send + Sync` so independent values can be inspected
/// concurrently.
pub trait GraphDecoder: Send + Sync {
    /// Parse `bytes` into an object graph.
    fn decode(&self, bytes: &[u8]) -> Result<ObjectGraph, GraphDecodeError>;
}

/// Decodes graph dumps written as JSON by an out-of-process parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonGraphDecoder;

impl GraphDecoder for JsonGraphDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<ObjectGraph, GraphDecodeError> {
        serde_json::from_slice(bytes).map_err(|e| GraphDecodeError::new(e.to_string()))
    }
}

/// Serves one pre-loaded graph regardless of the bytes it is given.
///
/// Used when the graph for a value was dumped ahead of time.
#[derive(Debug, Clone)]
pub struct DumpDecoder {
    graph: ObjectGraph,
}

impl DumpDecoder {
    #[must_use]
    pub fn new(graph: ObjectGraph) -> Self {
        Self { graph }
    }
}

impl GraphDecoder for DumpDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<ObjectGraph, GraphDecodeError> {
        Ok(self.graph.clone())
    }
}

/// Decoder for deployments without an object stream parser. Always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGraphDecoder;

impl GraphDecoder for NoGraphDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<ObjectGraph, GraphDecodeError> {
        Err(GraphDecodeError::new("no object stream decoder configured"))
    }
}

// =============================================================================
// TESTS
// =============================================================================
