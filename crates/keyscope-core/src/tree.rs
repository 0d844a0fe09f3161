//! # Materialized Tree
//!
//! The acyclic, JSON-safe output of the materializer.
//!
//! No node refers to another by identity, so every tree is finite by
//! construction. Serializing a tree with serde yields the tagged form
//! (`{"node":"leaf","kind":"bigint","value":"..."}`); [`MaterializedNode::to_plain_json`]
//! yields the untagged display form used by viewers.

use crate::classifier::TypeCode;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};

// =============================================================================
// LEAVES
// =============================================================================

/// A scalar that survives a JSON-only transport unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum Leaf {
    #[serde(rename = "string")]
    String(String),
    #[serde(rename = "number")]
    Number(serde_json::Number),
    #[serde(rename = "boolean")]
    Boolean(bool),
    #[serde(rename = "null")]
    Null,
    /// 64-bit or wider integer as decimal digits.
    #[serde(rename = "bigint")]
    BigInt(String),
    /// ISO-8601 timestamp in UTC.
    #[serde(rename = "date")]
    Date(String),
    /// Byte buffer as unsigned byte values.
    #[serde(rename = "byteSequence")]
    Bytes(Vec<u8>),
}

// =============================================================================
// ORDERED CHILDREN
// =============================================================================

/// Name-to-node mapping that keeps insertion order.
///
/// Re-inserting a name replaces the value in its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Children(Vec<(String, MaterializedNode)>);

impl Children {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `name`.
    pub fn insert(&mut self, name: impl Into<String>, node: MaterializedNode) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = node,
            None => self.0.push((name, node)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MaterializedNode> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, node)| node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MaterializedNode)> {
        self.0.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Children {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, node) in &self.0 {
            map.serialize_entry(name, node)?;
        }
        map.end()
    }
}

// =============================================================================
// COMPOSITES
// =============================================================================

/// Declared shape of one field of a class instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    pub type_code: TypeCode,
    pub type_name: String,
}

/// A materialized class instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Composite {
    pub class_name: String,
    /// Always decimal text, whatever the original width.
    pub version_id: String,
    /// Field descriptors in declared order.
    pub fields: Vec<FieldDescriptor>,
    pub children: Children,
    pub annotations: Vec<MaterializedNode>,
}

// =============================================================================
// NODES
// =============================================================================

/// One node of a materialized tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "camelCase")]
pub enum MaterializedNode {
    Leaf(Leaf),
    Composite(Composite),
    Sequence { children: Vec<MaterializedNode> },
    Mapping { children: Children },
    Truncated { reason: String },
}

impl MaterializedNode {
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::Leaf(Leaf::String(s.into()))
    }

    #[must_use]
    pub fn number(n: impl Into<serde_json::Number>) -> Self {
        Self::Leaf(Leaf::Number(n.into()))
    }

    #[must_use]
    pub fn truncated(reason: impl Into<String>) -> Self {
        Self::Truncated {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }

    /// Child of a composite or mapping by name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&MaterializedNode> {
        match self {
            Self::Composite(composite) => composite.children.get(name),
            Self::Mapping { children } => children.get(name),
            Self::Leaf(_) | Self::Sequence { .. } | Self::Truncated { .. } => None,
        }
    }

    /// Number of nodes in the tree, this one included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + match self {
            Self::Leaf(_) | Self::Truncated { .. } => 0,
            Self::Composite(composite) => {
                composite.children.iter().map(|(_, n)| n.node_count()).sum::<usize>()
                    + composite.annotations.iter().map(Self::node_count).sum::<usize>()
            }
            Self::Sequence { children } => children.iter().map(Self::node_count).sum(),
            Self::Mapping { children } => children.iter().map(|(_, n)| n.node_count()).sum(),
        }
    }

    /// Longest root-to-leaf path, counting the root as depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let below = match self {
            Self::Leaf(_) | Self::Truncated { .. } => None,
            Self::Composite(composite) => composite
                .children
                .iter()
                .map(|(_, n)| n.depth())
                .chain(composite.annotations.iter().map(Self::depth))
                .max(),
            Self::Sequence { children } => children.iter().map(Self::depth).max(),
            Self::Mapping { children } => children.iter().map(|(_, n)| n.depth()).max(),
        };
        below.map_or(0, |d| d + 1)
    }

    /// Untagged display form.
    ///
    /// Scalars become JSON scalars, wide integers and timestamps become
    /// `{"type": ..., "value": ...}`, byte buffers become number arrays,
    /// composites become `{className, serialVersionUid, fields, annotations, value}`
    /// and truncation becomes the marker string `<reason>`.
    #[must_use]
    pub fn to_plain_json(&self) -> Value {
        match self {
            Self::Leaf(leaf) => match leaf {
                Leaf::String(s) => Value::String(s.clone()),
                Leaf::Number(n) => Value::Number(n.clone()),
                Leaf::Boolean(b) => Value::Bool(*b),
                Leaf::Null => Value::Null,
                Leaf::BigInt(digits) => typed("bigint", digits),
                Leaf::Date(iso) => typed("date", iso),
                Leaf::Bytes(bytes) => Value::Array(bytes.iter().map(|&b| Value::from(b)).collect()),
            },
            Self::Composite(composite) => {
                let fields = composite
                    .fields
                    .iter()
                    .map(|field| {
                        let mut entry = Map::new();
                        entry.insert("name".into(), Value::String(field.name.clone()));
                        entry.insert("typeCode".into(), Value::String(field.type_code.to_string()));
                        entry.insert("typeName".into(), Value::String(field.type_name.clone()));
                        Value::Object(entry)
                    })
                    .collect();
                let mut object = Map::new();
                object.insert("className".into(), Value::String(composite.class_name.clone()));
                object.insert(
                    "serialVersionUid".into(),
                    Value::String(composite.version_id.clone()),
                );
                object.insert("fields".into(), Value::Array(fields));
                object.insert(
                    "annotations".into(),
                    Value::Array(composite.annotations.iter().map(Self::to_plain_json).collect()),
                );
                object.insert("value".into(), plain_children(&composite.children));
                Value::Object(object)
            }
            Self::Sequence { children } => {
                Value::Array(children.iter().map(Self::to_plain_json).collect())
            }
            Self::Mapping { children } => plain_children(children),
            Self::Truncated { reason } => Value::String(format!("<{reason}>")),
        }
    }
}

fn typed(kind: &str, value: &str) -> Value {
    let mut object = Map::new();
    object.insert("type".into(), Value::String(kind.to_string()));
    object.insert("value".into(), Value::String(value.to_string()));
    Value::Object(object)
}

fn plain_children(children: &Children) -> Value {
    Value::Object(
        children
            .iter()
            .map(|(name, node)| (name.to_string(), node.to_plain_json()))
            .collect(),
    )
}

// =============================================================================
// TESTS
// =============================================================================
