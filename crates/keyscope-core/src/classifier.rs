//! # Field Type Classifier
//!
//! Computes a minimal type tag for a field value so a viewer can tell an
//! `int` field from a nested object without the original class metadata.

use crate::object_graph::{GraphNode, ObjectGraph, Scalar};
use serde::{Serialize, Serializer};
use std::fmt;

/// One-character type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeCode {
    /// Object reference (`L`), including strings and null.
    Reference,
    /// Integer (`I`).
    Integer,
    /// Floating point (`D`).
    Double,
    /// Boolean (`Z`).
    Boolean,
    /// 64-bit or arbitrary-precision integer (`J`).
    Long,
}

impl TypeCode {
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Reference => 'L',
            Self::Integer => 'I',
            Self::Double => 'D',
            Self::Boolean => 'Z',
            Self::Long => 'J',
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl Serialize for TypeCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.as_char())
    }
}

/// Type tag plus a human-readable type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldType {
    pub code: TypeCode,
    pub name: String,
}

impl FieldType {
    fn new(code: TypeCode, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
        }
    }

    fn reference(name: impl Into<String>) -> Self {
        Self::new(TypeCode::Reference, name)
    }
}

/// Name used when nothing more specific is known.
const OBJECT_TYPE_NAME: &str = "Object";

/// The FieldTypeClassifier tags field values.
pub struct FieldTypeClassifier;

impl FieldTypeClassifier {
    /// Classify a graph node. Back-references are classified by what they
    /// point at.
    #[must_use]
    pub fn classify(node: &GraphNode, graph: &ObjectGraph) -> FieldType {
        match node {
            GraphNode::Primitive(scalar) => Self::classify_scalar(scalar),
            GraphNode::ClassInstance(_)
            | GraphNode::Collection(_)
            | GraphNode::MapLike(_)
            | GraphNode::BackReference(_) => {
                FieldType::reference(Self::runtime_type_name(node, graph))
            }
        }
    }

    /// Classify a scalar.
    #[must_use]
    pub fn classify_scalar(scalar: &Scalar) -> FieldType {
        match scalar {
            Scalar::Int(_) => FieldType::new(TypeCode::Integer, "int"),
            Scalar::Double(d) if d.is_finite() && d.fract() == 0.0 => {
                FieldType::new(TypeCode::Integer, "int")
            }
            Scalar::Double(_) => FieldType::new(TypeCode::Double, "double"),
            Scalar::Bool(_) => FieldType::new(TypeCode::Boolean, "boolean"),
            Scalar::Long(_) | Scalar::BigInteger(_) => FieldType::new(TypeCode::Long, "long"),
            Scalar::String(_) => FieldType::reference("String"),
            Scalar::Timestamp(_) => FieldType::reference("Date"),
            Scalar::Bytes(_) => FieldType::reference("byte[]"),
            Scalar::Null => FieldType::reference(OBJECT_TYPE_NAME),
            Scalar::Opaque { type_name, .. } => FieldType::reference(non_empty(type_name)),
        }
    }

    /// Declared class name for instances, a runtime-inferred name otherwise.
    #[must_use]
    pub fn runtime_type_name(node: &GraphNode, graph: &ObjectGraph) -> String {
        let mut current = node;
        // A chain of handles can be no longer than the table.
        for _ in 0..=graph.handle_count() {
            match current {
                GraphNode::ClassInstance(instance) => {
                    return non_empty(&instance.class_name).to_string();
                }
                GraphNode::Collection(_) => return "Collection".to_string(),
                GraphNode::MapLike(_) => return "Map".to_string(),
                GraphNode::Primitive(scalar) => return Self::classify_scalar(scalar).name,
                GraphNode::BackReference(handle) => match graph.resolve(*handle) {
                    Some(target) => current = target,
                    None => break,
                },
            }
        }
        OBJECT_TYPE_NAME.to_string()
    }
}

fn non_empty(name: &str) -> &str {
    if name.trim().is_empty() {
        OBJECT_TYPE_NAME
    } else {
        name
    }
}

// =============================================================================
// TESTS
// =============================================================================
