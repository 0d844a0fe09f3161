//! # Graph Materializer
//!
//! Converts a decoded [`ObjectGraph`] into a [`MaterializedNode`] tree.
//!
//! - Back-references are resolved through the handle table and expanded by
//!   value at every occurrence. Sharing is not preserved; the output is a tree.
//! - Depth is passed down the recursion explicitly. Following a reference
//!   costs one level like any other edge, so reference cycles hit the cap.
//! - At `max_depth` a `Truncated` node is emitted instead of recursing.
//! - A per-call node budget bounds the exponential growth of graphs that
//!   reference the same object many times.
//! - Malformed shapes degrade to a generic `Mapping` of what is visible;
//!   nothing here fails.

use crate::classifier::FieldTypeClassifier;
use crate::config::MaterializeOptions;
use crate::object_graph::{ClassInstance, GraphNode, ObjectGraph, Scalar};
use crate::primitives::UNKNOWN_VERSION_ID;
use crate::tree::{Children, Composite, FieldDescriptor, Leaf, MaterializedNode};
use chrono::{DateTime, SecondsFormat, Utc};

/// The GraphMaterializer turns object graphs into bounded trees.
///
/// It holds only its options, so one instance can serve any number of
/// concurrent calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphMaterializer {
    options: MaterializeOptions,
}

impl GraphMaterializer {
    #[must_use]
    pub fn new(options: MaterializeOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> MaterializeOptions {
        self.options
    }

    /// Materialize the whole graph from its root.
    #[must_use]
    pub fn materialize_graph(&self, graph: &ObjectGraph) -> MaterializedNode {
        self.materialize(graph, graph.root(), 0)
    }

    /// Materialize `node` as if it sat at `depth` in the output.
    ///
    /// Pure: the same graph, node and depth always give the same tree.
    #[must_use]
    pub fn materialize(
        &self,
        graph: &ObjectGraph,
        node: &GraphNode,
        depth: usize,
    ) -> MaterializedNode {
        let mut walk = Walk {
            graph,
            options: self.options,
            emitted: 0,
        };
        let tree = walk.node(node, depth);
        tracing::debug!(
            emitted = walk.emitted,
            handles = graph.handle_count(),
            "materialized object graph"
        );
        tree
    }
}

// =============================================================================
// WALK
// =============================================================================

/// State of one materialization call. Never shared between calls.
struct Walk<'g> {
    graph: &'g ObjectGraph,
    options: MaterializeOptions,
    emitted: usize,
}

impl Walk<'_> {
    fn depth_stop(&self, depth: usize) -> Option<MaterializedNode> {
        (depth >= self.options.max_depth).then(|| {
            MaterializedNode::truncated(format!("max depth reached: {}", self.options.max_depth))
        })
    }

    /// Depth and budget gate. Returns the node to emit when recursion stops.
    fn enter(&mut self, depth: usize) -> Option<MaterializedNode> {
        if let Some(stop) = self.depth_stop(depth) {
            return Some(stop);
        }
        if self.emitted >= self.options.max_nodes {
            tracing::debug!(max_nodes = self.options.max_nodes, "node budget exhausted");
            return Some(MaterializedNode::truncated(format!(
                "node budget exhausted: {}",
                self.options.max_nodes
            )));
        }
        self.emitted += 1;
        None
    }

    fn node(&mut self, node: &GraphNode, depth: usize) -> MaterializedNode {
        if let GraphNode::BackReference(handle) = node {
            // Hops are not emitted, so only the depth cap applies here.
            if let Some(stop) = self.depth_stop(depth) {
                return stop;
            }
            return match self.graph.resolve(*handle) {
                Some(target) => self.node(target, depth + 1),
                None => {
                    tracing::debug!(%handle, "dangling back-reference");
                    if let Some(stop) = self.enter(depth) {
                        return stop;
                    }
                    MaterializedNode::truncated(format!("unresolved back-reference: {handle}"))
                }
            };
        }
        if let Some(stop) = self.enter(depth) {
            return stop;
        }
        match node {
            GraphNode::Primitive(scalar) => self.scalar(scalar, depth),
            GraphNode::ClassInstance(instance) => self.instance(instance, depth),
            GraphNode::Collection(items) => MaterializedNode::Sequence {
                children: items.iter().map(|item| self.node(item, depth + 1)).collect(),
            },
            GraphNode::MapLike(entries) => {
                let mut children = Children::new();
                for (key, value) in entries {
                    let name = self.key_string(key);
                    children.insert(name, self.node(value, depth + 1));
                }
                MaterializedNode::Mapping { children }
            }
            // Resolved above.
            GraphNode::BackReference(handle) => {
                MaterializedNode::truncated(format!("unresolved back-reference: {handle}"))
            }
        }
    }

    fn instance(&mut self, instance: &ClassInstance, depth: usize) -> MaterializedNode {
        if instance.class_name.trim().is_empty() {
            tracing::debug!(fields = instance.fields.len(), "class instance without a name");
            let mut children = Children::new();
            for (name, value) in &instance.fields {
                children.insert(name.clone(), self.node(value, depth + 1));
            }
            return MaterializedNode::Mapping { children };
        }

        let mut fields: Vec<FieldDescriptor> = Vec::with_capacity(instance.fields.len());
        let mut children = Children::new();
        for (name, value) in &instance.fields {
            let field_type = FieldTypeClassifier::classify(value, self.graph);
            let descriptor = FieldDescriptor {
                name: name.clone(),
                type_code: field_type.code,
                type_name: field_type.name,
            };
            // A shadowed field keeps its first position, like its value.
            match fields.iter_mut().find(|existing| existing.name == *name) {
                Some(slot) => *slot = descriptor,
                None => fields.push(descriptor),
            }
            children.insert(name.clone(), self.node(value, depth + 1));
        }

        let annotations = instance
            .annotations
            .iter()
            .map(|annotation| self.node(annotation, depth + 1))
            .collect();

        MaterializedNode::Composite(Composite {
            class_name: instance.class_name.clone(),
            version_id: instance
                .version_id
                .map(|v| v.to_string())
                .unwrap_or_else(|| UNKNOWN_VERSION_ID.to_string()),
            fields,
            children,
            annotations,
        })
    }

    fn scalar(&mut self, scalar: &Scalar, depth: usize) -> MaterializedNode {
        let leaf = match scalar {
            Scalar::Null => Leaf::Null,
            Scalar::Bool(b) => Leaf::Boolean(*b),
            Scalar::Int(i) => Leaf::Number((*i).into()),
            Scalar::Long(i) => Leaf::BigInt(i.to_string()),
            Scalar::BigInteger(digits) => match normalize_digits(digits) {
                Some(normalized) => Leaf::BigInt(normalized),
                None => {
                    tracing::debug!(%digits, "malformed big integer");
                    return fallback("BigInteger", vec![("value", Leaf::String(digits.clone()))]);
                }
            },
            Scalar::Double(d) => match serde_json::Number::from_f64(*d) {
                Some(n) => Leaf::Number(n),
                None => Leaf::String(d.to_string()),
            },
            Scalar::String(s) => Leaf::String(s.clone()),
            Scalar::Timestamp(millis) => match iso_timestamp(*millis) {
                Some(iso) => Leaf::Date(iso),
                None => {
                    tracing::debug!(millis, "timestamp out of range");
                    return fallback("Date", vec![("epochMillis", Leaf::BigInt(millis.to_string()))]);
                }
            },
            Scalar::Bytes(bytes) => Leaf::Bytes(bytes.clone()),
            Scalar::Opaque { properties, .. } => {
                let mut children = Children::new();
                for (name, value) in properties {
                    let child = match self.enter(depth + 1) {
                        Some(stop) => stop,
                        None => self.scalar(value, depth + 1),
                    };
                    children.insert(name.clone(), child);
                }
                return MaterializedNode::Mapping { children };
            }
        };
        MaterializedNode::Leaf(leaf)
    }

    /// String form of a map key. Keys that stringify alike collide and the
    /// later entry wins.
    fn key_string(&self, key: &GraphNode) -> String {
        let mut current = key;
        for _ in 0..=self.graph.handle_count() {
            match current {
                GraphNode::Primitive(scalar) => return scalar_key(scalar),
                GraphNode::ClassInstance(_) | GraphNode::MapLike(_) => {
                    return FieldTypeClassifier::runtime_type_name(current, self.graph);
                }
                GraphNode::Collection(items) => {
                    return items
                        .iter()
                        .map(|item| match item {
                            GraphNode::Primitive(scalar) => scalar_key(scalar),
                            other => FieldTypeClassifier::runtime_type_name(other, self.graph),
                        })
                        .collect::<Vec<_>>()
                        .join(",");
                }
                GraphNode::BackReference(handle) => match self.graph.resolve(*handle) {
                    Some(target) => current = target,
                    None => break,
                },
            }
        }
        "Object".to_string()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Mapping built from visible properties of a value that could not be
/// rendered as its own kind.
fn fallback(type_name: &str, properties: Vec<(&str, Leaf)>) -> MaterializedNode {
    let mut children = Children::new();
    children.insert("type", MaterializedNode::string(type_name));
    for (name, leaf) in properties {
        children.insert(name, MaterializedNode::Leaf(leaf));
    }
    MaterializedNode::Mapping { children }
}

fn scalar_key(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Null => "null".to_string(),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Long(i) => i.to_string(),
        Scalar::BigInteger(digits) => digits.clone(),
        Scalar::Double(d) => d.to_string(),
        Scalar::String(s) => s.clone(),
        Scalar::Timestamp(millis) => iso_timestamp(*millis).unwrap_or_else(|| millis.to_string()),
        Scalar::Bytes(bytes) => bytes
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(","),
        Scalar::Opaque { type_name, .. } => type_name.clone(),
    }
}

/// Millisecond-precision UTC ISO-8601, e.g. `2024-02-29T12:00:00.000Z`.
fn iso_timestamp(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Accepts an optional sign followed by decimal digits. Drops a leading `+`
/// and redundant leading zeros.
fn normalize_digits(text: &str) -> Option<String> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Some("0".to_string());
    }
    Some(if negative {
        format!("-{significant}")
    } else {
        significant.to_string()
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_graph::Handle;

    fn materialize(graph: &ObjectGraph) -> MaterializedNode {
        GraphMaterializer::default().materialize_graph(graph)
    }

    fn leaf(node: &MaterializedNode) -> &Leaf {
        match node {
            MaterializedNode::Leaf(leaf) => leaf,
            other => unreachable!("expected leaf, got {other:?}"),
        }
    }

    #[test]
    fn primitive_leaves() {
        let graph = ObjectGraph::new(GraphNode::Collection(vec![
            GraphNode::int(5),
            GraphNode::string("s"),
            GraphNode::boolean(true),
            GraphNode::null(),
            GraphNode::Primitive(Scalar::Double(1.5)),
        ]));
        let MaterializedNode::Sequence { children } = materialize(&graph) else {
            unreachable!("collection materializes to a sequence");
        };
        assert_eq!(leaf(&children[0]), &Leaf::Number(5.into()));
        assert_eq!(leaf(&children[1]), &Leaf::String("s".into()));
        assert_eq!(leaf(&children[2]), &Leaf::Boolean(true));
        assert_eq!(leaf(&children[3]), &Leaf::Null);
        assert!(matches!(leaf(&children[4]), Leaf::Number(_)));
    }

    #[test]
    fn long_becomes_bigint_string() {
        let graph = ObjectGraph::new(GraphNode::long(i64::MAX));
        assert_eq!(
            leaf(&materialize(&graph)),
            &Leaf::BigInt("9223372036854775807".into())
        );
    }

    #[test]
    fn big_integer_is_normalized() {
        let graph = ObjectGraph::new(GraphNode::Primitive(Scalar::BigInteger(
            "+000123456789012345678901234567890".into(),
        )));
        assert_eq!(
            leaf(&materialize(&graph)),
            &Leaf::BigInt("123456789012345678901234567890".into())
        );
    }

    #[test]
    fn malformed_big_integer_degrades_to_mapping() {
        let graph = ObjectGraph::new(GraphNode::Primitive(Scalar::BigInteger("12ab".into())));
        let tree = materialize(&graph);
        assert!(matches!(tree, MaterializedNode::Mapping { .. }));
        assert_eq!(tree.child("value"), Some(&MaterializedNode::string("12ab")));
    }

    #[test]
    fn timestamp_becomes_iso_date() {
        let graph = ObjectGraph::new(GraphNode::Primitive(Scalar::Timestamp(1_709_208_000_000)));
        assert_eq!(
            leaf(&materialize(&graph)),
            &Leaf::Date("2024-02-29T12:00:00.000Z".into())
        );
    }

    #[test]
    fn non_finite_double_becomes_string() {
        let graph = ObjectGraph::new(GraphNode::Primitive(Scalar::Double(f64::NAN)));
        assert_eq!(leaf(&materialize(&graph)), &Leaf::String("NaN".into()));
    }

    #[test]
    fn bytes_become_byte_sequence() {
        let graph = ObjectGraph::new(GraphNode::bytes(vec![0u8, 127, 128, 255]));
        assert_eq!(
            leaf(&materialize(&graph)),
            &Leaf::Bytes(vec![0, 127, 128, 255])
        );
    }

    #[test]
    fn instance_keeps_declared_field_order() {
        let instance = ClassInstance::new("Order")
            .with_version(-7_654_321_234_567_890)
            .with_field("zeta", GraphNode::int(1))
            .with_field("alpha", GraphNode::string("a"))
            .with_field("mid", GraphNode::long(2));
        let tree = materialize(&ObjectGraph::new(instance.into()));
        let MaterializedNode::Composite(composite) = tree else {
            unreachable!("instance materializes to a composite");
        };
        assert_eq!(composite.class_name, "Order");
        assert_eq!(composite.version_id, "-7654321234567890");
        let names: Vec<_> = composite.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(
            composite.children.names().collect::<Vec<_>>(),
            vec!["zeta", "alpha", "mid"]
        );
        let codes: Vec<_> = composite.fields.iter().map(|f| f.type_code.as_char()).collect();
        assert_eq!(codes, vec!['I', 'L', 'J']);
    }

    #[test]
    fn missing_version_id_is_unknown() {
        let tree = materialize(&ObjectGraph::new(ClassInstance::new("Foo").into()));
        let MaterializedNode::Composite(composite) = tree else {
            unreachable!("instance materializes to a composite");
        };
        assert_eq!(composite.version_id, "unknown");
    }

    #[test]
    fn shadowed_field_keeps_one_descriptor() {
        let instance = ClassInstance::new("Child")
            .with_field("x", GraphNode::int(1))
            .with_field("y", GraphNode::int(2))
            .with_field("x", GraphNode::string("child"));
        let MaterializedNode::Composite(composite) =
            materialize(&ObjectGraph::new(instance.into()))
        else {
            unreachable!("instance materializes to a composite");
        };
        assert_eq!(composite.fields.len(), 2);
        assert_eq!(composite.fields[0].type_name, "String");
        assert_eq!(composite.children.get("x"), Some(&MaterializedNode::string("child")));
    }

    #[test]
    fn annotations_are_materialized() {
        let instance = ClassInstance::new("java.util.ArrayList")
            .with_field("size", GraphNode::int(1))
            .with_annotation(GraphNode::string("element"));
        let MaterializedNode::Composite(composite) =
            materialize(&ObjectGraph::new(instance.into()))
        else {
            unreachable!("instance materializes to a composite");
        };
        assert_eq!(composite.annotations, vec![MaterializedNode::string("element")]);
    }

    #[test]
    fn nameless_instance_degrades_to_mapping() {
        let instance = ClassInstance::new("  ").with_field("a", GraphNode::int(1));
        let tree = materialize(&ObjectGraph::new(instance.into()));
        assert!(matches!(tree, MaterializedNode::Mapping { .. }));
        assert_eq!(tree.child("a"), Some(&MaterializedNode::number(1)));
    }

    #[test]
    fn map_keys_are_stringified() {
        let graph = ObjectGraph::new(GraphNode::MapLike(vec![
            (GraphNode::int(1), GraphNode::string("one")),
            (GraphNode::boolean(false), GraphNode::string("no")),
            (GraphNode::string("k"), GraphNode::null()),
            (
                GraphNode::Collection(vec![GraphNode::int(1), GraphNode::int(2)]),
                GraphNode::null(),
            ),
        ]));
        let MaterializedNode::Mapping { children } = materialize(&graph) else {
            unreachable!("map materializes to a mapping");
        };
        assert_eq!(children.names().collect::<Vec<_>>(), vec!["1", "false", "k", "1,2"]);
    }

    #[test]
    fn colliding_keys_keep_last_value() {
        let graph = ObjectGraph::new(GraphNode::MapLike(vec![
            (GraphNode::int(1), GraphNode::string("int")),
            (GraphNode::string("1"), GraphNode::string("string")),
        ]));
        let tree = materialize(&graph);
        assert_eq!(tree.child("1"), Some(&MaterializedNode::string("string")));
    }

    #[test]
    fn back_reference_is_inlined() {
        let shared = ClassInstance::new("Shared").with_field("v", GraphNode::int(9));
        let graph = ObjectGraph::new(GraphNode::Collection(vec![
            shared.clone().into(),
            GraphNode::reference(Handle::BASE),
        ]))
        .with_handle(Handle::BASE, shared);
        let MaterializedNode::Sequence { children } = materialize(&graph) else {
            unreachable!("collection materializes to a sequence");
        };
        assert_eq!(children[0], children[1]);
    }

    #[test]
    fn self_reference_is_truncated_at_cap() {
        let foo = ClassInstance::new("Foo")
            .with_field("x", GraphNode::int(5))
            .with_field("self", GraphNode::reference(Handle(1)));
        let graph = ObjectGraph::new(foo.clone().into()).with_handle(Handle(1), foo);
        let tree = GraphMaterializer::new(MaterializeOptions::with_max_depth(10))
            .materialize_graph(&graph);

        assert_eq!(tree.child("x"), Some(&MaterializedNode::number(5)));
        let mut current = &tree;
        let mut hops = 0;
        while let Some(next) = current.child("self") {
            current = next;
            hops += 1;
        }
        assert_eq!(
            current,
            &MaterializedNode::truncated("max depth reached: 10")
        );
        // Each hop costs a field edge and a reference edge.
        assert_eq!(hops, 5);
        assert!(tree.depth() <= 10);
    }

    #[test]
    fn reference_to_reference_cycle_terminates() {
        let graph = ObjectGraph::new(GraphNode::reference(Handle(1)))
            .with_handle(Handle(1), GraphNode::reference(Handle(2)))
            .with_handle(Handle(2), GraphNode::reference(Handle(1)));
        assert_eq!(
            materialize(&graph),
            MaterializedNode::truncated("max depth reached: 50")
        );
    }

    #[test]
    fn dangling_reference_is_truncated() {
        let graph = ObjectGraph::new(GraphNode::reference(Handle(0x7e_0005)));
        assert_eq!(
            materialize(&graph),
            MaterializedNode::truncated("unresolved back-reference: 0x7e0005")
        );
    }

    #[test]
    fn node_budget_bounds_shared_fan_out() {
        // Each level references the next one twice: 2^depth occurrences.
        let mut graph = ObjectGraph::new(GraphNode::reference(Handle(0)));
        for level in 0..40u32 {
            let next = GraphNode::reference(Handle(level + 1));
            graph.insert_handle(
                Handle(level),
                GraphNode::Collection(vec![next.clone(), next]),
            );
        }
        graph.insert_handle(Handle(40), GraphNode::int(0));
        let options = MaterializeOptions {
            max_depth: 200,
            max_nodes: 1_000,
        };
        let tree = GraphMaterializer::new(options).materialize_graph(&graph);
        assert!(tree.node_count() <= 3_000);
    }

    #[test]
    fn zero_depth_cap_truncates_root() {
        let tree = GraphMaterializer::new(MaterializeOptions::with_max_depth(0))
            .materialize_graph(&ObjectGraph::new(GraphNode::int(1)));
        assert!(tree.is_truncated());
    }

    #[test]
    fn opaque_value_becomes_mapping_of_properties() {
        let graph = ObjectGraph::new(GraphNode::Primitive(Scalar::Opaque {
            type_name: "Currency".into(),
            properties: vec![
                ("code".into(), Scalar::String("EUR".into())),
                ("digits".into(), Scalar::Int(2)),
            ],
        }));
        let tree = materialize(&graph);
        assert_eq!(tree.child("code"), Some(&MaterializedNode::string("EUR")));
        assert_eq!(tree.child("digits"), Some(&MaterializedNode::number(2)));
    }

    #[test]
    fn materialize_is_pure() {
        let foo = ClassInstance::new("Foo").with_field("me", GraphNode::reference(Handle(3)));
        let graph = ObjectGraph::new(foo.clone().into()).with_handle(Handle(3), foo);
        let materializer = GraphMaterializer::default();
        assert_eq!(
            materializer.materialize_graph(&graph),
            materializer.materialize_graph(&graph)
        );
    }

    #[test]
    fn digits_normalization() {
        assert_eq!(normalize_digits("-0042"), Some("-42".into()));
        assert_eq!(normalize_digits("000"), Some("0".into()));
        assert_eq!(normalize_digits("-"), None);
        assert_eq!(normalize_digits("1e5"), None);
    }
}
