//! # Validation Tier Tests (T0-T4)
//!
//! If ANY tier fails, the inspector is INVALID.
//!
//! ## Tiers
//! - T0: Detection
//! - T1: Codec
//! - T2: Field Classification
//! - T3: Materialization
//! - T4: Inspection Pipeline

use keyscope_core::{
    ClassInstance, DetectedEncoding, FormatDetector, GraphMaterializer, GraphNode, Handle,
    KeyscopeError, MaterializeOptions, MaterializedNode, ObjectGraph, RawValue, Scalar,
    ValueCodec,
};

fn stream_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0xAC, 0xED, 0x00, 0x05];
    bytes.resize(len, 0x73);
    bytes
}

// =============================================================================
// TIER T0: DETECTION
// =============================================================================

mod t0_detection {
    use super::*;

    /// T0.1: Plain words are raw text.
    #[test]
    fn plain_text_is_raw() {
        assert_eq!(
            FormatDetector::default().detect(b"hello", None),
            DetectedEncoding::Raw
        );
    }

    /// T0.2: A parseable object is JSON.
    #[test]
    fn object_is_json() {
        assert_eq!(
            FormatDetector::default().detect(br#"{"a":1}"#, None),
            DetectedEncoding::Json
        );
    }

    /// T0.3: Brackets alone are not enough.
    #[test]
    fn unparseable_brackets_are_not_json() {
        assert_ne!(
            FormatDetector::default().detect(b"{not json}", None),
            DetectedEncoding::Json
        );
    }

    /// T0.4: Magic needs more than the configured floor.
    #[test]
    fn magic_length_floor() {
        let detector = FormatDetector::default();
        assert_eq!(
            detector.detect(&stream_bytes(33), None),
            DetectedEncoding::ForeignObject
        );
        assert_ne!(
            detector.detect(&stream_bytes(32), None),
            DetectedEncoding::ForeignObject
        );
    }

    /// T0.5: Hex wins over base64 for even-length digit runs.
    #[test]
    fn hex_before_base64() {
        let detector = FormatDetector::default();
        assert_eq!(detector.detect(b"deadbeef", None), DetectedEncoding::Hex);
        assert_eq!(detector.detect(b"aGVsbG8=", None), DetectedEncoding::Base64);
    }

    /// T0.6: A single escape makes the value url-encoded.
    #[test]
    fn percent_escape_is_url() {
        assert_eq!(
            FormatDetector::default().detect(b"name=a%20b", None),
            DetectedEncoding::UrlEncoded
        );
    }

    /// T0.7: An override short-circuits every rule.
    #[test]
    fn override_wins() {
        assert_eq!(
            FormatDetector::default().detect(br#"{"a":1}"#, Some(DetectedEncoding::Raw)),
            DetectedEncoding::Raw
        );
    }

    /// T0.8: Empty input is raw.
    #[test]
    fn empty_is_raw() {
        assert_eq!(FormatDetector::default().detect(b"", None), DetectedEncoding::Raw);
    }
}

// =============================================================================
// TIER T1: CODEC
// =============================================================================

mod t1_codec {
    use super::*;

    /// T1.1: JSON decodes to two-space pretty text.
    #[test]
    fn json_pretty() {
        assert_eq!(
            ValueCodec::decode(br#"{"a":1}"#, DetectedEncoding::Json).expect("decode"),
            "{\n  \"a\": 1\n}"
        );
    }

    /// T1.2: Odd-length hex is the one fatal text decode.
    #[test]
    fn odd_hex_fails() {
        assert!(matches!(
            ValueCodec::decode(b"abc", DetectedEncoding::Hex),
            Err(KeyscopeError::OddLengthHex(3))
        ));
    }

    /// T1.3: Broken base64 comes back as written.
    #[test]
    fn broken_base64_passes_through() {
        assert_eq!(
            ValueCodec::decode(b"@@@@", DetectedEncoding::Base64).expect("decode"),
            "@@@@"
        );
    }

    /// T1.4: Hex text round-trips.
    #[test]
    fn hex_round_trip() {
        let stored = ValueCodec::encode("keyscope", DetectedEncoding::Hex).expect("encode");
        assert_eq!(stored, b"6b657973636f7065");
        assert_eq!(
            ValueCodec::decode(&stored, DetectedEncoding::Hex).expect("decode"),
            "keyscope"
        );
    }

    /// T1.5: Object streams have no text codec.
    #[test]
    fn object_stream_unsupported() {
        let err = ValueCodec::encode("x", DetectedEncoding::ForeignObject).expect_err("unsupported");
        assert_eq!(err.to_string(), "foreign-object values cannot be encoded as text");
    }
}

// =============================================================================
// TIER T2: FIELD CLASSIFICATION
// =============================================================================

mod t2_classification {
    use super::*;
    use keyscope_core::{FieldTypeClassifier, TypeCode};

    /// T2.1: Primitive codes.
    #[test]
    fn primitive_codes() {
        let cases = [
            (Scalar::Int(1), TypeCode::Integer, "int"),
            (Scalar::Double(2.5), TypeCode::Double, "double"),
            (Scalar::Bool(true), TypeCode::Boolean, "boolean"),
            (Scalar::Long(1), TypeCode::Long, "long"),
        ];
        for (scalar, code, name) in cases {
            let field = FieldTypeClassifier::classify_scalar(&scalar);
            assert_eq!(field.code, code);
            assert_eq!(field.name, name);
        }
    }

    /// T2.2: Integral doubles classify as int.
    #[test]
    fn integral_double_is_int() {
        let field = FieldTypeClassifier::classify_scalar(&Scalar::Double(3.0));
        assert_eq!(field.code, TypeCode::Integer);
    }

    /// T2.3: References carry their runtime type name.
    #[test]
    fn reference_names() {
        let graph = ObjectGraph::new(GraphNode::null())
            .with_handle(Handle(7), ClassInstance::new("com.acme.User"));
        let cases = [
            (GraphNode::string("s"), "String"),
            (GraphNode::Collection(vec![]), "Collection"),
            (GraphNode::MapLike(vec![]), "Map"),
            (GraphNode::reference(Handle(7)), "com.acme.User"),
            (GraphNode::reference(Handle(8)), "Object"),
        ];
        for (node, name) in cases {
            let field = FieldTypeClassifier::classify(&node, &graph);
            assert_eq!(field.code, TypeCode::Reference);
            assert_eq!(field.name, name);
        }
    }
}

// =============================================================================
// TIER T3: MATERIALIZATION
// =============================================================================

mod t3_materialization {
    use super::*;

    fn self_referencing_foo() -> ObjectGraph {
        let foo = ClassInstance::new("Foo")
            .with_version(1)
            .with_field("x", GraphNode::int(5))
            .with_field("self", GraphNode::reference(Handle::BASE));
        ObjectGraph::new(foo.clone().into()).with_handle(Handle::BASE, foo)
    }

    /// T3.1: A self-referencing instance terminates in a truncation marker.
    #[test]
    fn self_reference_terminates() {
        let tree = GraphMaterializer::default().materialize_graph(&self_referencing_foo());

        let mut current = &tree;
        while let Some(next) = current.child("self") {
            assert_eq!(current.child("x"), Some(&MaterializedNode::number(5)));
            current = next;
        }
        assert_eq!(current, &MaterializedNode::truncated("max depth reached: 50"));
    }

    /// T3.2: The depth cap bounds the output.
    #[test]
    fn depth_is_bounded() {
        for cap in [0, 1, 7, 20] {
            let tree = GraphMaterializer::new(MaterializeOptions::with_max_depth(cap))
                .materialize_graph(&self_referencing_foo());
            assert!(tree.depth() <= cap);
        }
    }

    /// T3.3: The plain form of a composite.
    #[test]
    fn plain_form() {
        let graph = ObjectGraph::new(
            ClassInstance::new("Point")
                .with_version(42)
                .with_field("x", GraphNode::int(1))
                .with_field("id", GraphNode::long(9_007_199_254_740_993))
                .into(),
        );
        let plain = GraphMaterializer::default()
            .materialize_graph(&graph)
            .to_plain_json();
        assert_eq!(plain["className"], "Point");
        assert_eq!(plain["serialVersionUid"], "42");
        assert_eq!(plain["value"]["x"], 1);
        assert_eq!(plain["value"]["id"]["type"], "bigint");
        assert_eq!(plain["value"]["id"]["value"], "9007199254740993");
    }

    /// T3.4: Serialized trees carry node tags.
    #[test]
    fn tagged_form() {
        let graph = ObjectGraph::new(GraphNode::long(5));
        let tree = GraphMaterializer::default().materialize_graph(&graph);
        let json = serde_json::to_value(&tree).expect("serialize");
        assert_eq!(json["node"], "leaf");
        assert_eq!(json["kind"], "bigint");
        assert_eq!(json["value"], "5");
    }
}

// =============================================================================
// TIER T4: INSPECTION PIPELINE
// =============================================================================

mod t4_pipeline {
    use super::*;
    use keyscope_core::{ContainerKind, DumpDecoder, InspectConfig, Inspector, JsonGraphDecoder};

    /// T4.1: Text values flow through detection and the codec.
    #[test]
    fn text_values() {
        let inspector = Inspector::default();
        let cases = [
            ("hello", DetectedEncoding::Raw, "hello"),
            ("6869", DetectedEncoding::Hex, "hi"),
            ("68\u{a0}69", DetectedEncoding::Hex, "hi"),
            ("a%2Fb", DetectedEncoding::UrlEncoded, "a/b"),
            ("[1]", DetectedEncoding::Json, "[\n  1\n]"),
        ];
        for (input, encoding, display) in cases {
            let inspection = inspector
                .inspect(&RawValue::string(input), None)
                .expect("inspect");
            assert_eq!(inspection.encoding, encoding, "{input}");
            assert_eq!(inspection.display, display, "{input}");
        }
    }

    /// T4.2: Container kind is carried through.
    #[test]
    fn kind_is_kept() {
        let inspection = Inspector::default()
            .inspect(&RawValue::new(ContainerKind::List, "item"), None)
            .expect("inspect");
        assert_eq!(inspection.kind, ContainerKind::List);
    }

    /// T4.3: Object streams are decoded and materialized.
    #[test]
    fn object_stream_materialized() {
        let graph = ObjectGraph::new(ClassInstance::new("Cart").with_field("n", GraphNode::int(2)).into());
        let inspector = Inspector::with_decoder(&InspectConfig::default(), DumpDecoder::new(graph));
        let inspection = inspector
            .inspect(&RawValue::string(stream_bytes(40)), None)
            .expect("inspect");
        assert_eq!(inspection.encoding, DetectedEncoding::ForeignObject);
        assert!(inspection.binary);
        assert_eq!(
            inspection.tree.as_ref().and_then(|t| t.child("n")),
            Some(&MaterializedNode::number(2))
        );
    }

    /// T4.4: A decoder failure is surfaced, never swallowed.
    #[test]
    fn decoder_failure_surfaces() {
        let inspector = Inspector::with_decoder(&InspectConfig::default(), JsonGraphDecoder);
        let result = inspector.inspect(&RawValue::string(stream_bytes(40)), None);
        assert!(matches!(result, Err(KeyscopeError::GraphDecode(_))));
    }
}
