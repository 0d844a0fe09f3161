//! # Container Views
//!
//! Display rules for keys whose value is a collection of members rather than
//! a single blob.
//!
//! - hash: when the first field value looks like a JSON object or array every
//!   field is parsed as JSON (a field that fails stays a string); otherwise if
//!   any value is binary every value is shown as base64
//! - list / set: members in stored order, all base64 if any member is binary
//! - zset: `{member, score}` pairs in stored order
//!
//! A member is binary when it is not UTF-8 or contains control bytes other
//! than tab, newline, vertical tab, form feed and carriage return.

use crate::codec::ValueCodec;
use crate::detector::{has_binary_control_bytes, is_likely_json};
use crate::ContainerKind;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde_json::{Map, Value};

/// A member of a sorted set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    pub member: Vec<u8>,
    pub score: f64,
}

/// Members of a collection key, in the order the store returned them.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerValue {
    Hash(Vec<(String, Vec<u8>)>),
    List(Vec<Vec<u8>>),
    Set(Vec<Vec<u8>>),
    ZSet(Vec<ScoredMember>),
}

impl ContainerValue {
    #[must_use]
    pub fn kind(&self) -> ContainerKind {
        match self {
            Self::Hash(_) => ContainerKind::Hash,
            Self::List(_) => ContainerKind::List,
            Self::Set(_) => ContainerKind::Set,
            Self::ZSet(_) => ContainerKind::ZSet,
        }
    }
}

/// How the members of a view are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberEncoding {
    Json,
    Base64,
    Utf8,
}

/// Display-ready form of a collection key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerView {
    pub kind: ContainerKind,
    pub encoding: MemberEncoding,
    pub data: Value,
}

/// Render a collection key for display.
#[must_use]
pub fn view_container(value: &ContainerValue) -> ContainerView {
    let kind = value.kind();
    let (encoding, data) = match value {
        ContainerValue::Hash(fields) => view_hash(fields),
        ContainerValue::List(members) | ContainerValue::Set(members) => {
            let encoding = members_encoding(members.iter().map(Vec::as_slice));
            let data = members
                .iter()
                .map(|m| Value::String(render(m, encoding)))
                .collect();
            (encoding, Value::Array(data))
        }
        ContainerValue::ZSet(members) => {
            let encoding = members_encoding(members.iter().map(|m| m.member.as_slice()));
            let data = members
                .iter()
                .map(|m| {
                    let mut entry = Map::new();
                    entry.insert("member".into(), Value::String(render(&m.member, encoding)));
                    entry.insert("score".into(), score_value(m.score));
                    Value::Object(entry)
                })
                .collect();
            (encoding, Value::Array(data))
        }
    };
    tracing::trace!(%kind, ?encoding, "rendered container view");
    ContainerView {
        kind,
        encoding,
        data,
    }
}

fn view_hash(fields: &[(String, Vec<u8>)]) -> (MemberEncoding, Value) {
    let first_is_json = fields
        .first()
        .is_some_and(|(_, v)| is_likely_json(&String::from_utf8_lossy(v)));

    if first_is_json {
        let data = fields
            .iter()
            .map(|(name, v)| {
                let text = String::from_utf8_lossy(v);
                let parsed =
                    ValueCodec::parse_json(&text).unwrap_or_else(|_| Value::String(text.into_owned()));
                (name.clone(), parsed)
            })
            .collect::<Map<_, _>>();
        return (MemberEncoding::Json, Value::Object(data));
    }

    let encoding = members_encoding(fields.iter().map(|(_, v)| v.as_slice()));
    let data = fields
        .iter()
        .map(|(name, v)| (name.clone(), Value::String(render(v, encoding))))
        .collect::<Map<_, _>>();
    (encoding, Value::Object(data))
}

fn is_binary_member(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_err() || has_binary_control_bytes(bytes)
}

fn members_encoding<'a>(mut members: impl Iterator<Item = &'a [u8]>) -> MemberEncoding {
    if members.any(is_binary_member) {
        MemberEncoding::Base64
    } else {
        MemberEncoding::Utf8
    }
}

fn render(bytes: &[u8], encoding: MemberEncoding) -> String {
    match encoding {
        MemberEncoding::Base64 => STANDARD.encode(bytes),
        MemberEncoding::Json | MemberEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Infinite scores have no JSON number form.
fn score_value(score: f64) -> Value {
    serde_json::Number::from_f64(score)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(score.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================
