//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::InputArgs;
use crate::config::AppConfig;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use keyscope_core::{
    ContainerKind, ContainerValue, DetectedEncoding, Direction, DumpDecoder, FormatDetector,
    GraphDecoder, GraphMaterializer, Inspection, Inspector, JsonGraphDecoder, KeyscopeError,
    ObjectGraph, RawValue, ScoredMember, ValueCodec, view_container,
};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a stored value read from disk (512 MB).
///
/// Matches the largest string value a store will hold.
const MAX_VALUE_FILE_SIZE: u64 = 512 * 1024 * 1024;

/// Maximum size of an object graph dump (100 MB).
const MAX_GRAPH_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), KeyscopeError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| KeyscopeError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(KeyscopeError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input path.
///
/// Canonicalizes the path (resolving symlinks and "..") and ensures it is a
/// regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, KeyscopeError> {
    let canonical = path.canonicalize().map_err(|e| {
        KeyscopeError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(KeyscopeError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, KeyscopeError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        KeyscopeError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(KeyscopeError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| KeyscopeError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// INPUT / OUTPUT
// =============================================================================

/// Read a file after validating its path and size.
pub fn read_file(path: &Path, max_size: u64) -> Result<Vec<u8>, KeyscopeError> {
    let validated_path = validate_file_path(path)?;
    validate_file_size(&validated_path, max_size)?;
    std::fs::read(&validated_path)
        .map_err(|e| KeyscopeError::IoError(format!("Read file: {}", e)))
}

/// Bytes of the stored value named by `--file` or `--text`.
pub fn read_input(input: &InputArgs) -> Result<Vec<u8>, KeyscopeError> {
    match (&input.file, &input.text) {
        (Some(path), _) => read_file(path, MAX_VALUE_FILE_SIZE),
        (None, Some(text)) => Ok(text.clone().into_bytes()),
        (None, None) => Err(KeyscopeError::IoError(
            "No input: pass --file or --text".to_string(),
        )),
    }
}

/// Load an object graph dump written as JSON.
pub fn load_graph(path: &Path) -> Result<ObjectGraph, KeyscopeError> {
    let data = read_file(path, MAX_GRAPH_FILE_SIZE)?;
    let graph = JsonGraphDecoder.decode(&data)?;
    tracing::debug!(
        path = %path.display(),
        handles = graph.handle_count(),
        "loaded graph dump"
    );
    Ok(graph)
}

fn write_output(path: &Path, data: &[u8]) -> Result<(), KeyscopeError> {
    let validated_path = validate_output_path(path)?;
    std::fs::write(&validated_path, data)
        .map_err(|e| KeyscopeError::IoError(format!("Write file: {}", e)))?;
    tracing::info!(path = %validated_path.display(), bytes = data.len(), "wrote output");
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), KeyscopeError> {
    println!("{}", pretty_json(value)?);
    Ok(())
}

fn pretty_json<T: serde::Serialize>(value: &T) -> Result<String, KeyscopeError> {
    serde_json::to_string_pretty(value).map_err(|e| KeyscopeError::SerializationError(e.to_string()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, KeyscopeError> {
    serde_json::to_value(value).map_err(|e| KeyscopeError::SerializationError(e.to_string()))
}

// =============================================================================
// DETECT COMMAND
// =============================================================================

/// Guess the encoding of a stored value.
pub fn cmd_detect(input: &[u8], config: &AppConfig, json_mode: bool) -> Result<(), KeyscopeError> {
    let encoding = FormatDetector::new(config.detector.clone()).detect(input, None);

    if json_mode {
        print_json(&serde_json::json!({
            "encoding": encoding,
            "label": encoding.label(),
            "length": input.len()
        }))?;
        return Ok(());
    }

    println!("{} ({})", encoding, encoding.label());
    Ok(())
}

// =============================================================================
// DECODE COMMAND
// =============================================================================

/// Decode a stored value. `selection` is an encoding name or `auto`.
pub fn cmd_decode(
    input: &[u8],
    selection: &str,
    output: Option<&Path>,
    config: &AppConfig,
    json_mode: bool,
) -> Result<(), KeyscopeError> {
    let override_encoding = DetectedEncoding::parse_selection(selection)?;
    let encoding = FormatDetector::new(config.detector.clone()).detect(input, override_encoding);

    let payload = decode_payload(input, encoding)?;

    if let Some(path) = output {
        write_output(path, &payload)?;
        if json_mode {
            print_json(&serde_json::json!({
                "encoding": encoding,
                "output": path.to_string_lossy(),
                "bytes": payload.len()
            }))?;
        }
        return Ok(());
    }

    let (display, binary) = match String::from_utf8(payload) {
        Ok(text) => (text, false),
        Err(e) => {
            tracing::info!("decoded payload is not UTF-8, showing base64");
            (STANDARD.encode(e.as_bytes()), true)
        }
    };

    if json_mode {
        print_json(&serde_json::json!({
            "encoding": encoding,
            "binary": binary,
            "display": display
        }))?;
        return Ok(());
    }

    println!("{}", display);
    Ok(())
}

/// JSON and url values go through the text layer (pretty printing and the
/// url fallback); the others keep their exact payload bytes.
fn decode_payload(input: &[u8], encoding: DetectedEncoding) -> Result<Vec<u8>, KeyscopeError> {
    match encoding {
        DetectedEncoding::Json | DetectedEncoding::UrlEncoded => {
            Ok(ValueCodec::decode(input, encoding)?.into_bytes())
        }
        DetectedEncoding::ForeignObject => Err(KeyscopeError::Unsupported {
            encoding,
            direction: Direction::Decode,
        }),
        DetectedEncoding::Base64 | DetectedEncoding::Hex | DetectedEncoding::Raw => {
            ValueCodec::decode_bytes(input, encoding)
        }
    }
}

// =============================================================================
// ENCODE COMMAND
// =============================================================================

/// Encode a payload into stored form.
pub fn cmd_encode(
    input: &[u8],
    encoding_name: &str,
    output: Option<&Path>,
    json_mode: bool,
) -> Result<(), KeyscopeError> {
    let encoding: DetectedEncoding = encoding_name.parse()?;
    let stored = ValueCodec::encode_bytes(input, encoding)?;

    if let Some(path) = output {
        write_output(path, &stored)?;
        if json_mode {
            print_json(&serde_json::json!({
                "encoding": encoding,
                "output": path.to_string_lossy(),
                "bytes": stored.len()
            }))?;
        }
        return Ok(());
    }

    if json_mode {
        print_json(&serde_json::json!({
            "encoding": encoding,
            "stored": String::from_utf8_lossy(&stored)
        }))?;
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&stored)
        .and_then(|()| writeln!(stdout))
        .map_err(|e| KeyscopeError::IoError(format!("Write stdout: {}", e)))
}

// =============================================================================
// MATERIALIZE COMMAND
// =============================================================================

/// Materialize a graph dump and print the tree as JSON.
pub fn cmd_materialize(graph_path: &Path, plain: bool, config: &AppConfig) -> Result<(), KeyscopeError> {
    let graph = load_graph(graph_path)?;
    let tree = GraphMaterializer::new(config.materializer).materialize_graph(&graph);
    tracing::info!(
        nodes = tree.node_count(),
        depth = tree.depth(),
        "materialized graph"
    );

    let output = if plain {
        tree.to_plain_json()
    } else {
        to_json(&tree)?
    };
    print_json(&output)?;
    Ok(())
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Run the full pipeline on a stored value.
pub fn cmd_inspect(
    input: &[u8],
    selection: &str,
    kind: &str,
    graph_path: Option<&Path>,
    config: &AppConfig,
    json_mode: bool,
) -> Result<(), KeyscopeError> {
    let raw = RawValue::new(kind.parse()?, input);
    let override_encoding = DetectedEncoding::parse_selection(selection)?;
    let inspect_config = config.inspect_config();

    let inspection = match graph_path {
        Some(path) => Inspector::with_decoder(&inspect_config, DumpDecoder::new(load_graph(path)?))
            .inspect(&raw, override_encoding)?,
        None => Inspector::new(&inspect_config).inspect(&raw, override_encoding)?,
    };

    if json_mode {
        print_json(&inspection)?;
        return Ok(());
    }

    print_inspection(&inspection);
    Ok(())
}

fn print_inspection(inspection: &Inspection) {
    println!("Kind:     {}", inspection.kind);
    println!(
        "Encoding: {} ({})",
        inspection.encoding,
        inspection.encoding.label()
    );
    println!("Binary:   {}", if inspection.binary { "yes" } else { "no" });
    if let Some(tree) = &inspection.tree {
        println!("Nodes:    {}", tree.node_count());
    }
    println!();
    println!("{}", inspection.display);
}

// =============================================================================
// VIEW COMMAND
// =============================================================================

/// Render the members of a collection key.
///
/// The document is an object of field values for a hash, an array of
/// members for a list or set, and an array of `{"member", "score"}` objects
/// for a zset.
pub fn cmd_view(kind: &str, file: &Path) -> Result<(), KeyscopeError> {
    let kind: ContainerKind = kind.parse()?;
    let document = read_file(file, MAX_VALUE_FILE_SIZE)?;
    let members: Value =
        serde_json::from_slice(&document).map_err(|e| KeyscopeError::InvalidJson(e.to_string()))?;

    let view = view_container(&container_from_json(kind, members)?);
    print_json(&view)?;
    Ok(())
}

/// Build container members from their JSON description.
pub fn container_from_json(
    kind: ContainerKind,
    members: Value,
) -> Result<ContainerValue, KeyscopeError> {
    match (kind, members) {
        (ContainerKind::Hash, Value::Object(fields)) => Ok(ContainerValue::Hash(
            fields
                .into_iter()
                .map(|(name, value)| (name, member_bytes(value)))
                .collect(),
        )),
        (ContainerKind::List, Value::Array(items)) => Ok(ContainerValue::List(
            items.into_iter().map(member_bytes).collect(),
        )),
        (ContainerKind::Set, Value::Array(items)) => Ok(ContainerValue::Set(
            items.into_iter().map(member_bytes).collect(),
        )),
        (ContainerKind::ZSet, Value::Array(items)) => items
            .into_iter()
            .map(scored_member)
            .collect::<Result<Vec<_>, _>>()
            .map(ContainerValue::ZSet),
        (ContainerKind::String, _) => Err(KeyscopeError::InvalidContainerKind(
            "string (expected hash, list, set or zset)".to_string(),
        )),
        (kind, _) => Err(KeyscopeError::InvalidJson(format!(
            "{} members must be a JSON {}",
            kind,
            if kind == ContainerKind::Hash {
                "object"
            } else {
                "array"
            }
        ))),
    }
}

/// String members are taken as written; other JSON values as their JSON text.
fn member_bytes(value: Value) -> Vec<u8> {
    match value {
        Value::String(s) => s.into_bytes(),
        other => other.to_string().into_bytes(),
    }
}

fn scored_member(entry: Value) -> Result<ScoredMember, KeyscopeError> {
    let score = entry
        .get("score")
        .and_then(Value::as_f64)
        .ok_or_else(|| KeyscopeError::InvalidJson("zset member needs a numeric score".to_string()))?;
    let member = entry
        .get("member")
        .cloned()
        .map(member_bytes)
        .ok_or_else(|| KeyscopeError::InvalidJson("zset member needs a member".to_string()))?;
    Ok(ScoredMember { member, score })
}

// =============================================================================
// ENCODINGS COMMAND
// =============================================================================

/// List the encodings in detection priority order.
pub fn cmd_encodings(json_mode: bool) -> Result<(), KeyscopeError> {
    if json_mode {
        let encodings: Vec<Value> = DetectedEncoding::ALL
            .iter()
            .map(|encoding| {
                serde_json::json!({
                    "name": encoding,
                    "label": encoding.label()
                })
            })
            .collect();
        print_json(&Value::Array(encodings))?;
        return Ok(());
    }

    println!("Encodings (detection order)");
    println!("===========================");
    for encoding in DetectedEncoding::ALL {
        println!("  {:<16} {}", encoding.as_str(), encoding.label());
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
