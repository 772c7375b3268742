//! Byte-stable JSON encoding and the content hash built on it.
//!
//! Objects are re-emitted with their keys in lexicographic order at every
//! depth, so two reports with equal contents encode, and hash, identically
//! regardless of field declaration order or map backing.

use phi_core::errors::{ErrorInfo, PhiError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

fn json_error(code: &str, err: serde_json::Error) -> PhiError {
    PhiError::Serde(
        ErrorInfo::new(code, err.to_string())
            .with_context("line", err.line())
            .with_context("column", err.column()),
    )
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|left, right| left.0.cmp(&right.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, nested)| (key, sort_keys(nested)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        leaf => leaf,
    }
}

/// Compact JSON with sorted keys.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, PhiError> {
    let tree = serde_json::to_value(value).map_err(|err| json_error("json-encode", err))?;
    serde_json::to_vec(&sort_keys(tree)).map_err(|err| json_error("json-encode", err))
}

/// Decodes a report or configuration; parse failures carry line and column.
pub fn decode_json<T: DeserializeOwned>(data: &[u8]) -> Result<T, PhiError> {
    serde_json::from_slice(data).map_err(|err| json_error("json-decode", err))
}

/// Lowercase hex SHA-256 of [`canonical_json`].
pub fn content_hash<T: Serialize>(value: &T) -> Result<String, PhiError> {
    let digest = Sha256::digest(canonical_json(value)?);
    Ok(format!("{digest:x}"))
}
