//! Portable text encoding for serde values.
//!
//! The wire format is JSON. Container types that have no native JSON
//! representation are mapped deterministically by serde: ordered sets
//! (`BTreeSet`) become ordered sequences, ordered mappings (`BTreeMap`)
//! become key/value records. The decoder is symmetric by construction,
//! keyed on field name, so `from_text(to_text(v)) == v` for any value
//! whose `Serialize`/`Deserialize` impls agree.

use crate::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Encodes a value as portable JSON text.
///
/// Output is pretty-printed so exported files diff cleanly under version
/// control. Use [`to_compact_text`] for payloads embedded in locators.
///
/// # Errors
///
/// Returns `Error::Json` if the value fails to serialize (e.g., a map
/// with non-string keys).
pub fn to_text<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Encodes a value as compact (single-line) JSON text.
///
/// # Errors
///
/// Returns `Error::Json` if the value fails to serialize.
pub fn to_compact_text<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decodes a value from portable JSON text.
///
/// Accepts both pretty-printed and compact encodings.
///
/// # Errors
///
/// Returns `Error::Json` if the text is not valid JSON or does not match
/// the target type. The caller's state is untouched on failure: decoding
/// produces a fresh value or nothing.
pub fn from_text<T: DeserializeOwned>(text: &str) -> Result<T> {
    Ok(serde_json::from_str(text)?)
}
