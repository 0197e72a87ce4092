//! Error types for lineage-wire operations.

use std::io;
use thiserror::Error;

/// The error type for lineage-wire operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred while reading or writing a store file.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No entry with the given id exists in the store.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// A shareable locator was malformed or carried no payload.
    #[error("invalid locator: {0}")]
    Locator(String),
}

/// A specialized Result type for lineage-wire operations.
pub type Result<T> = std::result::Result<T, Error>;
