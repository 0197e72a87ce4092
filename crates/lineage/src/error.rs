//! Error types for lineage operations.
//!
//! Following the engine's error taxonomy, most graph commands cannot
//! fail: operations on absent ids are no-ops and unresolved metadata
//! references are dropped (or surfaced as per-node warnings), never
//! raised. Errors here are reserved for persistence and decoding, where
//! the caller must know the operation did not take effect.

use std::io;
use thiserror::Error;

/// The error type for lineage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Wire-format or store error from the persistence layer.
    #[error("wire error: {0}")]
    Wire(#[from] lineage_wire::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No saved graph with the given id exists.
    #[error("saved graph not found: {0}")]
    GraphNotFound(String),

    /// Imported text could not be decoded into a graph state.
    #[error("import failed: {0}")]
    Import(String),

    /// Save-slot id generation exhausted its collision retries.
    #[error("unable to generate unique save id after {attempts} attempts")]
    IdExhausted {
        /// Number of generation attempts made.
        attempts: u32,
    },
}

/// A specialized Result type for lineage operations.
pub type Result<T> = std::result::Result<T, Error>;
