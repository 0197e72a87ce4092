//! Saving, loading, exporting, and sharing graph states.
//!
//! This module binds the generic `lineage-wire` stores to the domain:
//! named saves live in the multi-entry `lineage_graphs` store, the most
//! recently active state in the single `lineage_current` slot. Both
//! store names are part of the on-disk contract. Export/import moves a
//! whole [`GraphState`] through portable text; share locators embed the
//! compact encoding as the `graph` query parameter.
//!
//! Failed decodes never touch in-memory state: decoding produces a
//! fresh value or an error, so the caller only replaces its state on
//! success.

use crate::domain::{GRAPH_SCHEMA_VERSION, GraphState};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use lineage_wire::{FileStore, SlotStore, locator, text};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Store name for the multi-entry saved-graphs store.
pub const GRAPHS_STORE: &str = "lineage_graphs";

/// Store name for the single current-state slot.
pub const CURRENT_SLOT: &str = "lineage_current";

/// Query parameter carrying the encoded state in a share locator.
pub const SHARE_PARAM: &str = "graph";

/// Attempts at generating a collision-free save id before giving up.
const MAX_ID_ATTEMPTS: u32 = 100;

/// A saved graph as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedGraph {
    /// Generated save-slot id.
    pub id: String,
    /// Display name given at save time.
    pub name: String,
    /// When the save was written.
    pub saved_at: DateTime<Utc>,
    /// The full graph state.
    pub state: GraphState,
}

/// A listing entry: everything about a save except the state itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSummary {
    /// Generated save-slot id.
    pub id: String,
    /// Display name given at save time.
    pub name: String,
    /// When the save was written.
    pub saved_at: DateTime<Utc>,
    /// Number of nodes in the saved state.
    pub node_count: usize,
    /// Number of edges in the saved state.
    pub edge_count: usize,
}

/// Persistent store for named saves plus the current-state slot.
#[derive(Debug, Clone)]
pub struct GraphStore {
    graphs: FileStore,
    current: SlotStore,
}

impl GraphStore {
    /// Open (or create) the store under the given directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Wire`] if the directory cannot be created.
    pub fn open(dir: &Path) -> Result<Self> {
        Ok(Self {
            graphs: FileStore::open(dir, GRAPHS_STORE)?,
            current: SlotStore::open(dir, CURRENT_SLOT)?,
        })
    }

    /// Save a state under a display name, returning the generated id.
    ///
    /// Ids are short content hashes checked against existing saves, so
    /// saving the same name twice yields two independent saves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdExhausted`] if no collision-free id could be
    /// generated, or [`Error::Wire`] on write failure.
    pub fn save_named(&self, name: &str, state: &GraphState) -> Result<String> {
        let existing: BTreeSet<String> = self.graphs.ids()?.into_iter().collect();
        let id = generate_save_id(name, &existing)?;

        let saved = SavedGraph {
            id: id.clone(),
            name: name.to_string(),
            saved_at: Utc::now(),
            state: state.clone(),
        };
        self.graphs.put(&id, &saved)?;
        info!(%id, name, "saved graph");
        Ok(id)
    }

    /// Load a saved graph by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphNotFound`] if no save has that id.
    pub fn load(&self, id: &str) -> Result<SavedGraph> {
        match self.graphs.get(id) {
            Ok(saved) => Ok(saved),
            Err(lineage_wire::Error::EntryNotFound(_)) => {
                Err(Error::GraphNotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a saved graph by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphNotFound`] if no save has that id.
    pub fn delete(&self, id: &str) -> Result<()> {
        if self.graphs.remove(id)? {
            info!(%id, "deleted saved graph");
            Ok(())
        } else {
            Err(Error::GraphNotFound(id.to_string()))
        }
    }

    /// Summaries of all saves, in id order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Wire`] if the store file is unreadable.
    pub fn list(&self) -> Result<Vec<GraphSummary>> {
        let entries: Vec<(String, SavedGraph)> = self.graphs.entries()?;
        Ok(entries
            .into_iter()
            .map(|(_, saved)| GraphSummary {
                id: saved.id,
                name: saved.name,
                saved_at: saved.saved_at,
                node_count: saved.state.nodes.len(),
                edge_count: saved.state.edges.len(),
            })
            .collect())
    }

    /// Write the current-state slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Wire`] on write failure.
    pub fn save_current(&self, state: &GraphState) -> Result<()> {
        self.current.save(state)?;
        Ok(())
    }

    /// Read the current-state slot, `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Wire`] if the slot file is unreadable or does
    /// not decode.
    pub fn load_current(&self) -> Result<Option<GraphState>> {
        Ok(self.current.load()?)
    }
}

/// Encode a state as portable text (pretty JSON).
///
/// # Errors
///
/// Returns [`Error::Wire`] on serialization failure.
pub fn export_text(state: &GraphState) -> Result<String> {
    Ok(text::to_text(state)?)
}

/// Decode a state from portable text.
///
/// Decodes fully before returning, so a failed import cannot leave a
/// partially-applied state anywhere.
///
/// # Errors
///
/// Returns [`Error::Import`] if the text does not decode or carries a
/// schema version newer than this build understands.
pub fn import_text(input: &str) -> Result<GraphState> {
    let state: GraphState =
        text::from_text(input).map_err(|e| Error::Import(e.to_string()))?;
    if state.meta.version > GRAPH_SCHEMA_VERSION {
        return Err(Error::Import(format!(
            "unsupported schema version {} (this build understands up to {})",
            state.meta.version, GRAPH_SCHEMA_VERSION
        )));
    }
    Ok(state)
}

/// Build a share locator embedding the compact-encoded state.
///
/// # Errors
///
/// Returns [`Error::Wire`] on serialization failure.
pub fn share_locator(base: &str, state: &GraphState) -> Result<String> {
    let payload = text::to_compact_text(state)?;
    Ok(locator::embed(base, SHARE_PARAM, &payload))
}

/// Decode a state back out of a share locator.
///
/// # Errors
///
/// Returns [`Error::Wire`] if the locator is malformed or lacks the
/// parameter, or [`Error::Import`] if the payload does not decode.
pub fn state_from_locator(input: &str) -> Result<GraphState> {
    let payload = locator::extract(input, SHARE_PARAM)?;
    import_text(&payload)
}

/// Generate a short save id not present in `existing`.
///
/// The id is `g-` plus eight base36 characters of a SHA-256 over the
/// name, the current time, and the attempt counter.
fn generate_save_id(name: &str, existing: &BTreeSet<String>) -> Result<String> {
    for attempt in 0..MAX_ID_ATTEMPTS {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        hasher.update(Utc::now().timestamp_nanos_opt().unwrap_or(0).to_le_bytes());
        hasher.update(attempt.to_le_bytes());
        let digest = hasher.finalize();

        let mut value = u64::from_le_bytes(digest[..8].try_into().unwrap_or_default());
        let mut encoded = String::new();
        for _ in 0..8 {
            let digit = (value % 36) as u32;
            let ch = char::from_digit(digit, 36).unwrap_or('0');
            encoded.push(ch);
            value /= 36;
        }

        let id = format!("g-{encoded}");
        if !existing.contains(&id) {
            debug!(%id, attempt, "generated save id");
            return Ok(id);
        }
    }
    Err(Error::IdExhausted {
        attempts: MAX_ID_ATTEMPTS,
    })
}
