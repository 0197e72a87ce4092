//! Lineage - a graph state and dynamic relationship engine.
//!
//! This crate owns the authoritative in-memory state of a data-lineage
//! graph: typed nodes connected by directional dependency edges. It
//! discovers upstream/downstream relationships from per-node metadata
//! (falling back deterministically to a static edge catalog), performs
//! expand/collapse with provenance tracking, supports undo/redo over
//! state snapshots, and persists the whole graph to a local store, to
//! portable text, and to shareable locators.
//!
//! Rendering, layout, and interaction are presentation-layer concerns
//! consuming [`engine::GraphEngine`] through its command and read
//! interfaces.

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod domain;
pub mod engine;
pub mod error;
pub mod history;
pub mod persistence;
pub mod resolver;

// Public CLI module (needed by binary)
pub mod cli;
