//! Wire-format and storage primitives for lineage graph state.
//!
//! This library provides the persistence building blocks used by the
//! `lineage` engine, without any knowledge of the engine's domain types:
//!
//! - [`text`]: encoding/decoding arbitrary serde values to portable text
//! - [`store`]: named multi-entry and single-slot JSON stores on disk,
//!   written atomically
//! - [`locator`]: embedding/extracting an encoded payload in a shareable
//!   locator's query string

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod locator;
pub mod store;
pub mod text;

pub use error::{Error, Result};
pub use store::{FileStore, SlotStore};
