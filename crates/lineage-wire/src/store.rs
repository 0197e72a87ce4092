//! Named JSON stores on the local filesystem.
//!
//! Two store shapes are provided:
//!
//! - [`FileStore`]: a multi-entry store, one JSON file per store name,
//!   holding a mapping of entry id to record
//! - [`SlotStore`]: a single-record store (e.g., a "current state" slot)
//!
//! # Atomicity
//!
//! All writes use the temp-file-then-rename pattern: data is written to a
//! sibling `.tmp` file, flushed, and atomically renamed over the target.
//! On POSIX systems renames within a filesystem are atomic, so a crash
//! mid-write leaves the previous store contents intact. A failed write
//! attempts best-effort cleanup of the temp file and returns the error.

use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A multi-entry JSON store keyed by entry id.
///
/// The store lives in a single file named `<store_name>.json` inside the
/// base directory. Entries are arbitrary serde values; ids are
/// caller-supplied strings. Reads of a missing store file behave as an
/// empty store; the file is created on first write.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Opens (or designates) a store under `dir` with the given name.
    ///
    /// The directory is created if it does not exist. No store file is
    /// created until the first write.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the directory cannot be created.
    pub fn open(dir: &Path, store_name: &str) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(format!("{store_name}.json")),
        })
    }

    /// Path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inserts or replaces the entry with the given id.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the value fails to serialize, or
    /// `Error::Io` if the store file cannot be written.
    pub fn put<T: Serialize>(&self, id: &str, value: &T) -> Result<()> {
        let mut map = self.read_map()?;
        map.insert(id.to_string(), serde_json::to_value(value)?);
        self.write_map(&map)
    }

    /// Fetches and decodes the entry with the given id.
    ///
    /// # Errors
    ///
    /// Returns `Error::EntryNotFound` if no entry has that id, or
    /// `Error::Json` if the stored value does not match the target type.
    pub fn get<T: DeserializeOwned>(&self, id: &str) -> Result<T> {
        let map = self.read_map()?;
        let value = map
            .get(id)
            .ok_or_else(|| Error::EntryNotFound(id.to_string()))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Removes the entry with the given id.
    ///
    /// Returns `true` if an entry was removed, `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the store file cannot be rewritten.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut map = self.read_map()?;
        let removed = map.remove(id).is_some();
        if removed {
            self.write_map(&map)?;
        }
        Ok(removed)
    }

    /// Returns the ids of all entries, in sorted order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io`/`Error::Json` if the store file is unreadable.
    pub fn ids(&self) -> Result<Vec<String>> {
        Ok(self.read_map()?.into_keys().collect())
    }

    /// Decodes all entries as `(id, value)` pairs, in id order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if any stored value does not match the
    /// target type.
    pub fn entries<T: DeserializeOwned>(&self) -> Result<Vec<(String, T)>> {
        self.read_map()?
            .into_iter()
            .map(|(id, value)| Ok((id, serde_json::from_value(value)?)))
            .collect()
    }

    fn read_map(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn write_map(&self, map: &BTreeMap<String, serde_json::Value>) -> Result<()> {
        write_atomic(&self.path, &serde_json::to_string_pretty(map)?)
    }
}

/// A single-record JSON store.
///
/// Holds at most one value, e.g., the most recently active graph state.
#[derive(Debug, Clone)]
pub struct SlotStore {
    path: PathBuf,
}

impl SlotStore {
    /// Opens (or designates) a slot under `dir` with the given name.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the directory cannot be created.
    pub fn open(dir: &Path, slot_name: &str) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(format!("{slot_name}.json")),
        })
    }

    /// Writes the slot value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` on serialization failure or `Error::Io` on
    /// write failure.
    pub fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        write_atomic(&self.path, &serde_json::to_string_pretty(value)?)
    }

    /// Reads the slot value, or `None` if the slot has never been written.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file is unreadable or `Error::Json` if
    /// its contents do not match the target type.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Clears the slot. A missing slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if an existing slot file cannot be removed.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Atomically writes `contents` to `path` via a sibling temp file.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let temp_path = make_temp_path(path);

    let write_result = (|| -> Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        Ok(())
    })();

    if let Err(e) = write_result {
        warn!(path = %temp_path.display(), error = %e, "write failed, cleaning up temp file");
        // Best-effort cleanup of temp file
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path)?;
    debug!(path = %path.display(), "store file written");
    Ok(())
}

/// Creates a temporary file path for atomic write operations.
///
/// The temp path is created by appending `.tmp` to the original filename.
/// If the original path has no extension, `.tmp` is appended directly;
/// otherwise the extension becomes `{ext}.tmp`.
fn make_temp_path(path: &Path) -> PathBuf {
    let mut temp_path = path.to_path_buf();
    let new_extension = match path.extension() {
        Some(ext) => {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".tmp");
            new_ext
        }
        None => std::ffi::OsString::from("tmp"),
    };
    temp_path.set_extension(new_extension);
    temp_path
}
