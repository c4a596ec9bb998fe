#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-identity durable key/value cache.
//!
//! Backs the local-first half of the sync engine: one opaque JSON blob per
//! `(identity, kind)` pair, stored as a file under the data directory.
//! Writes fully replace the previous value (last-writer-wins, no merge) and
//! are visible to the next read immediately. Corrupt or unreadable blobs
//! read as absent, never as an error — callers treat them exactly like
//! "never written".
//!
//! Only the sync coordinator writes here; keeping a single writer is what
//! keeps cache-invalidation logic in one place.

pub mod paths;

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// The kinds of blob the store holds per identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// The identity's full saved-location list.
    Locations,
    /// The identity's active (current-position) location.
    ActiveLocation,
}

impl StoreKind {
    /// Returns the on-disk file name for this kind.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Locations => "locations.json",
            Self::ActiveLocation => "active_location.json",
        }
    }
}

/// Errors from store writes.
///
/// Reads never fail — see [`KeyedStore::get`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be serialized to JSON.
    #[error("JSON serialize error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-identity durable key/value store over JSON files.
///
/// Layout: `<root>/<identity-namespace>/<kind>.json`.
#[derive(Debug, Clone)]
pub struct KeyedStore {
    root: PathBuf,
}

impl KeyedStore {
    /// Creates a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the root directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        paths::ensure_dir(&root)?;
        Ok(Self { root })
    }

    /// Creates a store at the default cache directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory cannot be created.
    pub fn open_default() -> Result<Self, StoreError> {
        Self::new(paths::cache_dir())
    }

    /// Reads the blob for `(namespace, kind)`.
    ///
    /// Returns `None` if the blob was never written, cannot be read, or
    /// does not parse as `T`. A corrupt blob is logged and treated as
    /// absent so the engine re-initializes from the server or empty state.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, namespace: &str, kind: StoreKind) -> Option<T> {
        let path = self.blob_path(namespace, kind);
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!(
                    "Discarding corrupt cache blob {}: {e}",
                    path.display()
                );
                None
            }
        }
    }

    /// Writes the blob for `(namespace, kind)`, fully replacing any
    /// previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialization or the write fails.
    pub fn set<T: Serialize>(
        &self,
        namespace: &str,
        kind: StoreKind,
        value: &T,
    ) -> Result<(), StoreError> {
        let path = self.blob_path(namespace, kind);
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }
        let json = serde_json::to_string(value)?;
        std::fs::write(&path, json)?;
        Ok(())
    }

    /// Removes the blob for `(namespace, kind)`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file exists but cannot be removed.
    pub fn remove(&self, namespace: &str, kind: StoreKind) -> Result<(), StoreError> {
        let path = self.blob_path(namespace, kind);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Returns the store's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, namespace: &str, kind: StoreKind) -> PathBuf {
        self.root
            .join(paths::sanitize_namespace(namespace))
            .join(kind.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetmap_models::{Location, LocationsSnapshot};

    fn scratch_store(test: &str) -> KeyedStore {
        let dir = std::env::temp_dir()
            .join("meetmap_store_tests")
            .join(format!("{test}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        KeyedStore::new(dir).unwrap()
    }

    fn loc(id: i64, name: &str, is_default: bool) -> Location {
        Location {
            id,
            name: name.to_string(),
            address: String::new(),
            lat: None,
            lng: None,
            is_default,
        }
    }

    #[test]
    fn set_is_immediately_visible_to_get() {
        let store = scratch_store("set_then_get");
        let snap = LocationsSnapshot::new(vec![loc(1, "front gate", true)]);
        store.set("guest", StoreKind::Locations, &snap).unwrap();

        let read: LocationsSnapshot = store.get("guest", StoreKind::Locations).unwrap();
        assert_eq!(read.locations, snap.locations);
        assert_eq!(read.active_location_id, Some(1));
    }

    #[test]
    fn never_written_reads_as_none() {
        let store = scratch_store("never_written");
        let read: Option<LocationsSnapshot> = store.get("guest", StoreKind::Locations);
        assert!(read.is_none());
    }

    #[test]
    fn corrupt_blob_reads_as_none() {
        let store = scratch_store("corrupt");
        let path = store
            .root()
            .join("guest")
            .join(StoreKind::Locations.file_name());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let read: Option<LocationsSnapshot> = store.get("guest", StoreKind::Locations);
        assert!(read.is_none());
    }

    #[test]
    fn set_replaces_previous_value_entirely() {
        let store = scratch_store("replace");
        let first = LocationsSnapshot::new(vec![loc(1, "front gate", true), loc(2, "library", false)]);
        let second = LocationsSnapshot::new(vec![loc(3, "dorm", true)]);
        store.set("guest", StoreKind::Locations, &first).unwrap();
        store.set("guest", StoreKind::Locations, &second).unwrap();

        let read: LocationsSnapshot = store.get("guest", StoreKind::Locations).unwrap();
        assert_eq!(read.locations.len(), 1);
        assert_eq!(read.locations[0].id, 3);
    }

    #[test]
    fn namespaces_are_isolated() {
        let store = scratch_store("isolation");
        let a = LocationsSnapshot::new(vec![loc(1, "a's spot", true)]);
        store.set("user-a", StoreKind::Locations, &a).unwrap();

        let b: Option<LocationsSnapshot> = store.get("user-b", StoreKind::Locations);
        assert!(b.is_none());

        let a_again: LocationsSnapshot = store.get("user-a", StoreKind::Locations).unwrap();
        assert_eq!(a_again.locations[0].name, "a's spot");
    }

    #[test]
    fn remove_is_idempotent() {
        let store = scratch_store("remove");
        let snap = LocationsSnapshot::new(vec![loc(1, "x", true)]);
        store.set("guest", StoreKind::ActiveLocation, &snap).unwrap();
        store.remove("guest", StoreKind::ActiveLocation).unwrap();
        store.remove("guest", StoreKind::ActiveLocation).unwrap();

        let read: Option<LocationsSnapshot> = store.get("guest", StoreKind::ActiveLocation);
        assert!(read.is_none());
    }

    #[test]
    fn hostile_namespace_stays_under_root() {
        let store = scratch_store("hostile_ns");
        let snap = LocationsSnapshot::new(vec![]);
        store
            .set("../../etc/passwd", StoreKind::Locations, &snap)
            .unwrap();
        let read: Option<LocationsSnapshot> = store.get("../../etc/passwd", StoreKind::Locations);
        assert!(read.is_some());
    }
}
