#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Local-first synchronization for saved locations.
//!
//! The [`coordinator::SyncCoordinator`] owns the canonical in-memory
//! location list per identity: it hydrates synchronously from the
//! persistent cache for immediate render, then reconciles against the
//! server when a session token is present. Server truth wholly replaces
//! local state once reachable; when the server is unreachable or the
//! user is a guest, mutations land optimistically on the local cache and
//! stay there (best-effort by design — there is no retry queue).
//!
//! [`search::SearchDebouncer`] rate-limits free-text place queries with
//! a last-query-wins discipline, and [`resource`] provides the
//! once-initialized readiness handle for the third-party map widget.

pub mod coordinator;
pub mod resource;
pub mod search;

use thiserror::Error;

/// Errors surfaced by the sync engine.
///
/// Raw transport and parse failures never reach presentation code; they
/// are converted here or swallowed into the local-fallback path.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A server reconciliation fetch failed. Prior state is intact;
    /// surface as a non-fatal warning, never as data loss.
    #[error("server refresh failed: {0}")]
    Refresh(#[source] meetmap_client::ClientError),

    /// The persistent cache could not be written.
    #[error("cache write failed: {0}")]
    Store(#[from] meetmap_store::StoreError),

    /// A mutation referenced a location id not present in the list.
    #[error("location {id} not found")]
    UnknownLocation {
        /// The missing id.
        id: i64,
    },

    /// A draft failed validation (e.g., empty name).
    #[error("invalid location: {message}")]
    Invalid {
        /// What was wrong with the draft.
        message: String,
    },
}
