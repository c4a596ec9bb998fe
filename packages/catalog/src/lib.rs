#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shape-tolerant client for the shared place catalog.
//!
//! The backend's list-of-places endpoints return inconsistent JSON shapes
//! across deployments: sometimes a bare array, sometimes the array under a
//! `places` or `items` field, sometimes an array of `{place: {...}}`
//! wrappers, with several competing spellings for the id, name, address,
//! and coordinate fields. Everything that crosses this crate's boundary is
//! normalized into the canonical [`meetmap_models::Place`] record by
//! [`shape`], and every category fetch walks a priority-ordered list of
//! endpoint variants defined in [`registry`] — the first variant that
//! answers successfully wins.
//!
//! A category fetch where **every** variant fails surfaces as
//! [`CatalogError::Unavailable`], which callers must render distinctly
//! from "this category has zero places".

pub mod endpoints;
pub mod filter;
pub mod registry;
pub mod shape;

use thiserror::Error;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Every endpoint variant for the operation failed. Distinct from a
    /// successful empty list.
    #[error("catalog unavailable: all endpoint variants failed for {operation}")]
    Unavailable {
        /// Which chained operation gave up (e.g., `"places_of_category"`).
        operation: &'static str,
    },

    /// A single-endpoint call failed at the transport layer.
    #[error(transparent)]
    Client(#[from] meetmap_client::ClientError),

    /// The server answered but the body could not be normalized.
    #[error("normalization error: {message}")]
    Normalization {
        /// Description of what could not be resolved.
        message: String,
    },
}
