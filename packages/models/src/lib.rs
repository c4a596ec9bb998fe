#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical data model for the meetmap place & location engine.
//!
//! Every server response, regardless of its wire shape, is normalized into
//! the types defined here before any other crate touches it. Locations are
//! user-owned saved points; places belong to the shared catalog and carry a
//! fixed [`PlaceKind`] taxonomy; user categories are personal folders over
//! catalog place ids.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The namespace all cached location data lives under: an authenticated
/// user or the guest sentinel.
///
/// Switching identities swaps the entire cache namespace; one identity's
/// data must never be visible under another's key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Unauthenticated session. Cached under the `"guest"` namespace.
    Guest,
    /// Authenticated user with a server session.
    User {
        /// Server-assigned user id.
        id: String,
        /// Bearer token attached to server calls made on this identity's
        /// behalf.
        session_token: String,
    },
}

impl Identity {
    /// Returns the cache namespace key for this identity.
    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            Self::Guest => "guest",
            Self::User { id, .. } => id,
        }
    }

    /// Returns the session token, if this identity is authenticated.
    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        match self {
            Self::Guest => None,
            Self::User { session_token, .. } => Some(session_token),
        }
    }
}

/// A latitude/longitude pair (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lng: f64,
}

/// Fixed place-type taxonomy for the shared catalog.
///
/// The type dropdown on the map filters against these values; user-defined
/// categories only ever narrow within them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlaceKind {
    /// Restaurants.
    Restaurant,
    /// Cafés and coffee shops.
    Cafe,
    /// Partner businesses offering student deals.
    Partner,
    /// Convenience stores.
    Convenience,
    /// Anything not fitting the other kinds.
    Other,
}

impl PlaceKind {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Restaurant,
            Self::Cafe,
            Self::Partner,
            Self::Convenience,
            Self::Other,
        ]
    }
}

/// The map's type filter: every place, or one [`PlaceKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceFilter {
    /// No type filtering; the whole catalog passes.
    All,
    /// Only places of the given kind pass.
    Kind(PlaceKind),
}

/// A point of interest in the shared catalog.
///
/// Not owned by any single user; created by any user's "add place" action
/// and visible to all. Coordinates are optional because a place can be
/// saved from an address before geocoding resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    /// Server-assigned id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Latitude (WGS84). `None` until geocoded.
    pub lat: Option<f64>,
    /// Longitude (WGS84). `None` until geocoded.
    pub lng: Option<f64>,
    /// Taxonomy kind.
    pub kind: PlaceKind,
}

/// A draft for creating a new catalog place.
///
/// Carries no id; the server assigns one on creation. A geocode miss is
/// not a save blocker, so coordinates may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDraft {
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Latitude, if already known.
    pub lat: Option<f64>,
    /// Longitude, if already known.
    pub lng: Option<f64>,
    /// Taxonomy kind.
    pub kind: PlaceKind,
}

/// A named, addressed point a user has saved as "my place".
///
/// Used as the meeting/transaction reference point on the map. At most one
/// location per identity carries `is_default = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Stable id. Server-assigned (positive) once synced; a negative
    /// temporary id before the first successful sync.
    pub id: i64,
    /// Display name. Non-empty.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Latitude (WGS84). `None` until geocoded.
    pub lat: Option<f64>,
    /// Longitude (WGS84). `None` until geocoded.
    pub lng: Option<f64>,
    /// Whether this location is the identity's current default.
    #[serde(default)]
    pub is_default: bool,
}

/// A draft for saving a new [`Location`].
///
/// Carries no id; the sync engine assigns a temporary negative id on the
/// local-fallback path and the server assigns the real one once synced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDraft {
    /// Display name. Non-empty.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Latitude, if already geocoded.
    pub lat: Option<f64>,
    /// Longitude, if already geocoded.
    pub lng: Option<f64>,
    /// Whether the new location should become the default.
    #[serde(default)]
    pub is_default: bool,
}

/// Partial update applied to an existing [`Location`].
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPatch {
    /// New display name.
    pub name: Option<String>,
    /// New street address.
    pub address: Option<String>,
    /// New latitude.
    pub lat: Option<f64>,
    /// New longitude.
    pub lng: Option<f64>,
}

impl Location {
    /// Applies a patch in place, ignoring `None` fields.
    pub fn apply_patch(&mut self, patch: &LocationPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(address) = &patch.address {
            self.address.clone_from(address);
        }
        if let Some(lat) = patch.lat {
            self.lat = Some(lat);
        }
        if let Some(lng) = patch.lng {
            self.lng = Some(lng);
        }
    }
}

/// Resolves the active location from a list: the flagged default if one
/// exists, else the first entry, else none.
#[must_use]
pub fn resolve_active(locations: &[Location]) -> Option<&Location> {
    locations
        .iter()
        .find(|l| l.is_default)
        .or_else(|| locations.first())
}

/// A user-defined folder ("my category") grouping a subset of catalog
/// place ids. Scoped to one user; membership is many-to-many with places.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCategory {
    /// Server-assigned id.
    pub id: i64,
    /// Folder name. Unique per user, compared case-insensitively.
    pub name: String,
    /// Member place ids.
    #[serde(default)]
    pub place_ids: BTreeSet<i64>,
}

impl UserCategory {
    /// Returns `true` if this category's name matches `other` ignoring
    /// ASCII case (the per-user uniqueness rule).
    #[must_use]
    pub fn name_matches(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }
}

/// The persisted cache blob for one identity's locations.
///
/// `active_location_id` is stored separately from the per-entry default
/// flag so that hydration restores exactly what the user last saw, even if
/// the list was persisted mid-mutation by an older build. Unknown fields
/// are ignored on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationsSnapshot {
    /// The full location list, in display order.
    pub locations: Vec<Location>,
    /// Id of the active location at save time, if any.
    pub active_location_id: Option<i64>,
    /// When this snapshot was written.
    pub saved_at: DateTime<Utc>,
}

impl LocationsSnapshot {
    /// Builds a snapshot from a list, resolving the active id with
    /// [`resolve_active`].
    #[must_use]
    pub fn new(locations: Vec<Location>) -> Self {
        let active_location_id = resolve_active(&locations).map(|l| l.id);
        Self {
            locations,
            active_location_id,
            saved_at: Utc::now(),
        }
    }
}
