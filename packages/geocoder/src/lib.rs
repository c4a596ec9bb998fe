#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding adapter for the meetmap engine.
//!
//! Resolves free-text addresses (and reversed points) to coordinates
//! using a multi-provider strategy configured via TOML files in
//! `services/`:
//!
//! 1. **Dedicated forward-geocoding endpoint** (priority 1).
//! 2. **Generic place search** (priority 2) — fallback when the forward
//!    endpoint is unavailable or answers without usable numbers; the
//!    first search result's coordinates are taken.
//!
//! Providers are loaded from the [`service_registry`] and executed in
//! priority order. A total miss is `None`, **not** an error: callers
//! proceed without coordinates (saving a named location with an address
//! but no coordinates yet is valid) and may correct them later.

pub mod forward;
pub mod place_search;
pub mod service_registry;

use meetmap_client::ApiClient;
use meetmap_models::Coordinates;
use thiserror::Error;

use service_registry::ProviderConfig;

/// Errors from a single geocoding provider call.
///
/// These never escape the adapter's public functions; a failing provider
/// is logged and the next one is tried.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] meetmap_client::ClientError),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// Resolves a free-text address to coordinates, walking the enabled
/// providers in priority order.
///
/// Returns `None` when no provider yields a usable coordinate — a miss,
/// not a failure.
pub async fn forward_geocode(client: &dyn ApiClient, address: &str) -> Option<Coordinates> {
    let query = address.trim();
    if query.is_empty() {
        return None;
    }

    for service in service_registry::enabled_services() {
        let result = match &service.provider {
            ProviderConfig::Forward { path } => forward::geocode(client, path, query).await,
            ProviderConfig::PlaceSearch { path } => {
                place_search::first_coordinates(client, path, query).await
            }
        };

        match result {
            Ok(Some(coords)) => {
                log::debug!("Geocoded {query:?} via provider '{}'", service.id);
                return Some(coords);
            }
            Ok(None) => {
                log::debug!("Provider '{}' had no match for {query:?}", service.id);
            }
            Err(e) => {
                log::warn!("Provider '{}' failed for {query:?}: {e}", service.id);
            }
        }
    }

    None
}

/// Resolves a point to an address string via the forward provider's
/// reverse endpoint. Returns `None` on a miss or provider failure.
pub async fn reverse_geocode(client: &dyn ApiClient, coords: Coordinates) -> Option<String> {
    for service in service_registry::enabled_services() {
        if let ProviderConfig::Forward { path } = &service.provider {
            match forward::reverse(client, path, coords).await {
                Ok(found) => return found,
                Err(e) => {
                    log::warn!("Reverse geocode via '{}' failed: {e}", service.id);
                }
            }
        }
    }
    None
}

/// Percent-encodes a string for use as a URL query value.
#[must_use]
pub fn encode_component(raw: &str) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                write!(out, "%{byte:02X}").unwrap();
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetmap_client::mock::MockApiClient;
    use serde_json::json;

    #[tokio::test]
    async fn forward_endpoint_wins_when_it_answers() {
        let mock = MockApiClient::new();
        mock.on(
            "GET",
            "/geocode?address=12%20College%20St",
            json!({ "lat": 37.55, "lng": 126.97 }),
        );

        let coords = forward_geocode(&mock, "12 College St").await.unwrap();
        assert!((coords.lat - 37.55).abs() < f64::EPSILON);
        assert_eq!(
            mock.call_count("GET", "/places/search?query=12%20College%20St"),
            0
        );
    }

    #[tokio::test]
    async fn falls_back_to_place_search_on_http_failure() {
        let mock = MockApiClient::new();
        mock.on_status("GET", "/geocode?address=library", 503);
        mock.on(
            "GET",
            "/places/search?query=library",
            json!([{ "id": 1, "lat": 37.1, "lng": 127.2 }]),
        );

        let coords = forward_geocode(&mock, "library").await.unwrap();
        assert!((coords.lng - 127.2).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn falls_back_when_forward_result_is_non_numeric() {
        let mock = MockApiClient::new();
        mock.on(
            "GET",
            "/geocode?address=library",
            json!({ "lat": "unknown", "lng": null }),
        );
        mock.on(
            "GET",
            "/places/search?query=library",
            json!([{ "id": 1, "lat": 37.1, "lng": 127.2 }]),
        );

        assert!(forward_geocode(&mock, "library").await.is_some());
    }

    #[tokio::test]
    async fn total_miss_is_none_not_error() {
        let mock = MockApiClient::new();
        assert!(forward_geocode(&mock, "nowhere at all").await.is_none());
    }

    #[tokio::test]
    async fn blank_query_short_circuits() {
        let mock = MockApiClient::new();
        assert!(forward_geocode(&mock, "   ").await.is_none());
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn encode_component_escapes_reserved_bytes() {
        assert_eq!(encode_component("a b&c"), "a%20b%26c");
        assert_eq!(encode_component("safe-chars_1.2~"), "safe-chars_1.2~");
    }
}
