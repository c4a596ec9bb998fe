//! Generic place-search fallback provider.
//!
//! When the dedicated forward-geocoding endpoint is down or answers
//! garbage, the free-text place search stands in: the query is run as a
//! catalog search and the first result that carries both coordinates is
//! taken.

use meetmap_catalog::shape;
use meetmap_client::ApiClient;
use meetmap_models::{Coordinates, Place};

use crate::{GeocodeError, encode_component};

/// Runs a free-text place search and returns the first result's
/// coordinates, if any result carries a full pair.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request fails.
pub async fn first_coordinates(
    client: &dyn ApiClient,
    path: &str,
    query: &str,
) -> Result<Option<Coordinates>, GeocodeError> {
    Ok(search(client, path, query)
        .await?
        .into_iter()
        .find_map(|p| match (p.lat, p.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        }))
}

/// Runs a free-text place search, normalizing whatever list shape the
/// deployment returns.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request fails.
pub async fn search(
    client: &dyn ApiClient,
    path: &str,
    query: &str,
) -> Result<Vec<Place>, GeocodeError> {
    let url = format!("{path}?query={}", encode_component(query));
    let body = client.get(&url).await?;
    Ok(shape::normalize_place_list(&body))
}
