//! Catalog fetch operations over the endpoint-variant chains.
//!
//! Every chained fetch walks its registered variants in priority order;
//! the first HTTP success is normalized and returned. A chain where all
//! variants fail is reported as [`CatalogError::Unavailable`] so callers
//! never mistake an unreachable catalog for an empty one.

use std::collections::BTreeSet;

use meetmap_client::ApiClient;
use meetmap_models::{Place, PlaceDraft, UserCategory};
use serde_json::Value;

use crate::{CatalogError, registry, shape};

/// Fetches the places of a catalog category, trying each endpoint
/// variant in priority order.
///
/// # Errors
///
/// Returns [`CatalogError::Unavailable`] when every variant fails.
pub async fn places_of_category(
    client: &dyn ApiClient,
    category_id: i64,
) -> Result<Vec<Place>, CatalogError> {
    let raw = fetch_chain(client, "places_of_category", category_id).await?;
    Ok(shape::normalize_place_list(&raw))
}

/// Fetches the member place ids of a user-defined category, using the
/// same chain mechanism as [`places_of_category`].
///
/// # Errors
///
/// Returns [`CatalogError::Unavailable`] when every variant fails.
pub async fn category_members(
    client: &dyn ApiClient,
    category_id: i64,
) -> Result<BTreeSet<i64>, CatalogError> {
    let raw = fetch_chain(client, "user_category_members", category_id).await?;
    Ok(shape::normalize_member_ids(&raw).into_iter().collect())
}

/// Fetches the user's category folders.
///
/// # Errors
///
/// Returns [`CatalogError::Client`] if the request fails.
pub async fn user_categories(client: &dyn ApiClient) -> Result<Vec<UserCategory>, CatalogError> {
    let raw = client.get("/my-categories").await?;
    let list = raw
        .get("categories")
        .and_then(Value::as_array)
        .or_else(|| raw.as_array())
        .cloned()
        .unwrap_or_default();

    Ok(list
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect())
}

/// Creates a catalog place from a draft and returns the normalized
/// server record. Drafts without coordinates are valid — a geocode miss
/// never blocks the save.
///
/// # Errors
///
/// Returns [`CatalogError::Client`] if the request fails, or
/// [`CatalogError::Normalization`] if the response has no resolvable
/// place in it.
pub async fn create_place(
    client: &dyn ApiClient,
    draft: &PlaceDraft,
) -> Result<Place, CatalogError> {
    let body = serde_json::to_value(draft).map_err(|e| CatalogError::Normalization {
        message: format!("draft serialization failed: {e}"),
    })?;
    let raw = client.post("/places", &body).await?;

    shape::normalize_place(&raw).ok_or_else(|| CatalogError::Normalization {
        message: "create-place response had no resolvable place".to_string(),
    })
}

/// Walks a chain's variants in priority order, returning the first
/// successful raw response.
async fn fetch_chain(
    client: &dyn ApiClient,
    operation: &'static str,
    id: i64,
) -> Result<Value, CatalogError> {
    let chain = registry::chain(operation);

    for variant in chain.ordered_variants() {
        let path = variant.path_for(id);
        match client.get(&path).await {
            Ok(raw) => {
                log::debug!("{operation}: variant '{}' answered", variant.id);
                return Ok(raw);
            }
            Err(e) => {
                log::warn!("{operation}: variant '{}' ({path}) failed: {e}", variant.id);
            }
        }
    }

    log::error!("{operation}: all endpoint variants failed for id {id}");
    Err(CatalogError::Unavailable { operation })
}
