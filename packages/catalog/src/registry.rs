//! Compile-time registry of endpoint fallback chains.
//!
//! Each operation whose backend shape drifts across deployments is
//! defined in a TOML file under `endpoints/`, listing its path variants
//! in priority order. The registry embeds these at compile time and
//! exposes them via [`all_chains`] and [`chain`]. The same mechanism
//! serves both the catalog-category fetch and the user-category
//! membership fetch, so the two fallback chains stay in one place.

use serde::Deserialize;

/// An operation's ordered list of endpoint variants.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointChain {
    /// Unique operation identifier (e.g., `"places_of_category"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Path variants to try.
    pub variants: Vec<EndpointVariant>,
}

/// One endpoint variant within a chain.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointVariant {
    /// Variant identifier (e.g., `"sub_resource"`).
    pub id: String,
    /// Try order — lower values run first.
    pub priority: u32,
    /// Path template; `{id}` is replaced with the resource id.
    pub path: String,
}

impl EndpointVariant {
    /// Renders the variant's path for a concrete resource id.
    #[must_use]
    pub fn path_for(&self, id: i64) -> String {
        self.path.replace("{id}", &id.to_string())
    }
}

impl EndpointChain {
    /// Returns the variants sorted by priority (ascending).
    #[must_use]
    pub fn ordered_variants(&self) -> Vec<&EndpointVariant> {
        let mut variants: Vec<&EndpointVariant> = self.variants.iter().collect();
        variants.sort_by_key(|v| v.priority);
        variants
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const CHAIN_TOMLS: &[(&str, &str)] = &[
    (
        "places_of_category",
        include_str!("../endpoints/places_of_category.toml"),
    ),
    (
        "user_category_members",
        include_str!("../endpoints/user_category_members.toml"),
    ),
];

#[cfg(test)]
const EXPECTED_CHAIN_COUNT: usize = 2;

/// Returns all endpoint chains.
///
/// # Panics
///
/// Panics if any embedded TOML config is malformed (the configs are
/// compiled in, so this is caught by the test suite).
#[must_use]
pub fn all_chains() -> Vec<EndpointChain> {
    CHAIN_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse endpoint chain '{name}': {e}"))
        })
        .collect()
}

/// Returns the chain for the given operation id.
///
/// # Panics
///
/// Panics if the operation id is not registered — chains are addressed
/// by compile-time constants, so a miss is a programming error.
#[must_use]
pub fn chain(operation: &str) -> EndpointChain {
    all_chains()
        .into_iter()
        .find(|c| c.id == operation)
        .unwrap_or_else(|| panic!("No endpoint chain registered for '{operation}'"))
}
