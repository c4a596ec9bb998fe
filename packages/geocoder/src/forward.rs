//! Dedicated forward/reverse geocoding endpoint client.
//!
//! The primary provider: a backend endpoint that takes an address query
//! and answers with a single coordinate pair, or a point and answers
//! with an address. Coordinate fields may arrive as numbers or numeric
//! strings depending on the deployment.

use meetmap_client::ApiClient;
use meetmap_models::Coordinates;
use serde_json::Value;

use crate::{GeocodeError, encode_component};

/// Geocodes a single address via the dedicated endpoint.
///
/// Returns `Ok(None)` when the endpoint answers without a usable
/// numeric coordinate pair, which the adapter treats as "try the next
/// provider".
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request fails.
pub async fn geocode(
    client: &dyn ApiClient,
    path: &str,
    address: &str,
) -> Result<Option<Coordinates>, GeocodeError> {
    let url = format!("{path}?address={}", encode_component(address));
    let body = client.get(&url).await?;
    Ok(parse_coordinates(&body))
}

/// Resolves a point to an address via the endpoint's `/reverse` route.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request fails.
pub async fn reverse(
    client: &dyn ApiClient,
    path: &str,
    coords: Coordinates,
) -> Result<Option<String>, GeocodeError> {
    let url = format!("{path}/reverse?lat={}&lng={}", coords.lat, coords.lng);
    let body = client.get(&url).await?;
    Ok(parse_address(&body))
}

/// Parses a coordinate pair from the response body. Accepts `lat`/`lng`
/// or `latitude`/`longitude`, as numbers or numeric strings. Anything
/// non-finite or half-present is a miss.
fn parse_coordinates(body: &Value) -> Option<Coordinates> {
    for (lat_key, lng_key) in [("lat", "lng"), ("latitude", "longitude")] {
        let lat = body.get(lat_key).and_then(numeric);
        let lng = body.get(lng_key).and_then(numeric);
        if let (Some(lat), Some(lng)) = (lat, lng) {
            return Some(Coordinates { lat, lng });
        }
    }
    None
}

/// Parses an address string from a reverse-geocode response: a bare
/// string body, or the first present of `address`/`roadAddress`/`addr`.
fn parse_address(body: &Value) -> Option<String> {
    if let Some(s) = body.as_str() {
        let s = s.trim();
        return (!s.is_empty()).then(|| s.to_string());
    }
    ["address", "roadAddress", "addr"]
        .iter()
        .find_map(|key| body.get(*key)?.as_str())
        .map(String::from)
}

fn numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_numeric_pair() {
        let coords = parse_coordinates(&json!({ "lat": 37.5, "lng": 127.0 })).unwrap();
        assert!((coords.lat - 37.5).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_string_pair_with_alternate_keys() {
        let coords =
            parse_coordinates(&json!({ "latitude": "37.5", "longitude": "127.0" })).unwrap();
        assert!((coords.lng - 127.0).abs() < f64::EPSILON);
    }

    #[test]
    fn half_pair_is_a_miss() {
        assert!(parse_coordinates(&json!({ "lat": 37.5 })).is_none());
    }

    #[test]
    fn non_numeric_is_a_miss() {
        assert!(parse_coordinates(&json!({ "lat": "n/a", "lng": "n/a" })).is_none());
    }

    #[test]
    fn parses_reverse_address_aliases() {
        assert_eq!(
            parse_address(&json!({ "roadAddress": "12 College St" })),
            Some("12 College St".to_string())
        );
        assert_eq!(
            parse_address(&json!("5 Main St")),
            Some("5 Main St".to_string())
        );
    }

    #[test]
    fn empty_reverse_body_is_a_miss() {
        assert!(parse_address(&json!({})).is_none());
        assert!(parse_address(&json!("  ")).is_none());
    }
}
