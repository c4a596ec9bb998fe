//! Canonical-shape normalization for catalog responses.
//!
//! A small closed set of named list shapes is tried in priority order;
//! each shape and each field alias is independently testable instead of
//! being an inline conditional at every call site.

use meetmap_models::{Place, PlaceKind};
use serde_json::Value;

/// The response shapes a place-list endpoint is known to produce,
/// in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// `[{...}, ...]`
    BareArray,
    /// `{"places": [{...}, ...]}`
    PlacesField,
    /// `{"items": [{...}, ...]}`
    ItemsField,
}

impl ListShape {
    /// All shapes, in priority order.
    pub const PRIORITY: &'static [Self] = &[Self::BareArray, Self::PlacesField, Self::ItemsField];

    /// Extracts the element array if `raw` matches this shape.
    #[must_use]
    pub fn extract<'a>(self, raw: &'a Value) -> Option<&'a Vec<Value>> {
        match self {
            Self::BareArray => raw.as_array(),
            Self::PlacesField => raw.get("places")?.as_array(),
            Self::ItemsField => raw.get("items")?.as_array(),
        }
    }
}

/// Field-alias lists, first-present-wins.
const ID_ALIASES: &[&str] = &["id", "placeId", "place_id"];
const NAME_ALIASES: &[&str] = &["name", "placeName", "title"];
const ADDRESS_ALIASES: &[&str] = &["address", "roadAddress", "addr"];
const KIND_ALIASES: &[&str] = &["category", "kind", "placeType"];

/// Normalizes any documented list shape into canonical places.
///
/// Elements without a resolvable id are dropped (logged at debug); an
/// unrecognized top-level shape normalizes to an empty list. Coordinate
/// fields that cannot be resolved come back as `None`, never NaN.
#[must_use]
pub fn normalize_place_list(raw: &Value) -> Vec<Place> {
    let elements = ListShape::PRIORITY
        .iter()
        .find_map(|shape| shape.extract(raw));

    let Some(elements) = elements else {
        log::debug!("Unrecognized place-list shape, treating as empty");
        return Vec::new();
    };

    elements.iter().filter_map(normalize_place).collect()
}

/// Normalizes a single place element, unwrapping a `{"place": {...}}`
/// wrapper if present. Returns `None` when no id can be resolved.
#[must_use]
pub fn normalize_place(raw: &Value) -> Option<Place> {
    let obj = raw.get("place").filter(|v| v.is_object()).unwrap_or(raw);

    let Some(id) = first_i64(obj, ID_ALIASES) else {
        log::debug!("Dropping place element with no resolvable id");
        return None;
    };

    let (lat, lng) = resolve_coordinates(obj);

    Some(Place {
        id,
        name: first_str(obj, NAME_ALIASES).unwrap_or_default(),
        address: first_str(obj, ADDRESS_ALIASES).unwrap_or_default(),
        lat,
        lng,
        kind: resolve_kind(obj),
    })
}

/// Normalizes a membership response into member place ids.
///
/// Accepts any place-list shape (ids are taken from the normalized
/// places), a bare id array `[1, 2, ...]`, or `{"placeIds": [...]}`.
#[must_use]
pub fn normalize_member_ids(raw: &Value) -> Vec<i64> {
    let places = normalize_place_list(raw);
    if !places.is_empty() {
        return places.into_iter().map(|p| p.id).collect();
    }

    let id_array = raw
        .get("placeIds")
        .and_then(Value::as_array)
        .or_else(|| raw.as_array());

    id_array
        .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default()
}

/// Resolves `(lat, lng)` from either alias pair. The pair is resolved
/// together: a `lat` with no matching `lng` (or vice versa) yields
/// `(None, None)` rather than a half-coordinate.
fn resolve_coordinates(obj: &Value) -> (Option<f64>, Option<f64>) {
    for (lat_key, lng_key) in [("lat", "lng"), ("latitude", "longitude")] {
        let lat = number_field(obj, lat_key);
        let lng = number_field(obj, lng_key);
        if let (Some(lat), Some(lng)) = (lat, lng) {
            return (Some(lat), Some(lng));
        }
    }
    (None, None)
}

fn resolve_kind(obj: &Value) -> PlaceKind {
    first_str(obj, KIND_ALIASES)
        .and_then(|s| s.to_ascii_lowercase().parse().ok())
        .unwrap_or(PlaceKind::Other)
}

/// Reads a numeric field that may arrive as a JSON number or a numeric
/// string. Non-finite values are rejected so NaN never enters the model.
fn number_field(obj: &Value, key: &str) -> Option<f64> {
    let value = obj.get(key)?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

fn first_str(obj: &Value, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find_map(|key| obj.get(*key)?.as_str())
        .map(String::from)
}

fn first_i64(obj: &Value, aliases: &[&str]) -> Option<i64> {
    aliases.iter().find_map(|key| {
        let value = obj.get(*key)?;
        match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical_element() -> Value {
        json!({
            "id": 7,
            "name": "Campus Grounds",
            "address": "12 College St",
            "lat": 37.5665,
            "lng": 126.9780,
            "category": "cafe"
        })
    }

    #[test]
    fn four_documented_shapes_normalize_identically() {
        let element = canonical_element();
        let shapes = [
            json!([element]),
            json!({ "places": [element] }),
            json!({ "items": [element] }),
            json!([{ "place": element }]),
        ];

        let expected = normalize_place_list(&shapes[0]);
        assert_eq!(expected.len(), 1);
        for shape in &shapes[1..] {
            assert_eq!(normalize_place_list(shape), expected);
        }
    }

    #[test]
    fn resolves_id_aliases() {
        for key in ["id", "placeId", "place_id"] {
            let raw = json!([{ key: 3, "name": "x" }]);
            assert_eq!(normalize_place_list(&raw)[0].id, 3);
        }
    }

    #[test]
    fn resolves_string_id() {
        let raw = json!([{ "placeId": "42", "name": "x" }]);
        assert_eq!(normalize_place_list(&raw)[0].id, 42);
    }

    #[test]
    fn resolves_name_and_address_aliases() {
        let raw = json!([{
            "place_id": 1,
            "placeName": "Book Nook",
            "roadAddress": "5 Main St"
        }]);
        let place = &normalize_place_list(&raw)[0];
        assert_eq!(place.name, "Book Nook");
        assert_eq!(place.address, "5 Main St");
    }

    #[test]
    fn resolves_latitude_longitude_pair() {
        let raw = json!([{ "id": 1, "latitude": 37.0, "longitude": 127.0 }]);
        let place = &normalize_place_list(&raw)[0];
        assert_eq!(place.lat, Some(37.0));
        assert_eq!(place.lng, Some(127.0));
    }

    #[test]
    fn string_coordinates_parse() {
        let raw = json!([{ "id": 1, "lat": "37.5", "lng": "127.1" }]);
        let place = &normalize_place_list(&raw)[0];
        assert_eq!(place.lat, Some(37.5));
        assert_eq!(place.lng, Some(127.1));
    }

    #[test]
    fn half_coordinates_normalize_to_none() {
        let raw = json!([{ "id": 1, "lat": 37.5 }]);
        let place = &normalize_place_list(&raw)[0];
        assert_eq!(place.lat, None);
        assert_eq!(place.lng, None);
    }

    #[test]
    fn garbage_coordinates_never_become_nan() {
        let raw = json!([{ "id": 1, "lat": "not-a-number", "lng": true }]);
        let place = &normalize_place_list(&raw)[0];
        assert_eq!(place.lat, None);
        assert_eq!(place.lng, None);
    }

    #[test]
    fn elements_without_id_are_dropped() {
        let raw = json!([{ "name": "no id here" }, { "id": 2, "name": "kept" }]);
        let places = normalize_place_list(&raw);
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].id, 2);
    }

    #[test]
    fn unknown_kind_falls_back_to_other() {
        let raw = json!([{ "id": 1, "category": "arcade" }]);
        assert_eq!(normalize_place_list(&raw)[0].kind, PlaceKind::Other);
    }

    #[test]
    fn kind_aliases_resolve() {
        let raw = json!([{ "id": 1, "placeType": "Restaurant" }]);
        assert_eq!(normalize_place_list(&raw)[0].kind, PlaceKind::Restaurant);
    }

    #[test]
    fn unrecognized_top_level_shape_is_empty() {
        assert!(normalize_place_list(&json!({"count": 3})).is_empty());
        assert!(normalize_place_list(&json!("nope")).is_empty());
    }

    #[test]
    fn member_ids_from_place_list() {
        let raw = json!({ "places": [{ "id": 1 }, { "id": 5 }] });
        assert_eq!(normalize_member_ids(&raw), vec![1, 5]);
    }

    #[test]
    fn member_ids_from_bare_id_array() {
        assert_eq!(normalize_member_ids(&json!([3, 9])), vec![3, 9]);
    }

    #[test]
    fn member_ids_from_place_ids_field() {
        assert_eq!(normalize_member_ids(&json!({ "placeIds": [2, 4] })), vec![2, 4]);
    }
}
