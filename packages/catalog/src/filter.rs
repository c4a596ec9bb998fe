//! Two-dimensional visibility filtering for the map.
//!
//! The type filter runs first and a selected user category only ever
//! narrows within it. That ordering is deliberate: the type dropdown
//! stays meaningful while a personal folder is active, because the
//! folder can never add places from outside the chosen type.

use meetmap_models::{Place, PlaceFilter, UserCategory};

/// Computes the visible place set for the map.
///
/// 1. Keep places passing the type filter (`All` passes everything).
/// 2. If a user category is selected, intersect with its membership set
///    by place id.
#[must_use]
pub fn visible_places(
    catalog: &[Place],
    type_filter: PlaceFilter,
    category: Option<&UserCategory>,
) -> Vec<Place> {
    catalog
        .iter()
        .filter(|p| match type_filter {
            PlaceFilter::All => true,
            PlaceFilter::Kind(kind) => p.kind == kind,
        })
        .filter(|p| category.is_none_or(|c| c.place_ids.contains(&p.id)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetmap_models::PlaceKind;
    use std::collections::BTreeSet;

    fn place(id: i64, kind: PlaceKind) -> Place {
        Place {
            id,
            name: format!("place-{id}"),
            address: String::new(),
            lat: None,
            lng: None,
            kind,
        }
    }

    fn category(ids: &[i64]) -> UserCategory {
        UserCategory {
            id: 99,
            name: "mine".to_string(),
            place_ids: ids.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    fn ids(places: &[Place]) -> Vec<i64> {
        places.iter().map(|p| p.id).collect()
    }

    fn catalog() -> Vec<Place> {
        vec![
            place(1, PlaceKind::Cafe),
            place(2, PlaceKind::Restaurant),
            place(3, PlaceKind::Cafe),
            place(4, PlaceKind::Convenience),
        ]
    }

    #[test]
    fn all_with_no_category_passes_everything() {
        let visible = visible_places(&catalog(), PlaceFilter::All, None);
        assert_eq!(ids(&visible), vec![1, 2, 3, 4]);
    }

    #[test]
    fn kind_filter_narrows_by_taxonomy() {
        let visible = visible_places(&catalog(), PlaceFilter::Kind(PlaceKind::Cafe), None);
        assert_eq!(ids(&visible), vec![1, 3]);
    }

    #[test]
    fn category_intersects_within_type_filter() {
        let cat = category(&[1, 2]);
        let visible = visible_places(&catalog(), PlaceFilter::Kind(PlaceKind::Cafe), Some(&cat));
        // Place 2 is in the folder but not a cafe; it must not appear.
        assert_eq!(ids(&visible), vec![1]);
    }

    #[test]
    fn category_never_adds_outside_the_type_filter() {
        let cat = category(&[2]);
        let visible = visible_places(&catalog(), PlaceFilter::Kind(PlaceKind::Cafe), Some(&cat));
        assert!(visible.is_empty());
    }

    #[test]
    fn combined_filter_is_subset_of_each_single_filter() {
        let cat = category(&[1, 2, 3]);
        let combined = ids(&visible_places(
            &catalog(),
            PlaceFilter::Kind(PlaceKind::Cafe),
            Some(&cat),
        ));
        let by_type = ids(&visible_places(
            &catalog(),
            PlaceFilter::Kind(PlaceKind::Cafe),
            None,
        ));
        let by_category = ids(&visible_places(&catalog(), PlaceFilter::All, Some(&cat)));

        assert!(combined.iter().all(|id| by_type.contains(id)));
        assert!(combined.iter().all(|id| by_category.contains(id)));
    }

    #[test]
    fn empty_category_hides_everything() {
        let cat = category(&[]);
        let visible = visible_places(&catalog(), PlaceFilter::All, Some(&cat));
        assert!(visible.is_empty());
    }
}
