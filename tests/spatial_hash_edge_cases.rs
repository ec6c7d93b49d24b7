use ecosim_core::spatial_hash::SpatialHash;
use ecosim_data::Position;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn point() -> impl Strategy<Value = Position> {
    (0.0f64..400.0, 0.0f64..300.0).prop_map(|(x, y)| Position::new(x, y))
}

proptest! {
    #[test]
    fn prop_query_matches_brute_force(
        points in prop::collection::vec(point(), 0..200),
        center in point(),
        radius in 0.0f64..120.0,
        cell_size in 1.0f64..60.0,
    ) {
        let mut hash = SpatialHash::new(cell_size, 400, 300);
        for (i, p) in points.iter().enumerate() {
            prop_assert!(hash.insert(i as u64, *p));
        }
        let found: BTreeSet<u64> = hash.query_radius(&center, radius).into_iter().collect();
        let expected: BTreeSet<u64> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.distance_sq(&center) <= radius * radius)
            .map(|(i, _)| i as u64)
            .collect();
        prop_assert_eq!(&found, &expected);
        prop_assert_eq!(hash.count_nearby(&center, radius), expected.len());
        prop_assert!(hash.is_consistent());
    }

    #[test]
    fn prop_updates_keep_index_consistent(
        moves in prop::collection::vec((0u64..20, point()), 1..300),
    ) {
        let mut hash = SpatialHash::new(25.0, 400, 300);
        for (id, p) in &moves {
            hash.update(*id, *p);
        }
        prop_assert!(hash.is_consistent());
        for (id, _) in &moves {
            let Some(at) = hash.position_of(*id) else {
                return Err(TestCaseError::fail(format!("{id} missing")));
            };
            prop_assert!(hash.query_radius(&at, 0.0).contains(id));
        }
    }
}

#[test]
fn test_insert_query_remove_query() {
    let mut hash = SpatialHash::new(10.0, 100, 100);
    let p = Position::new(42.0, 17.0);
    assert!(hash.insert(7, p));
    assert_eq!(hash.query_radius(&p, 1.0), vec![7]);
    assert!(hash.remove(7));
    assert!(hash.query_radius(&p, 1.0).is_empty());
    assert!(!hash.remove(7));
    assert!(hash.is_empty());
}

#[test]
fn test_non_finite_queries_return_nothing() {
    let mut hash = SpatialHash::new(10.0, 100, 100);
    hash.insert(1, Position::new(5.0, 5.0));
    assert!(hash
        .query_radius(&Position::new(f64::NAN, 5.0), 10.0)
        .is_empty());
    assert!(hash
        .query_radius(&Position::new(5.0, 5.0), f64::INFINITY)
        .is_empty());
    assert!(hash.query_radius(&Position::new(5.0, 5.0), -1.0).is_empty());
    assert_eq!(hash.count_nearby(&Position::new(5.0, f64::NAN), 10.0), 0);
}

#[test]
fn test_zero_radius_hits_exact_point_only() {
    let mut hash = SpatialHash::new(10.0, 100, 100);
    hash.insert(1, Position::new(10.0, 10.0));
    hash.insert(2, Position::new(10.0, 10.5));
    assert_eq!(hash.query_radius(&Position::new(10.0, 10.0), 0.0), vec![1]);
}

#[test]
fn test_entities_beyond_the_edge_are_still_found() {
    let mut hash = SpatialHash::new(10.0, 100, 100);
    hash.insert(1, Position::new(-3.0, 50.0));
    hash.insert(2, Position::new(104.0, 104.0));
    assert_eq!(hash.query_radius(&Position::new(1.0, 50.0), 5.0), vec![1]);
    assert_eq!(hash.query_radius(&Position::new(99.0, 99.0), 8.0), vec![2]);
    assert!(hash.is_consistent());
}

#[test]
fn test_degenerate_cell_size_falls_back() {
    for size in [0.0, -4.0, f64::NAN] {
        let mut hash = SpatialHash::new(size, 20, 20);
        assert_eq!(hash.cell_size, 1.0);
        hash.insert(3, Position::new(19.5, 19.5));
        assert_eq!(hash.query_radius(&Position::new(19.0, 19.0), 1.0), vec![3]);
    }
}
