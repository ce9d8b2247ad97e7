//! Nearest-cell resolution tests against regular and curvilinear grids.

use climate_common::{BoundingBox, ClimateError, GridAxis, PointRegistry};

// ============================================================================
// Regular grids
// ============================================================================

#[test]
fn test_resolved_coordinates_are_grid_coordinates() {
    let axis = GridAxis::regular(vec![40.0, 41.0, 42.0], vec![1.0, 2.0, 3.0]);
    let cell = axis.resolve(41.4, 2.1).unwrap();
    assert_eq!((cell.row, cell.col), (1, 1));
    assert_eq!(cell.lat, 41.0);
    assert_eq!(cell.lon, 2.0);
}

#[test]
fn test_target_outside_grid_clamps_to_edge() {
    let axis = GridAxis::regular(vec![40.0, 41.0, 42.0], vec![1.0, 2.0, 3.0]);
    let cell = axis.resolve(60.0, -10.0).unwrap();
    assert_eq!((cell.row, cell.col), (2, 0));
    assert!(cell.distance > 18.0);
}

#[test]
fn test_resolve_registry_points() {
    let lats: Vec<f64> = (0..40).map(|i| 46.0 + i as f64 * 0.1).collect();
    let lons: Vec<f64> = (0..80).map(|j| -5.0 + j as f64 * 0.1).collect();
    let axis = GridAxis::regular(lats, lons);

    let registry = PointRegistry::default();
    let resolved = axis.resolve_all(registry.all()).unwrap();
    assert_eq!(resolved.len(), 6);
    for (point, cell) in resolved {
        assert!(cell.distance <= (0.05f64 * 0.05 * 2.0).sqrt() + 1e-9, "{}", point.name);
    }
}

// ============================================================================
// Curvilinear grids
// ============================================================================

#[test]
fn test_equal_distance_is_deterministic() {
    // Four cells on a ring around the target, all at distance 0.5.
    let axis = GridAxis::curvilinear(
        2,
        2,
        vec![47.5, 48.0, 48.0, 48.5],
        vec![2.0, 1.5, 2.5, 2.0],
    )
    .unwrap();

    let first = axis.resolve(48.0, 2.0).unwrap();
    assert_eq!((first.row, first.col), (0, 0));
    for _ in 0..100 {
        assert_eq!(axis.resolve(48.0, 2.0).unwrap(), first);
    }
}

#[test]
fn test_zero_cell_grid_is_error() {
    let axis = GridAxis::regular(vec![1.0], vec![]);
    assert!(matches!(axis.resolve(1.0, 1.0), Err(ClimateError::EmptyGrid)));
    assert!(axis.resolve_all(PointRegistry::default().all()).is_err());
}

// ============================================================================
// Tolerance window
// ============================================================================

#[test]
fn test_bbox_around() {
    let bbox = BoundingBox::around(48.0, 1.5, 0.1).unwrap();
    assert!(bbox.contains(48.05, 1.45));
    assert!(!bbox.contains(48.2, 1.5));
    assert!(BoundingBox::around(48.0, 1.5, -1.0).is_err());
    assert!(BoundingBox::around(f64::NAN, 1.5, 0.1).is_err());
}
