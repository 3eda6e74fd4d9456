//! Extent validation and serialization tests.

use ogc_common::{check_extent, AxisOrder, CrsCode, Extent, OgcError};

// ============================================================================
// check_extent tests
// ============================================================================

#[test]
fn test_valid_extents_pass() {
    let valid = [
        [-180.0, -90.0, 180.0, 90.0],
        [0.0, 0.0, 0.0, 0.0],
        [-100.0, 40.0, -99.0, 41.0],
        [-20037508.34, -20037508.34, 20037508.34, 20037508.34],
        [5.0, -5.0, 5.0, 5.0],
    ];
    for extent in &valid {
        assert!(check_extent(extent).is_ok(), "{:?} should be valid", extent);
    }
}

#[test]
fn test_inverted_x_rejected() {
    let result = check_extent(&[10.0, 0.0, 5.0, 10.0]);
    assert!(matches!(result, Err(OgcError::MalformedExtent(_))));
}

#[test]
fn test_inverted_y_rejected() {
    let result = check_extent(&[0.0, 10.0, 10.0, 5.0]);
    assert!(matches!(result, Err(OgcError::MalformedExtent(_))));
}

#[test]
fn test_both_axes_inverted_rejected() {
    let result = check_extent(&[10.0, 10.0, 5.0, 5.0]);
    assert!(matches!(result, Err(OgcError::MalformedExtent(_))));
}

#[test]
fn test_non_finite_rejected() {
    assert!(check_extent(&[f64::NAN, 0.0, 1.0, 1.0]).is_err());
    assert!(check_extent(&[0.0, 0.0, f64::INFINITY, 1.0]).is_err());
}

#[test]
fn test_grid_of_orderings() {
    // Every ordering of a pair of distinct values on each axis
    for (a, c) in [(-1.0, 1.0), (1.0, -1.0), (2.0, 2.0)] {
        for (b, d) in [(-3.0, 3.0), (3.0, -3.0), (0.5, 0.5)] {
            let expected_ok = a <= c && b <= d;
            assert_eq!(
                check_extent(&[a, b, c, d]).is_ok(),
                expected_ok,
                "extent {:?}",
                [a, b, c, d]
            );
        }
    }
}

// ============================================================================
// Parsing tests
// ============================================================================

#[test]
fn test_parse_wms_bbox_integer() {
    let bbox = Extent::from_wms_string("0,0,100,100").unwrap();
    assert_eq!(bbox, Extent::new(0.0, 0.0, 100.0, 100.0));
}

#[test]
fn test_parse_wms_bbox_scientific_notation() {
    let bbox = Extent::from_wms_string("1e-6,2e-6,1e6,2e6").unwrap();
    assert!((bbox.min_x - 1e-6).abs() < 1e-10);
    assert!((bbox.max_x - 1e6).abs() < 0.001);
}

#[test]
fn test_parse_wms_bbox_wrong_arity() {
    assert!(Extent::from_wms_string("0,0,100").is_err());
    assert!(Extent::from_wms_string("0,0,100,100,200").is_err());
    assert!(Extent::from_wms_string("").is_err());
}

#[test]
fn test_parse_wms_bbox_invalid_number() {
    let result = Extent::from_wms_string("abc,0,100,100");
    assert!(matches!(result, Err(OgcError::MalformedExtent(_))));
}

#[test]
fn test_parse_wms_bbox_inverted() {
    let result = Extent::from_wms_string("100,0,0,100");
    assert!(matches!(result, Err(OgcError::MalformedExtent(_))));
}

#[test]
fn test_try_from_array() {
    let extent = Extent::try_from([-10.0, -5.0, 10.0, 5.0]).unwrap();
    assert_eq!(extent.to_array(), [-10.0, -5.0, 10.0, 5.0]);
    assert!(Extent::try_from([10.0, -5.0, -10.0, 5.0]).is_err());
}

// ============================================================================
// Axis order tests
// ============================================================================

#[test]
fn test_wms_130_geographic_swaps_axes() {
    let extent = Extent::new(-81.0, -4.5, -66.5, 13.0);
    let order = CrsCode::WGS84.axis_order("1.3.0");
    assert_eq!(extent.to_wms_string(order), "-4.5,-81,13,-66.5");
}

#[test]
fn test_wms_111_geographic_keeps_axes() {
    let extent = Extent::new(-81.0, -4.5, -66.5, 13.0);
    let order = CrsCode::WGS84.axis_order("1.1.1");
    assert_eq!(order, AxisOrder::XY);
    assert_eq!(extent.to_wms_string(order), "-81,-4.5,-66.5,13");
}
