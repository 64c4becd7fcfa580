use super::*;

#[test]
fn key_rounds_to_two_places() {
    let key = GroupingKey::from_coords(37.7749, -122.4194);
    assert_eq!((key.lat_e2(), key.lng_e2()), (3777, -12242));
    assert!((key.lat() - 37.77).abs() < 1e-9);
    assert!((key.lng() - -122.42).abs() < 1e-9);
    assert_eq!(GroupingKey::from_coords(0.0, 0.0), GroupingKey::from_parts(0, 0));
}

#[test]
fn key_rounds_half_away_from_zero() {
    assert_eq!(to_hundredths(0.125), 13);
    assert_eq!(to_hundredths(-0.125), -13);
    assert_eq!(to_hundredths(1.5), 150);
}

#[test]
fn points_near_a_cell_center_share_its_key() {
    let centers = [(3777, -12242), (0, 0), (-3386, 15121), (9000, -18000), (-4512, 1)];
    let offsets = [-0.0049, -0.002, 0.0, 0.002, 0.0049];
    for (lat_e2, lng_e2) in centers {
        let expected = GroupingKey::from_parts(lat_e2, lng_e2);
        for dlat in offsets {
            for dlng in offsets {
                let key = GroupingKey::from_coords(expected.lat() + dlat, expected.lng() + dlng);
                assert_eq!(key, expected, "offset ({dlat}, {dlng}) from {expected}");
            }
        }
    }
}

#[test]
fn rounding_is_idempotent() {
    for (lat, lng) in [(37.7749, -122.4194), (-33.8688, 151.2093), (89.999, 179.999), (-0.004, 0.006)] {
        let key = GroupingKey::from_coords(lat, lng);
        assert_eq!(GroupingKey::from_coords(key.lat(), key.lng()), key);
    }
}

#[test]
fn distinct_cells_get_distinct_keys() {
    assert_ne!(GroupingKey::from_coords(37.7749, -122.4194), GroupingKey::from_coords(37.7851, -122.4194));
    assert_ne!(GroupingKey::from_coords(37.7749, -122.4194), GroupingKey::from_coords(37.7749, -122.4094));
}

#[test]
fn validity_bounds_are_inclusive() {
    assert!(is_valid_coordinate(90.0, 180.0));
    assert!(is_valid_coordinate(-90.0, -180.0));
    assert!(!is_valid_coordinate(90.01, 0.0));
    assert!(!is_valid_coordinate(0.0, -180.5));
    assert!(!is_valid_coordinate(f64::NAN, 0.0));
}

#[test]
fn display_renders_rounded_degrees() {
    assert_eq!(GroupingKey::from_coords(37.7749, -122.4194).to_string(), "37.77,-122.42");
}
