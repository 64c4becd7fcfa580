//! Coordinate rounding for visitor grouping.
//!
//! Nearby visits are clustered on a 0.01 degree grid (roughly 1 km at the
//! equator). Keys are held as integer hundredths of a degree so equality never
//! depends on comparing rounded floats.

use serde::Serialize;

/// Hundredths of a degree: a two decimal place grid.
const KEY_SCALE: f64 = 100.0;

/// Scale `coord` to hundredths of a degree, rounding half away from zero.
#[allow(clippy::cast_possible_truncation)]
fn to_hundredths(coord: f64) -> i32 {
    (coord * KEY_SCALE).round() as i32
}

/// Whether the pair lies within `[-90, 90] x [-180, 180]`. NaN is rejected.
#[must_use]
pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

/// Rounded (lat, lng) pair identifying one location cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GroupingKey {
    lat_e2: i32,
    lng_e2: i32,
}

impl GroupingKey {
    /// Key for a raw coordinate pair. Callers validate ranges first; the
    /// scaled values of valid coordinates always fit in `i32`.
    #[must_use]
    pub fn from_coords(lat: f64, lng: f64) -> Self {
        Self { lat_e2: to_hundredths(lat), lng_e2: to_hundredths(lng) }
    }

    /// Rebuild a key from its stored integer parts.
    #[must_use]
    pub fn from_parts(lat_e2: i32, lng_e2: i32) -> Self {
        Self { lat_e2, lng_e2 }
    }

    #[must_use]
    pub fn lat_e2(self) -> i32 {
        self.lat_e2
    }

    #[must_use]
    pub fn lng_e2(self) -> i32 {
        self.lng_e2
    }

    /// Rounded latitude in degrees.
    #[must_use]
    pub fn lat(self) -> f64 {
        f64::from(self.lat_e2) / KEY_SCALE
    }

    /// Rounded longitude in degrees.
    #[must_use]
    pub fn lng(self) -> f64 {
        f64::from(self.lng_e2) / KEY_SCALE
    }
}

impl std::fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2},{:.2}", self.lat(), self.lng())
    }
}

#[cfg(test)]
#[path = "geo_test.rs"]
mod tests;
