//! Geographic coordinates and bounding regions.
//!
//! The padding math matches MapLibre's `LngLat#toBounds`, so a derived
//! region lines up with what a map view would compute for the same point.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    /// Creates a coordinate without validation.
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Creates a coordinate, rejecting non-finite values and latitudes
    /// outside `[-90, 90]`.
    pub fn validated(lng: f64, lat: f64) -> Result<Self, ValidationError> {
        if !lng.is_finite() || !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::InvalidCoordinate { lng, lat });
        }
        Ok(Self { lng, lat })
    }

    /// Region extending `radius_meters` around this point in every direction.
    ///
    /// A radius of zero yields a degenerate region containing only the point.
    #[must_use]
    pub fn to_bounds(&self, radius_meters: f64) -> LngLatBounds {
        let earth_circumference = 2.0 * PI * EARTH_RADIUS_METERS;
        let lat_accuracy = 360.0 * radius_meters / earth_circumference;
        let lng_accuracy = lat_accuracy / (PI / 180.0 * self.lat).cos();

        LngLatBounds::new(
            Self::new(self.lng - lng_accuracy, self.lat - lat_accuracy),
            Self::new(self.lng + lng_accuracy, self.lat + lat_accuracy),
        )
    }
}

impl fmt::Display for LngLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LngLat({}, {})", self.lng, self.lat)
    }
}

/// An axis-aligned region given by its south-west and north-east corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLatBounds {
    pub sw: LngLat,
    pub ne: LngLat,
}

impl LngLatBounds {
    /// Creates a region from its corners. Corners are taken as given.
    #[must_use]
    pub const fn new(sw: LngLat, ne: LngLat) -> Self {
        Self { sw, ne }
    }

    /// Degenerate region covering a single point.
    #[must_use]
    pub const fn from_point(point: LngLat) -> Self {
        Self { sw: point, ne: point }
    }

    /// Smallest region enclosing both `self` and `other`.
    #[must_use]
    pub fn extend(&self, other: &Self) -> Self {
        Self {
            sw: LngLat::new(self.sw.lng.min(other.sw.lng), self.sw.lat.min(other.sw.lat)),
            ne: LngLat::new(self.ne.lng.max(other.ne.lng), self.ne.lat.max(other.ne.lat)),
        }
    }

    /// Returns true if `point` lies inside or on the edge of this region.
    #[must_use]
    pub fn contains(&self, point: LngLat) -> bool {
        (self.sw.lng..=self.ne.lng).contains(&point.lng)
            && (self.sw.lat..=self.ne.lat).contains(&point.lat)
    }

    #[must_use]
    pub const fn north_west(&self) -> LngLat {
        LngLat::new(self.sw.lng, self.ne.lat)
    }

    #[must_use]
    pub const fn south_east(&self) -> LngLat {
        LngLat::new(self.ne.lng, self.sw.lat)
    }

    #[must_use]
    pub fn center(&self) -> LngLat {
        LngLat::new(
            (self.sw.lng + self.ne.lng) / 2.0,
            (self.sw.lat + self.ne.lat) / 2.0,
        )
    }

    /// Longitude span in degrees.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.ne.lng - self.sw.lng
    }

    /// Latitude span in degrees.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.ne.lat - self.sw.lat
    }
}

impl fmt::Display for LngLatBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LngLatBounds({}, {})", self.sw, self.ne)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AACHEN: LngLat = LngLat::new(6.083611, 50.775555);

    #[test]
    fn test_to_bounds_pads_point() {
        let bounds = AACHEN.to_bounds(500.0);
        assert!(bounds.contains(AACHEN));
        assert!(bounds.width() > 0.0);
        assert!(bounds.height() > 0.0);

        // ~0.0045 degrees of latitude for 500 m
        assert!((bounds.height() / 2.0 - 0.004_496_6).abs() < 1e-6);
        // longitude degrees widen with latitude
        assert!(bounds.width() > bounds.height());
    }

    #[test]
    fn test_to_bounds_zero_radius_is_degenerate() {
        let bounds = AACHEN.to_bounds(0.0);
        assert_eq!(bounds, LngLatBounds::from_point(AACHEN));
    }

    #[test]
    fn test_extend_is_union() {
        let a = LngLatBounds::new(LngLat::new(0.0, 0.0), LngLat::new(1.0, 1.0));
        let b = LngLatBounds::new(LngLat::new(-1.0, 0.5), LngLat::new(0.5, 2.0));
        let u = a.extend(&b);
        assert_eq!(u.sw, LngLat::new(-1.0, 0.0));
        assert_eq!(u.ne, LngLat::new(1.0, 2.0));
        assert_eq!(u, b.extend(&a));
    }

    #[test]
    fn test_corners() {
        let b = LngLatBounds::new(LngLat::new(1.0, 2.0), LngLat::new(3.0, 4.0));
        assert_eq!(b.north_west(), LngLat::new(1.0, 4.0));
        assert_eq!(b.south_east(), LngLat::new(3.0, 2.0));
        assert_eq!(b.center(), LngLat::new(2.0, 3.0));
    }

    #[test]
    fn test_validated_rejects_bad_latitude() {
        assert!(LngLat::validated(0.0, 91.0).is_err());
        assert!(LngLat::validated(f64::NAN, 0.0).is_err());
        assert!(LngLat::validated(-71.057083, 42.361145).is_ok());
    }
}
