//! Geographic primitives: drawable points and raw coordinates as received from the API.
//!
//! The backend sends coordinates as independently nullable `lat`/`lng` fields. A
//! [`Coordinate`] keeps that raw shape; [`Coordinate::drawable`] is the single place that
//! decides whether it can be placed on the map surface.

use std::fmt;

use h3o::LatLng;
use serde::{Deserialize, Serialize};

const MAX_LAT: f64 = 90.0;
const MAX_LNG: f64 = 180.0;

/// A validated WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Build a point, returning `None` for NaN/infinite or out-of-range components.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let ll = LatLng::new(lat, lng).ok()?;
        if ll.lat().abs() > MAX_LAT || ll.lng().abs() > MAX_LNG {
            return None;
        }
        Some(Self { lat, lng })
    }

    /// Great-circle distance in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        match (
            LatLng::new(self.lat, self.lng),
            LatLng::new(other.lat, other.lng),
        ) {
            (Ok(a), Ok(b)) => a.distance_km(b),
            _ => f64::NAN,
        }
    }

    /// Exact bit pattern of both components, used for fingerprinting.
    pub(crate) fn to_bits(self) -> [u64; 2] {
        [self.lat.to_bits(), self.lng.to_bits()]
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

/// A coordinate pair as delivered by the data source; either side may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    pub fn drawable(&self) -> Option<GeoPoint> {
        GeoPoint::new(self.lat?, self.lng?)
    }
}

impl From<GeoPoint> for Coordinate {
    fn from(point: GeoPoint) -> Self {
        Self::new(point.lat, point.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_finite_and_out_of_range() {
        assert!(GeoPoint::new(f64::NAN, 9.7).is_none());
        assert!(GeoPoint::new(4.05, f64::INFINITY).is_none());
        assert!(GeoPoint::new(91.0, 0.0).is_none());
        assert!(GeoPoint::new(0.0, -180.5).is_none());
        assert!(GeoPoint::new(-90.0, 180.0).is_some());
    }

    #[test]
    fn coordinate_with_missing_side_is_not_drawable() {
        let only_lat = Coordinate {
            lat: Some(4.05),
            lng: None,
        };
        assert!(only_lat.drawable().is_none());
        assert!(Coordinate::missing().drawable().is_none());
        assert_eq!(
            Coordinate::new(4.05, 9.70).drawable(),
            GeoPoint::new(4.05, 9.70)
        );
    }

    #[test]
    fn null_fields_deserialize_as_missing() {
        let parsed: Coordinate = serde_json::from_str(r#"{"lat": null}"#).expect("parse");
        assert_eq!(parsed, Coordinate::missing());
    }

    #[test]
    fn distance_between_nearby_points() {
        let a = GeoPoint::new(4.05, 9.70).expect("point");
        let b = GeoPoint::new(4.06, 9.70).expect("point");
        let d = a.distance_km(&b);
        // One hundredth of a degree of latitude is roughly 1.11 km.
        assert!((d - 1.11).abs() < 0.01, "distance was {d}");
        assert_eq!(a.distance_km(&a), 0.0);
    }
}
