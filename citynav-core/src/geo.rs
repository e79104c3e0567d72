//! Great-circle geometry primitives shared by route generation, movement,
//! and scoring. All functions are pure.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters, used for every scored distance so that
/// score values stay consistent across levels.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Earth radius in kilometers used by the direct geodesic (movement) formula.
pub const EARTH_RADIUS_KM: f64 = 6_378.1;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl std::fmt::Display for LatLon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lon)
    }
}

/// Great-circle distance in meters between two points.
#[must_use]
pub fn haversine(a: LatLon, b: LatLon) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Minimum distance in meters from `point` to the segment `a`-`b`.
///
/// The projection parameter is computed in planar lat/lon space while the
/// final magnitude uses the spherical formula. Accurate at the segment
/// lengths of a city-scale route; not valid near the poles or across the
/// antimeridian.
#[must_use]
pub fn point_to_segment_distance(point: LatLon, a: LatLon, b: LatLon) -> f64 {
    let dx = b.lat - a.lat;
    let dy = b.lon - a.lon;
    if dx == 0.0 && dy == 0.0 {
        return haversine(point, a);
    }

    let t = (((point.lat - a.lat) * dx + (point.lon - a.lon) * dy) / (dx * dx + dy * dy))
        .clamp(0.0, 1.0);
    let nearest = LatLon::new(a.lat + t * dx, a.lon + t * dy);
    haversine(point, nearest)
}

/// Point reached from `origin` after traveling `distance_m` meters along
/// the compass bearing `bearing_deg` (spherical direct geodesic).
#[must_use]
pub fn destination_point(origin: LatLon, bearing_deg: f64, distance_m: f64) -> LatLon {
    let bearing = bearing_deg.to_radians();
    let angular = (distance_m / 1000.0) / EARTH_RADIUS_KM;

    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    LatLon::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Initial compass bearing from `a` to `b`, in degrees within `[0, 360)`.
#[must_use]
pub fn initial_bearing(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let x = d_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    (x.atan2(y).to_degrees() + 360.0) % 360.0
}
