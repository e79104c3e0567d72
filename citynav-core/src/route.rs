//! Deterministic procedural route generation.
//!
//! A private ChaCha20 stream seeded from the session seed proposes
//! candidate origins and random-walk waypoints; the directions provider
//! turns them into a routed path, which is validated and truncated to the
//! exact level target length. Two calls with the same seed and the same
//! provider responses yield identical routes, which is the benchmark's
//! fairness guarantee.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::constants::{
    FIRST_LEG_GUARD_M, MAX_GENERATION_ATTEMPTS, METERS_PER_DEGREE, REGION_MARKERS, WALKABLE_BOUNDS,
};
use crate::geo::{LatLon, haversine, initial_bearing};
use crate::levels::level_config;
use crate::polyline;
use crate::{DirectionsProvider, RouteQuery, TravelMode};

/// Waypoint list: start, intermediates, truncated end. Never more than
/// three entries at the current level table.
pub type WaypointList = SmallVec<[LatLon; 4]>;

/// A generated reference route. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Truncated polyline; cumulative length equals the target within
    /// sub-meter rounding.
    pub polyline: Vec<LatLon>,
    /// Snapped waypoints including start and truncated end.
    pub waypoints: WaypointList,
    /// Initial bearing from the first to the second polyline point.
    pub start_heading: f64,
    /// Exact length the level demands.
    pub target_distance_m: f64,
    /// Recomputed length of the truncated polyline.
    pub reported_distance_m: f64,
    /// Raw per-leg distance sum from the provider, before truncation.
    pub provider_distance_m: f64,
}

impl Route {
    /// Start position. The polyline always has at least two points by
    /// construction.
    #[must_use]
    pub fn start(&self) -> LatLon {
        self.polyline[0]
    }

    /// Destination after truncation.
    #[must_use]
    pub fn end(&self) -> LatLon {
        self.polyline[self.polyline.len() - 1]
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerateError {
    /// No candidate satisfied the region, distance, and waypoint checks.
    /// Terminal for the session; callers must not retry indefinitely.
    #[error("no valid route found for level {level} after {attempts} attempts")]
    Exhausted { level: u8, attempts: u32 },
}

/// Generate the reference route for a level, fully determined by `seed`.
///
/// # Errors
///
/// Returns [`GenerateError::Exhausted`] when no candidate route passes
/// validation within the attempt budget.
pub fn generate_route<D: DirectionsProvider>(
    provider: &D,
    level: u8,
    seed: u64,
) -> Result<Route, GenerateError> {
    let cfg = level_config(level);
    let target = cfg.target_distance_m;
    let walk_points = cfg.waypoint_count + 1;
    let mut rng = ChaCha20Rng::seed_from_u64(seed);

    for attempt in 0..MAX_GENERATION_ATTEMPTS {
        let origin = LatLon::new(
            rng.gen_range(WALKABLE_BOUNDS.lat_min..WALKABLE_BOUNDS.lat_max),
            rng.gen_range(WALKABLE_BOUNDS.lon_min..WALKABLE_BOUNDS.lon_max),
        );

        let Some(mut intermediates) = random_walk(&mut rng, origin, walk_points, target) else {
            continue;
        };
        let Some(destination) = intermediates.pop() else {
            continue;
        };

        let query = RouteQuery {
            origin,
            destination,
            waypoints: intermediates,
            mode: TravelMode::Driving,
            avoid_highways: true,
        };
        let plan = match provider.route(&query) {
            Ok(Some(plan)) if !plan.legs.is_empty() => plan,
            Ok(_) => {
                log::debug!("attempt {attempt}: provider returned no route");
                continue;
            }
            Err(err) => {
                log::warn!("attempt {attempt}: directions provider failed: {err}");
                continue;
            }
        };

        let legs = &plan.legs;
        let last = &legs[legs.len() - 1];
        if !in_target_region(&legs[0].start_address) || !in_target_region(&last.end_address) {
            continue;
        }
        if legs[..legs.len() - 1]
            .iter()
            .any(|leg| !in_target_region(&leg.end_address))
        {
            continue;
        }

        // The provider-reported length only has to be long enough to cut
        // down to the target; truncation enforces the exact length.
        let provider_distance_m: f64 = legs.iter().map(|leg| leg.distance_m).sum();
        if provider_distance_m < target {
            continue;
        }

        let mut waypoints: WaypointList = SmallVec::new();
        waypoints.push(legs[0].start_location);
        for leg in &legs[..legs.len() - 1] {
            waypoints.push(leg.end_location);
        }
        waypoints.push(last.end_location);

        let decoded = match polyline::decode(&plan.encoded_polyline) {
            Ok(points) => points,
            Err(err) => {
                log::warn!("attempt {attempt}: bad overview polyline: {err}");
                continue;
            }
        };
        if polyline_length_m(&decoded) < target {
            continue;
        }

        // With intermediate waypoints, the cut must land past the first
        // leg or the truncated route would skip them.
        if cfg.waypoint_count >= 1
            && legs.len() >= 2
            && target <= legs[0].distance_m + FIRST_LEG_GUARD_M
        {
            continue;
        }

        let (truncated, reported_distance_m) = truncate_to_length(&decoded, target);
        let Some(&end) = truncated.last() else {
            continue;
        };
        if let Some(slot) = waypoints.last_mut() {
            *slot = end;
        }

        let start_heading = if truncated.len() > 1 {
            initial_bearing(truncated[0], truncated[1])
        } else {
            0.0
        };

        return Ok(Route {
            polyline: truncated,
            waypoints,
            start_heading,
            target_distance_m: target,
            reported_distance_m,
            provider_distance_m,
        });
    }

    Err(GenerateError::Exhausted {
        level,
        attempts: MAX_GENERATION_ATTEMPTS,
    })
}

/// Random-walk `count` points from `origin`, each offset uniformly so the
/// expected total length matches the level target. `None` when any point
/// leaves the walkable bounds; the draws consumed so far stay consumed,
/// which keeps the stream position part of the deterministic contract.
fn random_walk(
    rng: &mut ChaCha20Rng,
    origin: LatLon,
    count: usize,
    target_m: f64,
) -> Option<Vec<LatLon>> {
    let deg_offset = (target_m / count as f64) / METERS_PER_DEGREE;
    let mut points = Vec::with_capacity(count);
    let mut cursor = origin;

    for _ in 0..count {
        let lat_off = rng.gen_range(-deg_offset..deg_offset);
        let lon_off = rng.gen_range(-deg_offset..deg_offset);
        let next = LatLon::new(cursor.lat + lat_off, cursor.lon + lon_off);
        if !WALKABLE_BOUNDS.contains(next) {
            return None;
        }
        points.push(next);
        cursor = next;
    }

    Some(points)
}

fn in_target_region(address: &str) -> bool {
    REGION_MARKERS.iter().any(|marker| address.contains(marker))
}

/// Cumulative great-circle length of a polyline in meters.
#[must_use]
pub fn polyline_length_m(points: &[LatLon]) -> f64 {
    points.windows(2).map(|pair| haversine(pair[0], pair[1])).sum()
}

/// Crop `points` to `target_m` meters, interpolating the crossing point
/// on the segment where the cumulative length passes the target. Returns
/// the cropped polyline and its recomputed length (may differ from the
/// target by sub-meter rounding).
#[must_use]
pub fn truncate_to_length(points: &[LatLon], target_m: f64) -> (Vec<LatLon>, f64) {
    if points.len() < 2 {
        return (points.to_vec(), 0.0);
    }
    if target_m <= 0.0 {
        return (vec![points[0]], 0.0);
    }

    let mut out = vec![points[0]];
    let mut traveled = 0.0;
    for pair in points.windows(2) {
        let (p1, p2) = (pair[0], pair[1]);
        let seg = haversine(p1, p2);
        if seg <= 0.0 {
            continue;
        }
        if traveled + seg >= target_m {
            let t = ((target_m - traveled) / seg).clamp(0.0, 1.0);
            out.push(LatLon::new(
                p1.lat + (p2.lat - p1.lat) * t,
                p1.lon + (p2.lon - p1.lon) * t,
            ));
            break;
        }
        out.push(p2);
        traveled += seg;
    }

    let length = polyline_length_m(&out);
    (out, length)
}
