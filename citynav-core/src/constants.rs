//! Centralized tuning constants for the CityNav benchmark core.
//!
//! These values define the deterministic math of the benchmark. Keeping
//! them together ensures that scoring and generation can only change via
//! reviewed code changes, never through external assets.

use crate::geo::LatLon;

// Movement -------------------------------------------------------------------
/// Meters covered by one forward command.
pub const STEP_SIZE_M: f64 = 15.0;
/// Degrees turned when a turn command omits its argument.
pub const DEFAULT_TURN_DEG: f64 = 90.0;

/// Step ceiling floor so short levels still permit turning.
pub(crate) const MAX_STEPS_FLOOR: u32 = 120;
/// Multiplier over the perfect-efficiency step count, allowing recovery
/// from wrong turns.
pub(crate) const MAX_STEPS_MULTIPLIER: u32 = 3;

// Route generation -------------------------------------------------------------
/// Fixed offset added to the level number to derive the per-level seed,
/// so every agent at a given level faces the identical course.
pub const SEED_BASE: u64 = 1000;
/// Candidate attempts before route generation gives up. High enough to be
/// extremely likely to find a valid route without unbounded retries.
pub(crate) const MAX_GENERATION_ATTEMPTS: u32 = 100;
/// Approximate meters per degree of latitude, used to size random-walk
/// offsets.
pub(crate) const METERS_PER_DEGREE: f64 = 111_000.0;
/// Margin past the first leg that the truncation point must clear so the
/// truncated route still passes through every intermediate waypoint.
pub(crate) const FIRST_LEG_GUARD_M: f64 = 25.0;

// Scoring ----------------------------------------------------------------------
/// Points awarded for finishing near the destination.
pub(crate) const DEST_BONUS_POINTS: f64 = 30.0;
/// Radius around the destination that earns the bonus.
pub(crate) const DEST_BONUS_RADIUS_M: f64 = 50.0;
/// Maximum points from path similarity.
pub(crate) const SIMILARITY_POINTS: f64 = 70.0;
/// Average deviation at which similarity credit reaches zero.
pub(crate) const SIMILARITY_FULL_FADE_M: f64 = 100.0;
/// Final positions within this radius of the start count as no progress.
pub(crate) const ANTI_EXPLOIT_RADIUS_M: f64 = 5.0;

// Walkable region ---------------------------------------------------------------
/// Axis-aligned lat/lon bounding box. Containment is strict on every edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Whether `point` lies strictly inside the box.
    #[must_use]
    pub fn contains(&self, point: LatLon) -> bool {
        self.lat_min < point.lat
            && point.lat < self.lat_max
            && self.lon_min < point.lon
            && point.lon < self.lon_max
    }
}

/// Safe Manhattan bounds (Chelsea up to UES/UWS, away from the rivers).
pub const WALKABLE_BOUNDS: BoundingBox = BoundingBox {
    lat_min: 40.7300,
    lat_max: 40.7900,
    lon_min: -74.0000,
    lon_max: -73.9600,
};

/// Substrings that must appear in a resolved leg address for the route to
/// count as inside the target region.
pub(crate) const REGION_MARKERS: &[&str] = &["Manhattan", "New York, NY"];

// Rendering fallback --------------------------------------------------------------
/// Minimal valid 1x1 PNG served when no rendered image is available.
/// A transient rendering failure must never fail the session.
pub(crate) const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];
