//! CityNav Benchmark Core
//!
//! Deterministic street-navigation benchmark for evaluating agents. Given
//! a level, the core generates a reproducible reference route through a
//! fixed city region, replays the agent's discrete movement commands
//! against in-memory geographic state, and grades route fidelity and
//! progress. External collaborators (the directions provider and the
//! scene renderer) are traits so the core stays transport-free.

pub mod config;
pub mod constants;
pub mod env;
pub mod geo;
pub mod levels;
pub mod polyline;
pub mod route;
pub mod score;
pub mod session;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::LatLon;

// Re-export commonly used types
pub use config::{ConfigError, MAPS_API_KEY_VAR, require_credential};
pub use constants::{BoundingBox, SEED_BASE, STEP_SIZE_M, WALKABLE_BOUNDS};
pub use env::{NavHarness, Observation, ScoreReport};
pub use levels::{LEVEL_MAX, LEVEL_MIN, LEVELS, LevelConfig, LevelSelector, level_config};
pub use route::{GenerateError, Route, WaypointList, generate_route};
pub use score::{ScoreBreakdown, score_walk};
pub use session::{Command, ImageBytes, Session, StopReason, parse_command};

/// Routing profile requested from the directions provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Driving,
}

/// One directions request: origin, destination, and intermediate
/// waypoints the route must pass through, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteQuery {
    pub origin: LatLon,
    pub destination: LatLon,
    pub waypoints: Vec<LatLon>,
    pub mode: TravelMode,
    pub avoid_highways: bool,
}

/// One leg of a routed path, between consecutive stop points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub start_address: String,
    pub end_address: String,
    pub distance_m: f64,
    pub start_location: LatLon,
    pub end_location: LatLon,
}

/// A routed path as returned by the directions provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub legs: Vec<Leg>,
    /// Overview polyline in the encoded wire format (precision 5).
    pub encoded_polyline: String,
}

/// Failure from the directions collaborator. Treated as a rejected
/// generation attempt, never as a fatal error.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("directions request failed: {0}")]
    Request(String),
}

/// Failure from the rendering collaborator. Always recovered locally via
/// cached or placeholder images.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("image render failed: {0}")]
    Render(String),
}

/// External routing collaborator.
pub trait DirectionsProvider {
    /// Request a routed path for the query. `Ok(None)` means the provider
    /// found no route.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying request fails; the route
    /// generator logs it and moves on to the next candidate attempt.
    fn route(&self, query: &RouteQuery) -> Result<Option<RoutePlan>, ProviderError>;
}

/// External map/scene rendering collaborator. Images are opaque bytes.
pub trait SceneRenderer {
    /// Render the overview map with the reference route and its markers.
    ///
    /// # Errors
    ///
    /// Returns an error when rendering fails; callers fall back to a
    /// cached image or a placeholder.
    fn render_map(&self, polyline: &[LatLon], waypoints: &[LatLon])
    -> Result<ImageBytes, RenderError>;

    /// Render the first-person view at a position and heading.
    ///
    /// # Errors
    ///
    /// Returns an error when rendering fails; callers fall back to a
    /// cached image or a placeholder.
    fn render_view(&self, position: LatLon, heading_deg: f64) -> Result<ImageBytes, RenderError>;

    /// Render the final comparison map including the walked path.
    ///
    /// # Errors
    ///
    /// Returns an error when rendering fails; the score report simply
    /// omits the image.
    fn render_final_map(
        &self,
        polyline: &[LatLon],
        waypoints: &[LatLon],
        walked_path: &[LatLon],
    ) -> Result<ImageBytes, RenderError>;
}
