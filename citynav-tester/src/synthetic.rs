//! Offline stand-ins for the two external collaborators, so benchmark
//! runs need no network and stay fully deterministic.

use std::sync::atomic::{AtomicU32, Ordering};

use citynav_core::geo::{LatLon, haversine};
use citynav_core::session::ImageBytes;
use citynav_core::{
    DirectionsProvider, Leg, ProviderError, RenderError, RoutePlan, RouteQuery, SceneRenderer,
    polyline,
};

/// Synthetic street-grid directions: every leg travels north-south first,
/// then east-west, like a Manhattan block walk. Addresses resolve inside
/// the target region so generated candidates pass validation.
pub struct GridDirections;

fn grid_address(point: LatLon) -> String {
    format!("{point} Manhattan, New York, NY 10001, USA")
}

impl DirectionsProvider for GridDirections {
    fn route(&self, query: &RouteQuery) -> Result<Option<RoutePlan>, ProviderError> {
        let mut stops = vec![query.origin];
        stops.extend(query.waypoints.iter().copied());
        stops.push(query.destination);

        let mut legs = Vec::with_capacity(stops.len() - 1);
        let mut path = vec![query.origin];
        for pair in stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let corner = LatLon::new(b.lat, a.lon);
            let distance_m = haversine(a, corner) + haversine(corner, b);
            if corner != a && corner != b {
                path.push(corner);
            }
            path.push(b);
            legs.push(Leg {
                start_address: grid_address(a),
                end_address: grid_address(b),
                distance_m,
                start_location: a,
                end_location: b,
            });
        }

        Ok(Some(RoutePlan {
            legs,
            encoded_polyline: polyline::encode(&path),
        }))
    }
}

/// Renderer producing small tagged byte blobs instead of real imagery.
/// With `fail_every = Some(n)`, every n-th view render fails, which
/// exercises the harness fallback path during long runs.
pub struct StubRenderer {
    view_calls: AtomicU32,
    fail_every: Option<u32>,
}

impl StubRenderer {
    #[must_use]
    pub fn new(fail_every: Option<u32>) -> Self {
        Self {
            view_calls: AtomicU32::new(0),
            fail_every,
        }
    }

    #[must_use]
    pub fn view_render_count(&self) -> u32 {
        self.view_calls.load(Ordering::Relaxed)
    }
}

impl SceneRenderer for StubRenderer {
    fn render_map(
        &self,
        polyline: &[LatLon],
        waypoints: &[LatLon],
    ) -> Result<ImageBytes, RenderError> {
        Ok(format!("map:{}:{}", polyline.len(), waypoints.len()).into_bytes())
    }

    fn render_view(&self, position: LatLon, heading_deg: f64) -> Result<ImageBytes, RenderError> {
        let call = self.view_calls.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(n) = self.fail_every {
            if n > 0 && call % n == 0 {
                return Err(RenderError::Render(format!("induced outage on call {call}")));
            }
        }
        Ok(format!("view:{position}:{heading_deg:.1}").into_bytes())
    }

    fn render_final_map(
        &self,
        polyline: &[LatLon],
        waypoints: &[LatLon],
        walked_path: &[LatLon],
    ) -> Result<ImageBytes, RenderError> {
        Ok(format!(
            "final:{}:{}:{}",
            polyline.len(),
            waypoints.len(),
            walked_path.len()
        )
        .into_bytes())
    }
}
