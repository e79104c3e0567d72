//! Session orchestrator: the `start`/`act`/`result` lifecycle over a
//! concurrent session registry.
//!
//! Every per-session failure resolves to a well-formed observation or
//! report with an error field. One broken session must never abort a
//! multi-task benchmark run.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::constants::{PLACEHOLDER_PNG, SEED_BASE, STEP_SIZE_M};
use crate::levels::{LEVEL_MAX, LevelSelector, level_config};
use crate::route::generate_route;
use crate::score::score_walk;
use crate::session::{ImageBytes, Session, parse_command};
use crate::{DirectionsProvider, SceneRenderer};

/// One turn's worth of output for the agent under evaluation.
#[derive(Debug, Clone)]
pub struct Observation {
    pub prompt: String,
    /// Two entries once a session exists: the static overview map, then
    /// the current first-person view. Empty on terminal failures.
    pub images: Vec<ImageBytes>,
    pub done: bool,
    pub info: BTreeMap<String, Value>,
    pub error: Option<String>,
}

impl Observation {
    fn terminal_failure(message: &str) -> Self {
        Self {
            prompt: String::new(),
            images: Vec::new(),
            done: true,
            info: BTreeMap::new(),
            error: Some(message.to_string()),
        }
    }
}

/// Final graded outcome of a session, returned exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Raw score scaled by the level weight.
    pub score: f64,
    pub raw_score: f64,
    pub level: u8,
    pub weight: f64,
    pub destination_reached: bool,
    pub distance_to_target_m: f64,
    pub avg_deviation_m: f64,
    /// Rendered comparison map, when the renderer cooperated.
    #[serde(skip)]
    pub final_map: Option<ImageBytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScoreReport {
    fn failure(message: &str) -> Self {
        Self {
            score: 0.0,
            raw_score: 0.0,
            level: 0,
            weight: 0.0,
            destination_reached: false,
            distance_to_target_m: 0.0,
            avg_deviation_m: 0.0,
            final_map: None,
            error: Some(message.to_string()),
        }
    }
}

/// The benchmark harness: session registry plus the two external
/// collaborators.
///
/// Sessions are independent; the registry supports concurrent
/// insert/lookup/remove across distinct session ids without cross-session
/// locking. The auto-cycle counter is per-instance state, not shared
/// process state.
pub struct NavHarness<D, R> {
    directions: D,
    renderer: R,
    sessions: DashMap<String, Session>,
    task_counter: AtomicU32,
    auto_cycle_levels: bool,
}

impl<D, R> NavHarness<D, R>
where
    D: DirectionsProvider,
    R: SceneRenderer,
{
    #[must_use]
    pub fn new(directions: D, renderer: R) -> Self {
        Self {
            directions,
            renderer,
            sessions: DashMap::new(),
            task_counter: AtomicU32::new(0),
            auto_cycle_levels: false,
        }
    }

    /// When enabled, sessions without a usable level hint cycle through
    /// levels 1..=10 instead of defaulting to level 1.
    #[must_use]
    pub fn with_auto_cycle(mut self, enabled: bool) -> Self {
        self.auto_cycle_levels = enabled;
        self
    }

    /// Number of live sessions in the registry.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn pick_level(&self, selector: &LevelSelector) -> u8 {
        if let Some(level) = selector.resolve() {
            return level;
        }
        if self.auto_cycle_levels {
            let n = self.task_counter.fetch_add(1, Ordering::Relaxed);
            (n % u32::from(LEVEL_MAX)) as u8 + 1
        } else {
            1
        }
    }

    /// Begin a session: generate the deterministic route for the level,
    /// initialize state, and produce the first observation.
    ///
    /// Route-generation failure is terminal for the session and leaves no
    /// registry entry.
    pub fn start(&self, session_id: &str, selector: &LevelSelector) -> Observation {
        let level = self.pick_level(selector);
        let seed = SEED_BASE + u64::from(level);
        log::info!("session {session_id}: starting level {level} (seed {seed})");

        let route = match generate_route(&self.directions, level, seed) {
            Ok(route) => route,
            Err(err) => {
                log::warn!("session {session_id}: {err}");
                return Observation::terminal_failure("Failed to generate route");
            }
        };

        let mut session = Session::new(level, route);
        let map = self
            .renderer
            .render_map(&session.route.polyline, &session.route.waypoints)
            .unwrap_or_else(|err| {
                log::warn!("session {session_id}: map render failed: {err}");
                PLACEHOLDER_PNG.to_vec()
            });
        let view = self
            .renderer
            .render_view(session.position, session.heading)
            .unwrap_or_else(|err| {
                log::warn!("session {session_id}: view render failed: {err}");
                PLACEHOLDER_PNG.to_vec()
            });
        session.cached_map = Some(map.clone());
        session.cached_view = Some(view.clone());

        let marker = final_marker_label(session.route.waypoints.len());
        let prompt = format!(
            "You are a spatial navigation agent in NYC. You have been dropped at Point A. \
             Your goal is to reach the final red marker (Point {marker}). \
             Output ONE command: 'f' (move {STEP_SIZE_M:.0}m), 'l <deg>', 'r <deg>', \
             or 'q' (finish)."
        );
        let mut info = BTreeMap::new();
        info.insert("level".to_string(), json!(level));

        self.sessions.insert(session_id.to_string(), session);

        Observation {
            prompt,
            images: vec![map, view],
            done: false,
            info,
            error: None,
        }
    }

    /// Apply one raw command to a session and produce the next
    /// observation. A transient view-rendering failure falls back to the
    /// cached view or a placeholder and never fails the session.
    pub fn act(&self, session_id: &str, raw_command: &str) -> Observation {
        // The render call may block; the registry shard lock must not be
        // held across it, or a stalled render in one session stalls every
        // session on the same shard.
        let (reason, position, heading, map, cached_view) = {
            let Some(mut entry) = self.sessions.get_mut(session_id) else {
                return Observation::terminal_failure("Session not found");
            };
            let session = entry.value_mut();
            let reason = session.apply(parse_command(raw_command));
            (
                reason,
                session.position,
                session.heading,
                session
                    .cached_map
                    .clone()
                    .unwrap_or_else(|| PLACEHOLDER_PNG.to_vec()),
                session.cached_view.clone(),
            )
        };

        let mut info = BTreeMap::new();
        if let Some(reason) = reason {
            info.insert("reason".to_string(), json!(reason.message()));
        }

        let view = match self.renderer.render_view(position, heading) {
            Ok(bytes) => {
                if let Some(mut entry) = self.sessions.get_mut(session_id) {
                    entry.value_mut().cached_view = Some(bytes.clone());
                }
                bytes
            }
            Err(err) => {
                log::warn!("session {session_id}: view render failed: {err}");
                info.insert(
                    "warning".to_string(),
                    json!("View render failed; using fallback image"),
                );
                cached_view.unwrap_or_else(|| PLACEHOLDER_PNG.to_vec())
            }
        };

        Observation {
            prompt: format!("Heading: {heading:.0}. Command?"),
            images: vec![map, view],
            done: reason.is_some(),
            info,
            error: None,
        }
    }

    /// Score a session and remove it from the registry (read-once).
    pub fn result(&self, session_id: &str) -> ScoreReport {
        let Some((_, session)) = self.sessions.remove(session_id) else {
            return ScoreReport::failure("No session state");
        };

        let breakdown = score_walk(&session.walked_path, &session.route.polyline);
        let weight = level_config(session.level).weight;
        let final_map = self
            .renderer
            .render_final_map(
                &session.route.polyline,
                &session.route.waypoints,
                &session.walked_path,
            )
            .map_err(|err| log::warn!("session {session_id}: final map render failed: {err}"))
            .ok();

        ScoreReport {
            score: breakdown.total * weight,
            raw_score: breakdown.total,
            level: session.level,
            weight,
            destination_reached: breakdown.destination_bonus > 0.0,
            distance_to_target_m: breakdown.distance_to_target_m,
            avg_deviation_m: breakdown.avg_deviation_m,
            final_map,
            error: None,
        }
    }
}

/// Marker letter of the final waypoint: A for the start, then B, C, ...
fn final_marker_label(waypoint_count: usize) -> char {
    let idx = waypoint_count.saturating_sub(1);
    u8::try_from(idx)
        .ok()
        .filter(|&i| i < 26)
        .map_or('Z', |i| char::from(b'A' + i))
}
