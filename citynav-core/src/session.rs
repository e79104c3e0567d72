//! One navigation session: current position and heading, the accumulated
//! walked path, and the command-driven state transitions.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_TURN_DEG, MAX_STEPS_FLOOR, MAX_STEPS_MULTIPLIER, STEP_SIZE_M};
use crate::geo::{LatLon, destination_point};
use crate::route::Route;

/// Opaque rendered image bytes.
pub type ImageBytes = Vec<u8>;

/// A parsed movement command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `q` - finish the session.
    Finish,
    /// `l [deg]` - rotate counterclockwise.
    TurnLeft(f64),
    /// `r [deg]` - rotate clockwise.
    TurnRight(f64),
    /// `f` - move one step along the current heading.
    Forward,
    /// Unrecognized or malformed input. Consumes a step with no effect;
    /// a malformed agent response must never crash a run.
    Noop,
}

/// Parse a raw command string, case-insensitive and trimmed.
#[must_use]
pub fn parse_command(raw: &str) -> Command {
    let lowered = raw.trim().to_ascii_lowercase();
    let mut parts = lowered.split_whitespace();
    let Some(head) = parts.next() else {
        return Command::Noop;
    };
    let arg = parts.next();

    match head {
        "q" => Command::Finish,
        "f" => Command::Forward,
        "l" => turn_degrees(arg).map_or(Command::Noop, Command::TurnLeft),
        "r" => turn_degrees(arg).map_or(Command::Noop, Command::TurnRight),
        _ => Command::Noop,
    }
}

/// Degrees for a turn command: the default when omitted, `None` when the
/// argument does not parse (the turn is silently ignored).
fn turn_degrees(arg: Option<&str>) -> Option<f64> {
    match arg {
        None => Some(DEFAULT_TURN_DEG),
        Some(text) => text.parse().ok(),
    }
}

/// Why a session reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    AgentFinished,
    MaxStepsExceeded,
}

impl StopReason {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::AgentFinished => "Agent requested finish",
            Self::MaxStepsExceeded => "Max steps exceeded",
        }
    }
}

/// Step ceiling for a target distance: the forward steps needed at
/// perfect efficiency, tripled to allow recovery from wrong turns,
/// floored so short levels still permit turning.
#[must_use]
pub fn max_steps_for(target_distance_m: f64) -> u32 {
    let base = (target_distance_m / STEP_SIZE_M).ceil() as u32;
    (base * MAX_STEPS_MULTIPLIER).max(MAX_STEPS_FLOOR)
}

/// Mutable state of one navigation session.
///
/// Created by `start`, mutated only by `act`, read and destroyed by
/// `result`. The walked path always begins with the route's start
/// position and grows by one entry per forward move.
#[derive(Debug, Clone)]
pub struct Session {
    pub level: u8,
    pub route: Route,
    pub position: LatLon,
    pub heading: f64,
    pub walked_path: Vec<LatLon>,
    /// Total `act` invocations, including turns and the finish command.
    pub step_count: u32,
    pub max_steps: u32,
    pub stop_reason: Option<StopReason>,
    /// Overview map, rendered once at start (static for the session).
    pub cached_map: Option<ImageBytes>,
    /// Last successfully rendered first-person view.
    pub cached_view: Option<ImageBytes>,
}

impl Session {
    #[must_use]
    pub fn new(level: u8, route: Route) -> Self {
        let start = route.start();
        let max_steps = max_steps_for(route.target_distance_m);
        Self {
            level,
            position: start,
            heading: route.start_heading,
            walked_path: vec![start],
            step_count: 0,
            max_steps,
            stop_reason: None,
            cached_map: None,
            cached_view: None,
            route,
        }
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.stop_reason.is_some()
    }

    /// Apply one parsed command and advance the step counter. Returns the
    /// stop reason once the session is terminal.
    ///
    /// The terminal state is absorbing: further calls leave the session
    /// untouched and keep reporting the recorded reason. The step ceiling
    /// takes effect even when the agent finished on the same step.
    pub fn apply(&mut self, command: Command) -> Option<StopReason> {
        if let Some(reason) = self.stop_reason {
            return Some(reason);
        }

        match command {
            Command::Finish => self.stop_reason = Some(StopReason::AgentFinished),
            Command::TurnLeft(deg) => self.heading = wrap_heading(self.heading - deg),
            Command::TurnRight(deg) => self.heading = wrap_heading(self.heading + deg),
            Command::Forward => {
                self.position = destination_point(self.position, self.heading, STEP_SIZE_M);
                self.walked_path.push(self.position);
            }
            Command::Noop => {}
        }

        self.step_count += 1;
        if self.step_count >= self.max_steps {
            self.stop_reason = Some(StopReason::MaxStepsExceeded);
        }
        self.stop_reason
    }
}

fn wrap_heading(deg: f64) -> f64 {
    deg.rem_euclid(360.0)
}
