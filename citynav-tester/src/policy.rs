//! Scripted navigation policies: automated walkers with known score
//! profiles, used to exercise the harness end to end.

use std::fmt;

use citynav_core::constants::STEP_SIZE_M;
use citynav_core::geo::{LatLon, destination_point, haversine, initial_bearing};
use citynav_core::{Command, Route};

/// Advance to the next route vertex once we are this close to it.
const ADVANCE_RADIUS_M: f64 = 12.0;
/// Issue the finish command once we are this close to the destination.
/// Well inside the grading radius.
const FINISH_RADIUS_M: f64 = 20.0;
/// Headings within this tolerance of the target bearing count as aligned.
const HEADING_TOLERANCE_DEG: f64 = 2.0;

/// The walker's shadow of its own session state. The simulated agent
/// cannot see the harness internals, so the runner replays every command
/// against this pose with the same geometry the session uses.
#[derive(Debug, Clone, Copy)]
pub struct Pose {
    pub position: LatLon,
    pub heading: f64,
}

impl Pose {
    #[must_use]
    pub fn at_route_start(route: &Route) -> Self {
        Self {
            position: route.start(),
            heading: route.start_heading,
        }
    }

    /// Mirror one command's effect on position and heading.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::TurnLeft(deg) => self.heading = (self.heading - deg).rem_euclid(360.0),
            Command::TurnRight(deg) => self.heading = (self.heading + deg).rem_euclid(360.0),
            Command::Forward => {
                self.position = destination_point(self.position, self.heading, STEP_SIZE_M);
            }
            Command::Finish | Command::Noop => {}
        }
    }
}

/// An automated walker. One command per turn, driven only by its own pose.
pub trait NavigationPolicy {
    /// Name used for logging and report rows.
    fn name(&self) -> &'static str;

    /// Produce the next raw command string.
    fn next_command(&mut self, pose: &Pose) -> String;
}

/// Built-in walker profiles for benchmark runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    /// Walk the reference polyline vertex by vertex. Should earn a
    /// near-perfect score.
    FollowRoute,
    /// Head straight for the destination, ignoring the street route.
    /// Reaches the goal but bleeds similarity on bent routes.
    BeeLine,
    /// Finish immediately without moving. Scores zero away from the goal.
    Idle,
    /// Turn in place until the step ceiling fires.
    Spin,
}

impl PolicyKind {
    pub const ALL: [Self; 4] = [Self::FollowRoute, Self::BeeLine, Self::Idle, Self::Spin];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::FollowRoute => "follow-route",
            Self::BeeLine => "bee-line",
            Self::Idle => "idle",
            Self::Spin => "spin",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label() == name)
    }

    #[must_use]
    pub fn create_policy(self, route: &Route) -> Box<dyn NavigationPolicy> {
        match self {
            Self::FollowRoute => Box::new(FollowRoutePolicy::new(route)),
            Self::BeeLine => Box::new(BeeLinePolicy { target: route.end() }),
            Self::Idle => Box::new(IdlePolicy),
            Self::Spin => Box::new(SpinPolicy),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct FollowRoutePolicy {
    vertices: Vec<LatLon>,
    next: usize,
}

impl FollowRoutePolicy {
    fn new(route: &Route) -> Self {
        Self {
            vertices: route.polyline.clone(),
            next: 1.min(route.polyline.len().saturating_sub(1)),
        }
    }
}

impl NavigationPolicy for FollowRoutePolicy {
    fn name(&self) -> &'static str {
        "follow-route"
    }

    fn next_command(&mut self, pose: &Pose) -> String {
        let last = self.vertices.len() - 1;
        while self.next < last
            && haversine(pose.position, self.vertices[self.next]) < ADVANCE_RADIUS_M
        {
            self.next += 1;
        }

        let target = self.vertices[self.next];
        if self.next == last && haversine(pose.position, target) < FINISH_RADIUS_M {
            return "q".to_string();
        }
        steer_towards(pose, target)
    }
}

struct BeeLinePolicy {
    target: LatLon,
}

impl NavigationPolicy for BeeLinePolicy {
    fn name(&self) -> &'static str {
        "bee-line"
    }

    fn next_command(&mut self, pose: &Pose) -> String {
        if haversine(pose.position, self.target) < FINISH_RADIUS_M {
            return "q".to_string();
        }
        steer_towards(pose, self.target)
    }
}

struct IdlePolicy;

impl NavigationPolicy for IdlePolicy {
    fn name(&self) -> &'static str {
        "idle"
    }

    fn next_command(&mut self, _pose: &Pose) -> String {
        "q".to_string()
    }
}

struct SpinPolicy;

impl NavigationPolicy for SpinPolicy {
    fn name(&self) -> &'static str {
        "spin"
    }

    fn next_command(&mut self, _pose: &Pose) -> String {
        "r 90".to_string()
    }
}

/// Turn toward `target` when misaligned, otherwise step forward.
fn steer_towards(pose: &Pose, target: LatLon) -> String {
    let bearing = initial_bearing(pose.position, target);
    let diff = signed_angle(bearing - pose.heading);
    if diff.abs() > HEADING_TOLERANCE_DEG {
        if diff > 0.0 {
            format!("r {diff:.1}")
        } else {
            format!("l {:.1}", -diff)
        }
    } else {
        "f".to_string()
    }
}

/// Normalize an angle difference into `(-180, 180]`.
fn signed_angle(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}
