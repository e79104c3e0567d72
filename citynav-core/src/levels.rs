//! Level table and level-selector resolution.
//!
//! Levels are the difficulty tiers of the benchmark: target distance and
//! waypoint count grow with the level, and the weight scales the final
//! score.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lowest valid level.
pub const LEVEL_MIN: u8 = 1;
/// Highest valid level.
pub const LEVEL_MAX: u8 = 10;

/// Fixed per-level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Exact length of the reference route after truncation.
    pub target_distance_m: f64,
    /// Intermediate waypoints the route must pass through.
    pub waypoint_count: usize,
    /// Multiplier applied to the raw score.
    pub weight: f64,
}

const fn level(target_distance_m: f64, waypoint_count: usize, weight: f64) -> LevelConfig {
    LevelConfig {
        target_distance_m,
        waypoint_count,
        weight,
    }
}

/// The immutable level table, indexed by `level - 1`.
pub const LEVELS: [LevelConfig; 10] = [
    level(200.0, 0, 1.0),
    level(400.0, 0, 2.0),
    level(600.0, 0, 3.0),
    level(800.0, 0, 4.0),
    level(1000.0, 0, 5.0),
    level(1200.0, 1, 6.0),
    level(1500.0, 1, 7.0),
    level(1800.0, 1, 8.0),
    level(2000.0, 1, 9.0),
    level(2500.0, 1, 10.0),
];

/// Configuration for a level, falling back to level 1 for out-of-range
/// input.
#[must_use]
pub fn level_config(level: u8) -> &'static LevelConfig {
    let idx = if (LEVEL_MIN..=LEVEL_MAX).contains(&level) {
        usize::from(level - 1)
    } else {
        0
    };
    &LEVELS[idx]
}

/// The externally supplied hint for which level a session should run.
///
/// Runners pass this in several shapes: an explicit level number, a
/// zero-based task index, or free text such as "Task description: 3".
/// `resolve` is the single pure function that interprets all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelSelector {
    /// Explicit 1-based level.
    Explicit(i64),
    /// Zero-based task index; level is `index + 1`.
    TaskIndex(i64),
    /// Free text; the first embedded integer is interpreted as a level
    /// when the word "level" appears, otherwise as a task index.
    FreeText(String),
    /// No hint given; the harness picks the default.
    Unspecified,
}

impl LevelSelector {
    /// Resolve the selector to a valid level, or `None` when the hint is
    /// absent or unusable.
    #[must_use]
    pub fn resolve(&self) -> Option<u8> {
        match self {
            Self::Explicit(n) => as_level(*n),
            Self::TaskIndex(idx) => as_level(idx + 1),
            Self::Unspecified => None,
            Self::FreeText(text) => resolve_free_text(text),
        }
    }
}

fn as_level(n: i64) -> Option<u8> {
    (i64::from(LEVEL_MIN)..=i64::from(LEVEL_MAX))
        .contains(&n)
        .then(|| n as u8)
}

fn resolve_free_text(text: &str) -> Option<u8> {
    let lowered = text.trim().to_ascii_lowercase();
    if lowered.is_empty() {
        return None;
    }

    let n = first_integer(&lowered)?;
    if level_word_re().is_match(&lowered) {
        if let Some(level) = as_level(n) {
            return Some(level);
        }
    }
    // Zero-based index first; a raw value already in range is accepted as
    // a level.
    as_level(n + 1).or_else(|| as_level(n))
}

fn first_integer(text: &str) -> Option<i64> {
    integer_re().find(text)?.as_str().parse().ok()
}

fn integer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+").expect("valid literal regex"))
}

fn level_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\blevel\b").expect("valid literal regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances_increase_monotonically() {
        for pair in LEVELS.windows(2) {
            assert!(pair[0].target_distance_m < pair[1].target_distance_m);
            assert!(pair[0].weight < pair[1].weight);
        }
    }

    #[test]
    fn lookup_clamps_to_level_one() {
        assert_eq!(level_config(0), &LEVELS[0]);
        assert_eq!(level_config(11), &LEVELS[0]);
        assert_eq!(level_config(7), &LEVELS[6]);
    }

    #[test]
    fn explicit_level_resolves_in_range_only() {
        assert_eq!(LevelSelector::Explicit(3).resolve(), Some(3));
        assert_eq!(LevelSelector::Explicit(0).resolve(), None);
        assert_eq!(LevelSelector::Explicit(11).resolve(), None);
        assert_eq!(LevelSelector::Explicit(-2).resolve(), None);
    }

    #[test]
    fn task_index_is_zero_based() {
        assert_eq!(LevelSelector::TaskIndex(0).resolve(), Some(1));
        assert_eq!(LevelSelector::TaskIndex(9).resolve(), Some(10));
        assert_eq!(LevelSelector::TaskIndex(10).resolve(), None);
        assert_eq!(LevelSelector::TaskIndex(-1).resolve(), None);
    }

    #[test]
    fn free_text_with_level_word_is_one_based() {
        let sel = LevelSelector::FreeText("please run Level 4".into());
        assert_eq!(sel.resolve(), Some(4));
    }

    #[test]
    fn free_text_without_level_word_is_an_index() {
        let sel = LevelSelector::FreeText("Task description: 0".into());
        assert_eq!(sel.resolve(), Some(1));
        let sel = LevelSelector::FreeText("3".into());
        assert_eq!(sel.resolve(), Some(4));
    }

    #[test]
    fn free_text_index_out_of_range_falls_back_to_level() {
        // "10" as an index would be level 11; accept it as level 10.
        let sel = LevelSelector::FreeText("10".into());
        assert_eq!(sel.resolve(), Some(10));
    }

    #[test]
    fn unusable_text_resolves_to_none() {
        assert_eq!(LevelSelector::FreeText("no numbers here".into()).resolve(), None);
        assert_eq!(LevelSelector::FreeText("  ".into()).resolve(), None);
        assert_eq!(LevelSelector::FreeText("99".into()).resolve(), None);
        assert_eq!(LevelSelector::Unspecified.resolve(), None);
    }

    #[test]
    fn level_word_with_bad_number_falls_through_to_index() {
        // "level 0" is not a valid level, but index 0 maps to level 1.
        let sel = LevelSelector::FreeText("level 0".into());
        assert_eq!(sel.resolve(), Some(1));
    }
}
