//! Multi-component scoring: destination bonus, path similarity, and the
//! projection-based progress gate.

use serde::{Deserialize, Serialize};

use crate::constants::{
    ANTI_EXPLOIT_RADIUS_M, DEST_BONUS_POINTS, DEST_BONUS_RADIUS_M, SIMILARITY_FULL_FADE_M,
    SIMILARITY_POINTS,
};
use crate::geo::{LatLon, haversine, point_to_segment_distance};

/// Graded score for one walked path against a reference polyline.
/// Derived once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Destination bonus plus gated similarity, in `[0, 100]`.
    pub total: f64,
    /// 30 when the walk ended near the destination, else 0.
    pub destination_bonus: f64,
    /// Similarity credit after the progress gate.
    pub similarity: f64,
    /// Distance from the final walked point to the route end.
    pub distance_to_target_m: f64,
    /// Mean nearest-segment deviation over all walked points.
    pub avg_deviation_m: f64,
}

/// Score a walked path against the reference polyline. Empty input on
/// either side yields the all-zero breakdown.
#[must_use]
pub fn score_walk(walked: &[LatLon], reference: &[LatLon]) -> ScoreBreakdown {
    let (Some(&final_pos), Some(&target)) = (walked.last(), reference.last()) else {
        return ScoreBreakdown::default();
    };

    let distance_to_target_m = haversine(final_pos, target);
    let destination_bonus = if distance_to_target_m < DEST_BONUS_RADIUS_M {
        DEST_BONUS_POINTS
    } else {
        0.0
    };

    let avg_deviation_m = average_deviation(walked, reference);
    let base_similarity =
        SIMILARITY_POINTS * (1.0 - avg_deviation_m / SIMILARITY_FULL_FADE_M).max(0.0);

    let mut progress = progress_ratio(final_pos, reference);
    // Anti-exploit: barely moving earns no progress credit.
    if haversine(final_pos, reference[0]) < ANTI_EXPLOIT_RADIUS_M {
        progress = 0.0;
    }
    // Reaching the destination always counts as full progress.
    if destination_bonus > 0.0 {
        progress = 1.0;
    }

    let similarity = base_similarity * progress;
    ScoreBreakdown {
        total: destination_bonus + similarity,
        destination_bonus,
        similarity,
        distance_to_target_m,
        avg_deviation_m,
    }
}

fn average_deviation(walked: &[LatLon], reference: &[LatLon]) -> f64 {
    let total: f64 = walked
        .iter()
        .map(|&point| nearest_segment_distance(point, reference))
        .sum();
    total / walked.len() as f64
}

/// Minimum distance from `point` to any segment of `reference`. Infinite
/// for a segmentless reference, which zeroes the similarity credit.
fn nearest_segment_distance(point: LatLon, reference: &[LatLon]) -> f64 {
    reference
        .windows(2)
        .map(|seg| point_to_segment_distance(point, seg[0], seg[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Fraction of the reference length covered by the walker's closest
/// approach: full preceding segments plus the projection parameter on the
/// closest segment, over the total length.
fn progress_ratio(final_pos: LatLon, reference: &[LatLon]) -> f64 {
    let mut best_distance = f64::INFINITY;
    let mut best_segment = None;
    let mut best_t = 0.0;

    for (idx, seg) in reference.windows(2).enumerate() {
        let (a, b) = (seg[0], seg[1]);
        let dx = b.lat - a.lat;
        let dy = b.lon - a.lon;
        let t = if dx == 0.0 && dy == 0.0 {
            0.0
        } else {
            (((final_pos.lat - a.lat) * dx + (final_pos.lon - a.lon) * dy) / (dx * dx + dy * dy))
                .clamp(0.0, 1.0)
        };
        let nearest = LatLon::new(a.lat + t * dx, a.lon + t * dy);
        let d = haversine(final_pos, nearest);
        if d < best_distance {
            best_distance = d;
            best_segment = Some(idx);
            best_t = t;
        }
    }

    let mut covered = 0.0;
    let mut total = 0.0;
    for (idx, seg) in reference.windows(2).enumerate() {
        let seg_len = haversine(seg[0], seg[1]);
        match best_segment {
            Some(best) if idx < best => covered += seg_len,
            Some(best) if idx == best => covered += seg_len * best_t,
            _ => {}
        }
        total += seg_len;
    }

    if total == 0.0 {
        total = 1.0;
    }
    covered / total
}
