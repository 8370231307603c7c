//! Click-stream scoring
//!
//! Computes navigation-quality metrics for one participant's attempt at one
//! task, following the standard tree-testing formulas (directness, lostness).

use crate::types::{ClickAction, ClickEntry, NavigationMetrics};
use std::collections::HashSet;

/// Scorer for a single response's click history
pub struct ClickStreamScorer;

impl ClickStreamScorer {
    /// Score a click sequence against the task's optimal path length.
    ///
    /// `_target_node_id` is the task's primary target; the formulas do not use it.
    pub fn score(
        clicks: &[ClickEntry],
        optimal_path_length: usize,
        _target_node_id: &str,
    ) -> NavigationMetrics {
        let total_clicks = clicks.len();
        let unique_nodes_visited = count_unique_nodes(clicks);

        let directness = compute_directness(optimal_path_length, total_clicks);
        let lostness = compute_lostness(optimal_path_length, unique_nodes_visited, total_clicks);
        let first_click_node_id = clicks.first().map(|c| c.node_id.clone());
        let backtrack_count = count_backtracks(clicks);
        let avg_hesitation = compute_avg_hesitation_ms(clicks);

        NavigationMetrics {
            total_clicks,
            unique_nodes_visited,
            directness: round_to(directness, 2),
            lostness: round_to(lostness, 2),
            first_click_node_id,
            backtrack_count,
            avg_hesitation_ms: round_half_up(avg_hesitation) as i64,
        }
    }
}

fn count_unique_nodes(clicks: &[ClickEntry]) -> usize {
    clicks
        .iter()
        .map(|c| c.node_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Compute directness
///
/// Formula: `S / R`, 0 when there are no clicks. Not clamped: fewer clicks
/// than path nodes gives a value above 1.
fn compute_directness(optimal_path_length: usize, total_clicks: usize) -> f64 {
    if total_clicks == 0 {
        return 0.0;
    }
    optimal_path_length as f64 / total_clicks as f64
}

/// Compute lostness
///
/// Formula: `sqrt((N/S - 1)^2 + (R/N - 1)^2)`
/// Where S is the optimal path length, N the unique nodes visited and R the
/// total clicks. 0 = perfectly efficient navigation.
fn compute_lostness(optimal_path_length: usize, unique_nodes: usize, total_clicks: usize) -> f64 {
    if optimal_path_length == 0 || unique_nodes == 0 {
        return 0.0;
    }
    let s = optimal_path_length as f64;
    let n = unique_nodes as f64;
    let r = total_clicks as f64;

    ((n / s - 1.0).powi(2) + (r / n - 1.0).powi(2)).sqrt()
}

fn count_backtracks(clicks: &[ClickEntry]) -> usize {
    clicks
        .iter()
        .filter(|c| c.action == ClickAction::Back)
        .count()
}

/// Mean gap between consecutive clicks in milliseconds.
///
/// Gaps are not clamped, so out-of-order timestamps pull the mean down.
fn compute_avg_hesitation_ms(clicks: &[ClickEntry]) -> f64 {
    if clicks.len() < 2 {
        return 0.0;
    }
    // widened: a gap between extreme timestamps does not fit in i64
    let total: i128 = clicks
        .windows(2)
        .map(|pair| i128::from(pair[1].timestamp_ms) - i128::from(pair[0].timestamp_ms))
        .sum();

    total as f64 / (clicks.len() - 1) as f64
}

/// Round to the nearest integer, ties toward positive infinity
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Round to `decimals` places, ties toward positive infinity
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    round_half_up(value * factor) / factor
}
