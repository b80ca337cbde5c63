//! Payoff accumulator

use ordered_float::OrderedFloat;

use crate::core::config::PayoffWeights;
use crate::engine::resolver::{Capture, Tag};

/// Fold one tick's captures and tags into the running payoff
///
/// Tag weights are summed in sorted order, so the result does not depend on
/// the order in which interactions were recorded.
pub fn combine(previous: f64, captures: &[Capture], tags: &[Tag], weights: &PayoffWeights) -> f64 {
    let mut tag_weights: Vec<OrderedFloat<f64>> = tags.iter().map(|t| OrderedFloat(t.weight)).collect();
    tag_weights.sort();
    let tag_total: f64 = tag_weights.iter().map(|w| w.into_inner()).sum();

    previous + weights.tag_weight * tag_total - weights.capture_weight * captures.len() as f64
}
