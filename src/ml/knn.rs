//! Distance-weighted nearest-neighbor yield estimate.

use super::features::PreparedFeatures;
use crate::store::ReferenceRow;

/// Maximum number of neighbors averaged into one estimate.
pub const MAX_NEIGHBORS: usize = 15;
/// Added to each distance before inverting it into a weight.
pub const WEIGHT_EPSILON: f64 = 0.01;
/// Confidence floor for neighbor estimates.
pub const MIN_CONFIDENCE: f64 = 0.6;
/// Confidence ceiling for neighbor estimates.
pub const MAX_CONFIDENCE: f64 = 0.95;

const TEMPERATURE_SCALE: f64 = 25.0;
const RAINFALL_SCALE: f64 = 1500.0;
const HUMIDITY_SCALE: f64 = 50.0;
const SOIL_PH_SCALE: f64 = 2.0;
const NITROGEN_SCALE: f64 = 100.0;
const PHOSPHORUS_SCALE: f64 = 50.0;
const POTASSIUM_SCALE: f64 = 200.0;
// The last two terms divide the squared raw difference.
const INTERACTION_SQUARED_SCALE: f64 = 10_000.0;
const NPK_RATIO_SQUARED_SCALE: f64 = 0.25;

/// A selected reference row and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the row in the retrieved sample.
    pub index: usize,
    pub distance: f64,
    pub observed_yield: f64,
}

/// Neighbor estimate before any crop adjustment.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborEstimate {
    /// Inverse-distance weighted mean of the selected yields.
    pub weighted_yield: f64,
    /// Confidence in `[MIN_CONFIDENCE, MAX_CONFIDENCE]`.
    pub confidence: f64,
    /// Selected neighbors, nearest first.
    pub neighbors: Vec<Neighbor>,
}

/// Normalized Euclidean distance between a reference row and the query.
pub fn distance(row: &ReferenceRow, query: &PreparedFeatures) -> f64 {
    let q = &query.clamped;
    let scaled = |row_value: f64, query_value: f64, scale: f64| {
        let diff = (row_value - query_value) / scale;
        diff * diff
    };
    let interaction_diff = row.temp_rainfall_interaction - query.derived.temp_rainfall_interaction;
    let npk_diff = row.npk_ratio - query.derived.npk_ratio;

    let sum = scaled(row.temperature, q.temperature, TEMPERATURE_SCALE)
        + scaled(row.rainfall, q.rainfall, RAINFALL_SCALE)
        + scaled(row.humidity, q.humidity, HUMIDITY_SCALE)
        + scaled(row.soil_ph, q.soil_ph, SOIL_PH_SCALE)
        + scaled(row.nitrogen, q.nitrogen, NITROGEN_SCALE)
        + scaled(row.phosphorus, q.phosphorus, PHOSPHORUS_SCALE)
        + scaled(row.potassium, q.potassium, POTASSIUM_SCALE)
        + interaction_diff * interaction_diff / INTERACTION_SQUARED_SCALE
        + npk_diff * npk_diff / NPK_RATIO_SQUARED_SCALE;
    sum.sqrt()
}

/// Pick the `k` nearest rows. Equal distances keep retrieval order.
pub fn nearest(rows: &[ReferenceRow], query: &PreparedFeatures, k: usize) -> Vec<Neighbor> {
    let mut scored: Vec<Neighbor> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| Neighbor {
            index,
            distance: distance(row, query),
            observed_yield: row.observed_yield,
        })
        .collect();
    // NaN of either sign goes last. `sort_by` is stable, so ties keep row order.
    scored.sort_by(|a, b| {
        a.distance
            .is_nan()
            .cmp(&b.distance.is_nan())
            .then(a.distance.total_cmp(&b.distance))
    });
    scored.truncate(k);
    scored
}

/// Estimate yield from the nearest rows. Returns `None` for an empty sample.
pub fn estimate(rows: &[ReferenceRow], query: &PreparedFeatures) -> Option<NeighborEstimate> {
    if rows.is_empty() {
        return None;
    }
    let k = MAX_NEIGHBORS.min(rows.len());
    let neighbors = nearest(rows, query, k);

    let mut weight_sum = 0.0;
    let mut weighted_sum = 0.0;
    for neighbor in &neighbors {
        let weight = 1.0 / (neighbor.distance + WEIGHT_EPSILON);
        weight_sum += weight;
        weighted_sum += weight * neighbor.observed_yield;
    }
    let weighted_yield = weighted_sum / weight_sum;

    let variance = neighbors
        .iter()
        .map(|n| (n.observed_yield - weighted_yield).powi(2))
        .sum::<f64>()
        / neighbors.len() as f64;
    let kth_distance = neighbors.last().map(|n| n.distance).unwrap_or(0.0);
    let confidence = clamp_confidence(1.0 - variance / 10.0 - kth_distance / 100.0);

    Some(NeighborEstimate {
        weighted_yield,
        confidence,
        neighbors,
    })
}

/// Clamp into the confidence band; NaN collapses to the floor.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return MIN_CONFIDENCE;
    }
    value.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}
