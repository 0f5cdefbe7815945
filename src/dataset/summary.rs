use std::collections::BTreeMap;

use serde::Serialize;

use super::loader::SampleRecord;

/// Yield statistics for one crop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropSummary {
    pub crop: String,
    pub count: usize,
    pub mean_yield: f64,
    pub min_yield: f64,
    pub max_yield: f64,
}

/// Per-crop count and yield statistics, ordered by crop name.
pub fn summarize_by_crop(records: &[SampleRecord]) -> Vec<CropSummary> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.crop.as_str())
            .or_default()
            .push(record.observed_yield);
    }
    groups
        .into_iter()
        .map(|(crop, yields)| {
            let count = yields.len();
            let sum: f64 = yields.iter().sum();
            CropSummary {
                crop: crop.to_string(),
                count,
                mean_yield: sum / count as f64,
                min_yield: yields.iter().copied().fold(f64::INFINITY, f64::min),
                max_yield: yields.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }
        })
        .collect()
}
