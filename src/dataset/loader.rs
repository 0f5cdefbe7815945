//! File formats of the static dataset directory.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ml::features;
use crate::store::ReferenceRow;

/// Dataset summary document.
pub const METADATA_FILE: &str = "dataset_metadata.json";
/// Full sample of historical observations.
pub const SAMPLE_FILE: &str = "crop_yield_sample.json";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON in {name}: {source}")]
    Json {
        name: String,
        source: serde_json::Error,
    },
    /// A required document is absent from the source.
    #[error("Dataset file {0} not found")]
    Missing(String),
    #[error("Dataset cache lock poisoned")]
    Poisoned,
}

/// Parsed `dataset_metadata.json`. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub crops: Vec<String>,
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub years: Vec<i32>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

/// One observation from `crop_yield_sample.json` or a variant file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub crop: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    pub temperature: f64,
    pub rainfall: f64,
    pub humidity: f64,
    pub soil_ph: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    #[serde(rename = "yield")]
    pub observed_yield: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_rainfall_interaction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npk_ratio: Option<f64>,
}

impl SampleRecord {
    /// Convert into a reference row, computing absent engineered fields from
    /// the raw values.
    pub fn to_reference_row(&self) -> ReferenceRow {
        ReferenceRow {
            crop: Some(self.crop.clone()),
            state: self.state.clone(),
            year: self.year,
            temperature: self.temperature,
            rainfall: self.rainfall,
            humidity: self.humidity,
            soil_ph: self.soil_ph,
            nitrogen: self.nitrogen,
            phosphorus: self.phosphorus,
            potassium: self.potassium,
            observed_yield: self.observed_yield,
            temp_rainfall_interaction: self.temp_rainfall_interaction.unwrap_or_else(|| {
                features::temp_rainfall_interaction(self.temperature, self.rainfall)
            }),
            npk_ratio: self.npk_ratio.unwrap_or_else(|| {
                features::npk_ratio(self.nitrogen, self.phosphorus, self.potassium)
            }),
        }
    }
}

/// Lowercase slug used in variant file names: `"Uttar Pradesh"` -> `uttar_pradesh`.
pub fn slug(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// File holding the records of one crop.
pub fn crop_variant_file(crop: &str) -> String {
    format!("crop_yield_crop_{}.json", slug(crop))
}

/// File holding the records of one state.
pub fn state_variant_file(state: &str) -> String {
    format!("crop_yield_state_{}.json", slug(state))
}

/// Load a records file from disk. Used by the importer.
pub fn load_records_file(path: &Path) -> Result<Vec<SampleRecord>, DatasetError> {
    let mut bytes = Vec::new();
    File::open(path)
        .and_then(|mut file| file.read_to_end(&mut bytes))
        .map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_json(&path.display().to_string(), &bytes)
}

pub(super) fn parse_json<T: for<'de> Deserialize<'de>>(
    name: &str,
    bytes: &[u8],
) -> Result<T, DatasetError> {
    serde_json::from_slice(bytes).map_err(|source| DatasetError::Json {
        name: name.to_string(),
        source,
    })
}
