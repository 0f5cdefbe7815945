use std::path::Path;

use cropyield::dataset::{METADATA_FILE, SAMPLE_FILE};
use cropyield::ml::features::FeatureVector;
use cropyield::store::ReferenceRow;

/// Request body of the reference fallback scenario (15.776278 with no rows).
pub const WHEAT_REQUEST: &str = r#"{"crop":"wheat","temperature":30,"rainfall":900,"humidity":60,
    "soil_ph":6.5,"nitrogen":100,"phosphorus":40,"potassium":150}"#;

pub fn wheat_input() -> FeatureVector {
    FeatureVector {
        crop: "wheat".to_string(),
        temperature: 30.0,
        rainfall: 900.0,
        humidity: 60.0,
        soil_ph: 6.5,
        nitrogen: 100.0,
        phosphorus: 40.0,
        potassium: 150.0,
    }
}

/// A row whose features coincide with `input` after clamping.
pub fn matching_row(input: &FeatureVector, observed_yield: f64) -> ReferenceRow {
    let c = input.prepare().clamped;
    ReferenceRow::observed(
        &input.crop,
        [
            c.temperature,
            c.rainfall,
            c.humidity,
            c.soil_ph,
            c.nitrogen,
            c.phosphorus,
            c.potassium,
        ],
        observed_yield,
    )
}

/// A row far from `input` in every scaled dimension.
pub fn distant_row(input: &FeatureVector, observed_yield: f64) -> ReferenceRow {
    let mut row = matching_row(input, observed_yield);
    row.humidity += 150.0;
    row.soil_ph += 4.0;
    row.nitrogen += 300.0;
    row
}

pub const SAMPLE_JSON: &str = r#"[
    {"crop":"rice","state":"Punjab","year":2018,"temperature":30,"rainfall":1200,"humidity":75,
     "soil_ph":6.2,"nitrogen":110,"phosphorus":45,"potassium":60,"yield":4.8},
    {"crop":"wheat","state":"Punjab","year":2018,"temperature":20,"rainfall":500,"humidity":50,
     "soil_ph":7.1,"nitrogen":90,"phosphorus":35,"potassium":40,"yield":3.4},
    {"crop":"wheat","state":"Haryana","year":2019,"temperature":22,"rainfall":450,"humidity":48,
     "soil_ph":7.3,"nitrogen":95,"phosphorus":30,"potassium":45,"yield":3.9}
]"#;

pub fn write_dataset_dir(dir: &Path) {
    std::fs::create_dir_all(dir).expect("create dataset dir");
    std::fs::write(
        dir.join(METADATA_FILE),
        r#"{"total_records":3,"crops":["rice","wheat"],"states":["Haryana","Punjab"],"years":[2018,2019]}"#,
    )
    .expect("write metadata");
    std::fs::write(dir.join(SAMPLE_FILE), SAMPLE_JSON).expect("write sample");
}
