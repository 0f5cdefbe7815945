use rusqlite::Row;

use super::super::{PredictionRecord, ReferenceRow, StoreError};
use super::SqliteRowStore;
use super::util::{map_sql_error, numeric_column};
use crate::estimator::BestModel;
use crate::ml::features::FeatureVector;

const REQUIRED_REFERENCE_COLUMNS: [&str; 8] = [
    "temperature",
    "rainfall",
    "humidity",
    "soil_ph",
    "nitrogen",
    "phosphorus",
    "potassium",
    "yield",
];

impl SqliteRowStore {
    /// Fetch up to `limit` reference rows ordered by insertion id.
    ///
    /// Rows with a missing, non-numeric or non-finite required value are skipped.
    pub fn list_reference_rows(&self, limit: usize) -> Result<Vec<ReferenceRow>, StoreError> {
        let mut stmt = self
            .connection
            .prepare_cached(
                "SELECT id, crop, temperature, rainfall, humidity, soil_ph, nitrogen, phosphorus,
                        potassium, yield, temp_rainfall_interaction, npk_ratio, state, year
                 FROM crops_dataset ORDER BY id ASC LIMIT ?1",
            )
            .map_err(map_sql_error)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map([limit], |row| Ok((row.get::<_, i64>(0)?, decode_reference_row(row)?)))
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;

        let mut out = Vec::with_capacity(rows.len());
        for (id, decoded) in rows {
            match decoded {
                Ok(row) => out.push(row),
                Err(column) => {
                    tracing::warn!(row_id = id, column, "Skipping reference row without numeric value");
                }
            }
        }
        Ok(out)
    }

    /// Count all stored reference rows.
    pub fn reference_row_count(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM crops_dataset")
    }

    /// Count all stored prediction records.
    pub fn prediction_count(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM predictions")
    }

    /// Fetch the most recent prediction records, newest first.
    pub fn recent_predictions(&self, limit: usize) -> Result<Vec<PredictionRecord>, StoreError> {
        let mut stmt = self
            .connection
            .prepare_cached(
                "SELECT id, created_at, crop, temperature, rainfall, humidity, soil_ph, nitrogen,
                        phosphorus, potassium, predicted_yield, ensemble_prediction, best_model,
                        feature_importances, confidence
                 FROM predictions ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            )
            .map_err(map_sql_error)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map([limit], |row| {
                let real = |idx: usize| -> rusqlite::Result<f64> {
                    Ok(numeric_column(row.get_ref(idx)?).unwrap_or(f64::NAN))
                };
                Ok((
                    PredictionRecord {
                        id: row.get(0)?,
                        created_at: row.get(1)?,
                        input: FeatureVector {
                            crop: row.get(2)?,
                            temperature: real(3)?,
                            rainfall: real(4)?,
                            humidity: real(5)?,
                            soil_ph: real(6)?,
                            nitrogen: real(7)?,
                            phosphorus: real(8)?,
                            potassium: real(9)?,
                        },
                        predicted_yield: real(10)?,
                        ensemble_prediction: real(11)?,
                        best_model: BestModel::HybridEnhanced,
                        feature_importances: row.get(13)?,
                        confidence: real(14)?,
                    },
                    row.get::<_, String>(12)?,
                ))
            })
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;

        rows.into_iter()
            .map(|(mut record, model)| {
                record.best_model = BestModel::parse(&model)
                    .ok_or_else(|| StoreError::InvalidRecord(format!("unknown model {model}")))?;
                Ok(record)
            })
            .collect()
    }

    fn count(&self, sql: &str) -> Result<u64, StoreError> {
        let n: i64 = self
            .connection
            .query_row(sql, [], |row| row.get(0))
            .map_err(map_sql_error)?;
        Ok(n.max(0) as u64)
    }
}

/// Decode one `crops_dataset` row. The inner error names the offending column.
fn decode_reference_row(row: &Row<'_>) -> rusqlite::Result<Result<ReferenceRow, &'static str>> {
    let mut values = [0.0_f64; 8];
    for (slot, (offset, column)) in values
        .iter_mut()
        .zip(REQUIRED_REFERENCE_COLUMNS.iter().enumerate())
    {
        match numeric_column(row.get_ref(2 + offset)?) {
            Some(value) => *slot = value,
            None => return Ok(Err(*column)),
        }
    }
    let [temperature, rainfall, humidity, soil_ph, nitrogen, phosphorus, potassium, observed_yield] =
        values;
    Ok(Ok(ReferenceRow {
        crop: row.get::<_, Option<String>>(1)?,
        state: row.get::<_, Option<String>>(12)?,
        year: row.get::<_, Option<i32>>(13)?,
        temperature,
        rainfall,
        humidity,
        soil_ph,
        nitrogen,
        phosphorus,
        potassium,
        observed_yield,
        temp_rainfall_interaction: numeric_column(row.get_ref(10)?).unwrap_or(0.0),
        npk_ratio: numeric_column(row.get_ref(11)?).unwrap_or(0.0),
    }))
}
