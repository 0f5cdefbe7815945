use rusqlite::{Transaction, params};

use super::super::{PredictionRecord, ReferenceRow, StoreError};
use super::SqliteRowStore;
use super::util::map_sql_error;

impl SqliteRowStore {
    /// Append one prediction record to the audit log.
    pub fn insert_prediction(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        let input = &record.input;
        self.connection
            .prepare_cached(
                "INSERT INTO predictions (id, created_at, crop, temperature, rainfall, humidity,
                    soil_ph, nitrogen, phosphorus, potassium, predicted_yield, ensemble_prediction,
                    best_model, feature_importances, confidence)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            )
            .map_err(map_sql_error)?
            .execute(params![
                record.id,
                record.created_at,
                input.crop,
                input.temperature,
                input.rainfall,
                input.humidity,
                input.soil_ph,
                input.nitrogen,
                input.phosphorus,
                input.potassium,
                record.predicted_yield,
                record.ensemble_prediction,
                record.best_model.as_str(),
                record.feature_importances,
                record.confidence,
            ])
            .map_err(map_sql_error)?;
        Ok(())
    }

    /// Insert reference rows in one transaction, preserving slice order.
    pub fn insert_reference_rows(&self, rows: &[ReferenceRow]) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let tx = self
            .connection
            .unchecked_transaction()
            .map_err(map_sql_error)?;
        insert_rows(&tx, rows)?;
        tx.commit().map_err(map_sql_error)?;
        Ok(rows.len())
    }

    /// Replace every reference row with `rows` atomically.
    pub fn replace_reference_rows(&self, rows: &[ReferenceRow]) -> Result<usize, StoreError> {
        let tx = self
            .connection
            .unchecked_transaction()
            .map_err(map_sql_error)?;
        tx.execute("DELETE FROM crops_dataset", [])
            .map_err(map_sql_error)?;
        insert_rows(&tx, rows)?;
        tx.commit().map_err(map_sql_error)?;
        Ok(rows.len())
    }
}

fn insert_rows(tx: &Transaction<'_>, rows: &[ReferenceRow]) -> Result<(), StoreError> {
    let mut stmt = tx
        .prepare_cached(
            "INSERT INTO crops_dataset (crop, state, year, temperature, rainfall, humidity, soil_ph,
                nitrogen, phosphorus, potassium, yield, temp_rainfall_interaction, npk_ratio)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .map_err(map_sql_error)?;
    for row in rows {
        stmt.execute(params![
            row.crop,
            row.state,
            row.year,
            row.temperature,
            row.rainfall,
            row.humidity,
            row.soil_ph,
            row.nitrogen,
            row.phosphorus,
            row.potassium,
            row.observed_yield,
            row.temp_rainfall_interaction,
            row.npk_ratio,
        ])
        .map_err(map_sql_error)?;
    }
    Ok(())
}
