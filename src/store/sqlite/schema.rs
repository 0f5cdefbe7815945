use rusqlite::Connection;

use super::super::StoreError;
use super::util::map_sql_error;

pub(super) fn apply_schema(connection: &Connection) -> Result<(), StoreError> {
    connection
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS crops_dataset (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                crop TEXT,
                state TEXT,
                year INTEGER,
                temperature REAL,
                rainfall REAL,
                humidity REAL,
                soil_ph REAL,
                nitrogen REAL,
                phosphorus REAL,
                potassium REAL,
                yield REAL,
                temp_rainfall_interaction REAL,
                npk_ratio REAL
             );
             CREATE TABLE IF NOT EXISTS predictions (
                id TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL,
                crop TEXT NOT NULL,
                temperature REAL,
                rainfall REAL,
                humidity REAL,
                soil_ph REAL,
                nitrogen REAL,
                phosphorus REAL,
                potassium REAL,
                predicted_yield REAL,
                ensemble_prediction REAL,
                best_model TEXT NOT NULL,
                feature_importances TEXT NOT NULL,
                confidence REAL
             );
             CREATE INDEX IF NOT EXISTS idx_predictions_created_at
                ON predictions (created_at);",
        )
        .map_err(map_sql_error)
}
