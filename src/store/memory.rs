use std::sync::RwLock;

use super::{PredictionRecord, ReferenceRow, RowStore, StoreError};

/// Row store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryRowStore {
    reference: Vec<ReferenceRow>,
    predictions: RwLock<Vec<PredictionRecord>>,
}

impl MemoryRowStore {
    /// Create a store seeded with reference rows.
    pub fn new(reference: Vec<ReferenceRow>) -> Self {
        Self {
            reference,
            predictions: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of the prediction records appended so far, oldest first.
    pub fn predictions(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        self.predictions
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| StoreError::Poisoned)
    }
}

impl RowStore for MemoryRowStore {
    fn reference_rows(&self, limit: usize) -> Result<Vec<ReferenceRow>, StoreError> {
        Ok(self.reference.iter().take(limit).cloned().collect())
    }

    fn append_prediction(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        self.predictions
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .push(record.clone());
        Ok(())
    }
}
