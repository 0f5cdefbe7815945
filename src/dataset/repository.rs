//! Memoizing repository over a [`DatasetSource`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::loader::{
    DatasetError, DatasetMetadata, METADATA_FILE, SAMPLE_FILE, SampleRecord, crop_variant_file,
    parse_json, state_variant_file,
};
use super::source::DatasetSource;
use super::summary::{CropSummary, summarize_by_crop};

/// Optional crop/state constraints for [`DatasetRepository::records`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub crop: Option<String>,
    pub state: Option<String>,
}

#[derive(Default)]
struct Cache {
    metadata: Option<Arc<DatasetMetadata>>,
    sample: Option<Arc<Vec<SampleRecord>>>,
    // Keyed by variant file name; `None` records a missing file.
    variants: HashMap<String, Option<Arc<Vec<SampleRecord>>>>,
}

/// Parsed dataset documents, loaded on first use and kept until
/// [`invalidate`](Self::invalidate) is called.
pub struct DatasetRepository<S> {
    source: S,
    cache: Mutex<Cache>,
}

impl<S: DatasetSource> DatasetRepository<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: Mutex::new(Cache::default()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Drop every memoized document so the next query rereads the source.
    pub fn invalidate(&self) -> Result<(), DatasetError> {
        *self.lock()? = Cache::default();
        tracing::debug!("Dataset cache invalidated");
        Ok(())
    }

    pub fn metadata(&self) -> Result<Arc<DatasetMetadata>, DatasetError> {
        if let Some(metadata) = self.lock()?.metadata.clone() {
            return Ok(metadata);
        }
        let metadata = Arc::new(self.required::<DatasetMetadata>(METADATA_FILE)?);
        self.lock()?.metadata = Some(metadata.clone());
        Ok(metadata)
    }

    pub fn sample(&self) -> Result<Arc<Vec<SampleRecord>>, DatasetError> {
        if let Some(sample) = self.lock()?.sample.clone() {
            return Ok(sample);
        }
        let sample = Arc::new(self.required::<Vec<SampleRecord>>(SAMPLE_FILE)?);
        tracing::info!(records = sample.len(), "Loaded dataset sample");
        self.lock()?.sample = Some(sample.clone());
        Ok(sample)
    }

    /// Records of one crop: the variant file when present, else a
    /// case-insensitive filter over the sample.
    pub fn records_for_crop(&self, crop: &str) -> Result<Arc<Vec<SampleRecord>>, DatasetError> {
        if let Some(records) = self.variant(&crop_variant_file(crop))? {
            return Ok(records);
        }
        Ok(Arc::new(self.filter_sample(|record| matches(&record.crop, crop))?))
    }

    /// Records of one state: the variant file when present, else a
    /// case-insensitive filter over the sample.
    pub fn records_for_state(&self, state: &str) -> Result<Arc<Vec<SampleRecord>>, DatasetError> {
        if let Some(records) = self.variant(&state_variant_file(state))? {
            return Ok(records);
        }
        Ok(Arc::new(self.filter_sample(|record| {
            record
                .state
                .as_deref()
                .is_some_and(|value| matches(value, state))
        })?))
    }

    /// Records matching both constraints of `filter`.
    pub fn records(&self, filter: &RecordFilter) -> Result<Vec<SampleRecord>, DatasetError> {
        let base = match (&filter.crop, &filter.state) {
            (Some(crop), _) => self.records_for_crop(crop)?,
            (None, Some(state)) => self.records_for_state(state)?,
            (None, None) => self.sample()?,
        };
        let Some(state) = filter.state.as_deref().filter(|_| filter.crop.is_some()) else {
            return Ok((*base).clone());
        };
        Ok(base
            .iter()
            .filter(|record| {
                record
                    .state
                    .as_deref()
                    .is_some_and(|value| matches(value, state))
            })
            .cloned()
            .collect())
    }

    /// Per-crop yield statistics over the sample.
    pub fn crop_summaries(&self) -> Result<Vec<CropSummary>, DatasetError> {
        Ok(summarize_by_crop(&self.sample()?))
    }

    fn filter_sample(
        &self,
        keep: impl Fn(&SampleRecord) -> bool,
    ) -> Result<Vec<SampleRecord>, DatasetError> {
        Ok(self
            .sample()?
            .iter()
            .filter(|record| keep(record))
            .cloned()
            .collect())
    }

    fn variant(&self, name: &str) -> Result<Option<Arc<Vec<SampleRecord>>>, DatasetError> {
        if let Some(cached) = self.lock()?.variants.get(name) {
            return Ok(cached.clone());
        }
        let parsed = match self.source.read(name)? {
            Some(bytes) => Some(Arc::new(parse_json::<Vec<SampleRecord>>(name, &bytes)?)),
            None => None,
        };
        self.lock()?
            .variants
            .insert(name.to_string(), parsed.clone());
        Ok(parsed)
    }

    fn required<T: for<'de> serde::Deserialize<'de>>(&self, name: &str) -> Result<T, DatasetError> {
        let bytes = self
            .source
            .read(name)?
            .ok_or_else(|| DatasetError::Missing(name.to_string()))?;
        parse_json(name, &bytes)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Cache>, DatasetError> {
        self.cache.lock().map_err(|_| DatasetError::Poisoned)
    }
}

fn matches(value: &str, wanted: &str) -> bool {
    value.trim().eq_ignore_ascii_case(wanted.trim())
}
