//! Static dataset files shown alongside predictions.
//!
//! These JSON documents are read-only display data. They never feed the
//! estimator directly; `cropyield-import` can seed the row store from them.

mod loader;
mod repository;
mod source;
mod summary;

pub use loader::{
    DatasetError, DatasetMetadata, METADATA_FILE, SAMPLE_FILE, SampleRecord, crop_variant_file,
    load_records_file, slug, state_variant_file,
};
pub use repository::{DatasetRepository, RecordFilter};
pub use source::{DatasetSource, DirectorySource};
pub use summary::{CropSummary, summarize_by_crop};
