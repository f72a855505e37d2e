//! Source adapters: each turns one input modality into raw text records.
//!
//! * [`web`] — fetches crawled URLs and reduces their HTML to text.
//! * [`files`] — stages uploaded files and dispatches to format extractors.
//! * [`audio`] — downloads a media URL and transcribes it.
//!
//! Adapters never fail as a whole: an individual source that cannot be
//! loaded is skipped with a warning and left out of the processed count.

pub mod audio;
pub mod files;
pub mod web;

use serde::{Deserialize, Serialize};

pub use files::DocumentFormat;

/// One source's extracted text, tagged with a stable identifier
/// (URL, file name, or media URL).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub source_id: String,
    pub text: String,
}

impl RawRecord {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
        }
    }
}

/// Records produced by one adapter plus its user-facing progress count.
#[derive(Debug, Default)]
pub struct AdapterOutput {
    pub records: Vec<RawRecord>,
    pub sources_processed: usize,
}

impl AdapterOutput {
    pub fn merge(&mut self, other: AdapterOutput) {
        self.records.extend(other.records);
        self.sources_processed += other.sources_processed;
    }
}
