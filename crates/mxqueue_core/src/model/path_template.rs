//! Path template domain model.
//!
//! # Responsibility
//! - Describe where a task writes its files and how they are named.
//! - Compose the effective filename prefix from its labelled segments.
//!
//! # Invariants
//! - `prefix()` is recomputed on every call; segments may change after
//!   construction (e.g. a MAD wavelength label being reassigned).
//! - Run numbers are unique per `(prefix, directory)` only through the
//!   allocation contract, never by rejecting duplicates here.

use serde::{Deserialize, Serialize};

/// Separator placed between non-empty prefix segments.
pub const PREFIX_SEPARATOR: char = '-';

/// File naming and location scheme for one acquisition or scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathTemplate {
    /// Directory receiving raw images.
    pub directory: String,
    /// Directory receiving automatic processing output.
    pub process_directory: String,
    /// Operator-chosen prefix, always the last segment.
    pub base_prefix: String,
    /// Wavelength label for MAD collections. Empty when unused.
    pub mad_prefix: String,
    /// Label for characterisation reference images. Empty when unused.
    pub reference_image_prefix: String,
    /// Disambiguates repeated acquisitions sharing prefix and directory.
    pub run_number: u32,
    /// Per-template suffix override. Empty means "use the context suffix".
    pub suffix: String,
    /// First index of the numbering window.
    pub start_num: u32,
    /// Number of files in the numbering window.
    pub num_files: u32,
}

impl Default for PathTemplate {
    fn default() -> Self {
        Self {
            directory: String::new(),
            process_directory: String::new(),
            base_prefix: String::new(),
            mad_prefix: String::new(),
            reference_image_prefix: String::new(),
            run_number: 1,
            suffix: String::new(),
            start_num: 1,
            num_files: 1,
        }
    }
}

impl PathTemplate {
    /// Creates a template with the given base prefix and directory.
    pub fn new(base_prefix: impl Into<String>, directory: impl Into<String>) -> Self {
        Self {
            base_prefix: base_prefix.into(),
            directory: directory.into(),
            ..Self::default()
        }
    }

    /// Effective filename prefix: `ref-` + `mad-` + base, empty segments skipped.
    pub fn prefix(&self) -> String {
        let mut prefix = String::new();
        for segment in [
            self.reference_image_prefix.as_str(),
            self.mad_prefix.as_str(),
        ] {
            if !segment.is_empty() {
                prefix.push_str(segment);
                prefix.push(PREFIX_SEPARATOR);
            }
        }
        prefix.push_str(&self.base_prefix);
        prefix
    }

    /// Returns the numbering window as a half-open range.
    pub fn file_indices(&self) -> std::ops::Range<u32> {
        self.start_num..self.start_num.saturating_add(self.num_files)
    }
}
