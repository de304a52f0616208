#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reporting-area dataset construction.
//!
//! Rolls derived tract features up to ZCTAs with population weighting,
//! left-joins rent, area and transit measures, labels income terciles
//! and writes the result as CSV.

pub mod aggregate;
pub mod assemble;
pub mod output;
pub mod segments;
pub mod weighted;

pub use aggregate::{Aggregation, CoverageReport, TractRow, aggregate_to_areas, join_tract_tables};
pub use assemble::{AreaMeasures, assemble};
pub use output::{render_csv, write_atomic, write_dataset};

use thiserror::Error;

/// Errors that can occur while building or writing a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A required join dropped rows it must not drop.
    #[error("Join integrity failure: {message}")]
    JoinIntegrity {
        /// What failed to join.
        message: String,
    },

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
