#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region build orchestration.
//!
//! [`run::build_region_dataset`] is the pure entry point: given a region,
//! settings and a [`sources::RegionSources`], it fetches boundaries and
//! tables, joins tracts to ZCTAs, aggregates and assembles the final
//! rows. [`run::run_region`] adds the CSV write and [`run::run_batch`]
//! loops over several regions, isolating failures per region.

pub mod paths;
pub mod run;
pub mod settings;
pub mod sources;

pub use run::{
    BatchReport, RegionDataset, RegionSummary, build_region_dataset, export_boundaries,
    region_boundaries, resolve_region, run_batch, run_region,
};
pub use settings::PipelineSettings;
pub use sources::{HttpSources, RegionSources};

use commute_burden_dataset::DatasetError;
use commute_burden_region_models::InvalidRegionError;
use commute_burden_source::SourceError;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// Errors that abort a region build.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No registered region has this id.
    #[error("Unknown region '{0}'")]
    UnknownRegion(String),

    /// The region definition is malformed.
    #[error(transparent)]
    InvalidRegion(#[from] InvalidRegionError),

    /// A stage produced nothing to continue with.
    #[error("No data found: {message}")]
    NoDataFound {
        /// What came back empty.
        message: String,
    },

    /// A provider request failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Aggregation, assembly or output failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse failure category, used in run summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum ErrorKind {
    InvalidParameter,
    TransportFailure,
    NoDataFound,
    JoinIntegrityFailure,
    Io,
    Conversion,
}

impl PipelineError {
    /// The category this error falls in.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownRegion(_)
            | Self::InvalidRegion(_)
            | Self::Source(SourceError::InvalidParameter { .. }) => ErrorKind::InvalidParameter,
            Self::Source(SourceError::Http(_) | SourceError::Service { .. }) => {
                ErrorKind::TransportFailure
            }
            Self::NoDataFound { .. } | Self::Source(SourceError::NoDataFound { .. }) => {
                ErrorKind::NoDataFound
            }
            Self::Dataset(DatasetError::JoinIntegrity { .. }) => ErrorKind::JoinIntegrityFailure,
            Self::Io(_) | Self::Source(SourceError::Io(_)) | Self::Dataset(DatasetError::Io(_)) => {
                ErrorKind::Io
            }
            Self::Json(_)
            | Self::Source(
                SourceError::Json(_) | SourceError::Csv(_) | SourceError::Conversion { .. },
            )
            | Self::Dataset(DatasetError::Csv(_)) => ErrorKind::Conversion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        assert_eq!(
            PipelineError::UnknownRegion("atlantis".to_string()).kind(),
            ErrorKind::InvalidParameter
        );
        assert_eq!(
            PipelineError::from(SourceError::NoDataFound {
                message: "CBSA 99999".to_string(),
            })
            .kind(),
            ErrorKind::NoDataFound
        );
        assert_eq!(
            PipelineError::from(SourceError::Service {
                service: "Overpass",
                message: "runtime error".to_string(),
            })
            .kind(),
            ErrorKind::TransportFailure
        );
        assert_eq!(
            PipelineError::from(DatasetError::JoinIntegrity {
                message: "x".to_string(),
            })
            .kind(),
            ErrorKind::JoinIntegrityFailure
        );
        assert_eq!(ErrorKind::TransportFailure.to_string(), "TransportFailure");
    }
}
