#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for pipeline output and caches.
//!
//! All paths are relative to the project root.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`. Falls back to the
/// current directory if the manifest is not nested two levels deep.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the `data/final/` directory for finished datasets.
#[must_use]
pub fn final_dir() -> PathBuf {
    data_dir().join("final")
}

/// Returns the `.cache/` directory for provider response caches.
#[must_use]
pub fn cache_dir() -> PathBuf {
    project_root().join(".cache")
}

/// Returns the path of a region's dataset inside `output_dir`.
#[must_use]
pub fn dataset_path(output_dir: &Path, region_id: &str) -> PathBuf {
    output_dir.join(format!("final_zcta_dataset_{region_id}.csv"))
}

/// Returns the path of a region's reporting-area boundaries inside
/// `output_dir`.
#[must_use]
pub fn boundaries_path(output_dir: &Path, region_id: &str) -> PathBuf {
    output_dir.join(format!("zcta_boundaries_{region_id}.geojson"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_contains_workspace_manifest() {
        assert!(project_root().join("Cargo.toml").exists());
    }

    #[test]
    fn output_file_names() {
        let dir = Path::new("/tmp/out");
        assert_eq!(
            dataset_path(dir, "memphis"),
            Path::new("/tmp/out/final_zcta_dataset_memphis.csv")
        );
        assert_eq!(
            boundaries_path(dir, "phoenix"),
            Path::new("/tmp/out/zcta_boundaries_phoenix.geojson")
        );
    }
}
