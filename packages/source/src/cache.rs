//! On-disk cache for point-of-interest query results.
//!
//! Each successful query is stored as one small JSON file named by the
//! SHA-256 of the query text, so identical queries across runs and
//! regions are answered locally. Entries are never invalidated; delete
//! the directory to force fresh queries.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::SourceError;

#[derive(Debug, Serialize, Deserialize)]
struct CachedCount {
    query_sha256: String,
    count: u64,
    cached_at: DateTime<Utc>,
}

/// A directory of cached query counts.
#[derive(Debug, Clone)]
pub struct QueryCache {
    dir: PathBuf,
}

impl QueryCache {
    /// Opens (or creates) a cache rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if the directory cannot be created.
    pub fn open(dir: &Path) -> Result<Self, SourceError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Cache key for a query: lowercase hex SHA-256 of its text.
    #[must_use]
    pub fn key(query: &str) -> String {
        hex::encode(Sha256::digest(query.as_bytes()))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Returns the cached count for `query`, if any.
    ///
    /// Unreadable or corrupt entries are treated as misses.
    #[must_use]
    pub fn lookup(&self, query: &str) -> Option<u64> {
        let key = Self::key(query);
        let path = self.entry_path(&key);
        let body = std::fs::read_to_string(&path).ok()?;

        match serde_json::from_str::<CachedCount>(&body) {
            Ok(entry) if entry.query_sha256 == key => Some(entry.count),
            Ok(_) => {
                log::warn!("Cache entry {} has a mismatched key, ignoring", path.display());
                None
            }
            Err(e) => {
                log::warn!("Corrupt cache entry {}: {e}", path.display());
                None
            }
        }
    }

    /// Stores the count for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the entry cannot be serialized or written.
    pub fn store(&self, query: &str, count: u64) -> Result<(), SourceError> {
        let key = Self::key(query);
        let entry = CachedCount {
            query_sha256: key.clone(),
            count,
            cached_at: Utc::now(),
        };

        let path = self.entry_path(&key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        std::fs::write(&tmp, serde_json::to_vec(&entry)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}
