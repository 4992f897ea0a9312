//! File-backed cache store.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::zendesk::Record;

/// On-disk form of one cached query result.
///
/// The payload is always a complete paginated fetch; partial results are
/// never written (the fetcher enforces this).
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
  /// The query signature this entry answers
  key: String,
  stored_at: DateTime<Utc>,
  payload: Vec<Record>,
}

/// Owns the cache directory. Callers receive copies of payloads, never
/// handles into the store.
#[derive(Debug, Clone)]
pub struct CacheStore {
  dir: PathBuf,
  ttl: Duration,
}

impl CacheStore {
  /// Open the store at the configured directory (default:
  /// `$XDG_CACHE_HOME/zdex`), creating it if needed.
  pub fn open(config: &CacheConfig) -> Result<Self> {
    let dir = match &config.dir {
      Some(dir) => dir.clone(),
      None => dirs::cache_dir()
        .map(|d| d.join("zdex"))
        .ok_or_else(|| Error::Cache("could not determine cache directory".to_string()))?,
    };
    Self::at(dir, config.ttl())
  }

  /// Open the store at an explicit directory with an explicit TTL.
  pub fn at(dir: PathBuf, ttl: Duration) -> Result<Self> {
    fs::create_dir_all(&dir)
      .map_err(|e| Error::Cache(format!("failed to create cache directory {}: {}", dir.display(), e)))?;
    Ok(Self { dir, ttl })
  }

  fn entry_path(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{}.json", key))
  }

  /// Look up a fresh entry. Stale entries are treated as absent but left on
  /// disk (lazy expiry); read failures degrade to a miss.
  pub fn get(&self, key: &str) -> Option<Vec<Record>> {
    let path = self.entry_path(key);
    let contents = match fs::read(&path) {
      Ok(contents) => contents,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
      Err(err) => {
        warn!(path = %path.display(), %err, "failed to read cache entry");
        return None;
      }
    };

    let entry: CacheEntry = match serde_json::from_slice(&contents) {
      Ok(entry) => entry,
      Err(err) => {
        warn!(path = %path.display(), %err, "unreadable cache entry, treating as miss");
        return None;
      }
    };

    let age = Utc::now().signed_duration_since(entry.stored_at);
    let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
    if age > ttl {
      debug!(key, age_secs = age.num_seconds(), "cache entry stale");
      return None;
    }

    debug!(key, count = entry.payload.len(), "cache hit");
    Some(entry.payload)
  }

  /// Write a complete result set, overwriting any prior entry for the key.
  pub fn put(&self, key: &str, payload: &[Record]) -> Result<()> {
    let entry = CacheEntry {
      key: key.to_string(),
      stored_at: Utc::now(),
      payload: payload.to_vec(),
    };
    let contents = serde_json::to_vec(&entry)
      .map_err(|e| Error::Cache(format!("failed to serialize cache entry: {}", e)))?;

    let path = self.entry_path(key);
    fs::write(&path, contents)
      .map_err(|e| Error::Cache(format!("failed to write cache entry {}: {}", path.display(), e)))?;

    debug!(key, count = payload.len(), "cache entry written");
    Ok(())
  }

  /// Remove all entries regardless of freshness; returns how many were
  /// removed.
  pub fn clear(&self) -> Result<usize> {
    let entries = fs::read_dir(&self.dir)
      .map_err(|e| Error::Cache(format!("failed to read cache directory: {}", e)))?;

    let mut removed = 0;
    for entry in entries {
      let entry = entry.map_err(|e| Error::Cache(format!("failed to list cache entry: {}", e)))?;
      let path = entry.path();
      if path.extension().map(|ext| ext == "json").unwrap_or(false) {
        fs::remove_file(&path)
          .map_err(|e| Error::Cache(format!("failed to remove {}: {}", path.display(), e)))?;
        removed += 1;
      }
    }

    debug!(removed, "cache cleared");
    Ok(removed)
  }
}
