//! On-disk cache of verification results.
//!
//! One JSON file per query, named by the SHA-256 of `<kind>:<query>`.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::CitationCheck;

#[derive(Debug, Clone)]
pub struct VerificationCache {
    dir: PathBuf,
}

impl VerificationCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache key for a reporter citation.
    pub fn citation_key(citation: &str) -> String {
        Self::key("citation", citation)
    }

    /// Cache key for a case name.
    pub fn name_key(name: &str) -> String {
        Self::key("name", name)
    }

    fn key(kind: &str, query: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(b":");
        hasher.update(query.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Read a cached result. Missing or unreadable entries are a miss.
    pub async fn get(&self, key: &str) -> Option<CitationCheck> {
        let path = self.path_for(key);
        let data = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice(&data) {
            Ok(check) => {
                debug!("Cache hit: {}", path.display());
                Some(check)
            }
            Err(e) => {
                warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store a result.
    pub async fn put(&self, key: &str, check: &CitationCheck) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(check)?;
        tokio::fs::write(self.path_for(key), json).await
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        std::fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
