use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shelfcrop_core::Fingerprint;
use shelfcrop_logging::{pipeline_info, pipeline_warn};

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read fingerprint store {path:?}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("failed to parse fingerprint store {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("failed to serialize fingerprint store: {0}")]
    Serialize(String),
    #[error("failed to write fingerprint store: {0}")]
    Write(#[from] PersistError),
}

/// Set of fingerprints already seen by a harvest session.
pub trait FingerprintStore: Send {
    fn contains(&self, fingerprint: &Fingerprint) -> bool;

    /// Returns `true` when the fingerprint was not present before.
    fn insert(&mut self, fingerprint: Fingerprint) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make inserted fingerprints durable, if the store is backed by anything.
    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Session-scoped store; forgotten when the harvest ends.
#[derive(Debug, Default, Clone)]
pub struct MemoryFingerprintStore {
    seen: HashSet<Fingerprint>,
}

impl MemoryFingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FingerprintStore for MemoryFingerprintStore {
    fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        self.seen.insert(fingerprint)
    }

    fn len(&self) -> usize {
        self.seen.len()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedFingerprints {
    fingerprints: Vec<String>,
}

/// Store persisted as a RON file so content seen in earlier runs is skipped too.
#[derive(Debug)]
pub struct RonFingerprintStore {
    path: PathBuf,
    seen: HashSet<Fingerprint>,
    dirty: bool,
}

impl RonFingerprintStore {
    /// Load the store at `path`; a missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self {
                    path,
                    seen: HashSet::new(),
                    dirty: false,
                });
            }
            Err(err) => {
                return Err(StoreError::Read {
                    path,
                    message: err.to_string(),
                })
            }
        };

        let persisted: PersistedFingerprints =
            ron::from_str(&content).map_err(|err| StoreError::Parse {
                path: path.clone(),
                message: err.to_string(),
            })?;

        let mut seen = HashSet::with_capacity(persisted.fingerprints.len());
        for hex in &persisted.fingerprints {
            match Fingerprint::from_hex(hex) {
                Some(fp) => {
                    seen.insert(fp);
                }
                None => pipeline_warn!("Ignoring malformed fingerprint {:?} in {:?}", hex, path),
            }
        }
        pipeline_info!("Loaded {} fingerprints from {:?}", seen.len(), path);

        Ok(Self {
            path,
            seen,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FingerprintStore for RonFingerprintStore {
    fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        let inserted = self.seen.insert(fingerprint);
        self.dirty |= inserted;
        inserted
    }

    fn len(&self) -> usize {
        self.seen.len()
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        let mut fingerprints: Vec<String> = self.seen.iter().map(Fingerprint::to_hex).collect();
        fingerprints.sort();
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(&PersistedFingerprints { fingerprints }, pretty)
            .map_err(|err| StoreError::Serialize(err.to_string()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let filename = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| StoreError::Serialize("store path has no file name".into()))?;
        AtomicFileWriter::new(dir).write(&filename, &content)?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FingerprintStore, MemoryFingerprintStore, RonFingerprintStore};
    use shelfcrop_core::{ContentHasher, Sha256Hasher};

    #[test]
    fn memory_store_reports_first_insert_only() {
        let mut store = MemoryFingerprintStore::new();
        let fp = Sha256Hasher.hash(b"x");
        assert!(store.is_empty());
        assert!(store.insert(fp));
        assert!(!store.insert(fp));
        assert!(store.contains(&fp));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn ron_store_survives_reopen() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join(".fingerprints.ron");
        let fp = Sha256Hasher.hash(b"persisted");

        let mut store = RonFingerprintStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.insert(fp);
        store.flush().unwrap();

        let reopened = RonFingerprintStore::open(&path).unwrap();
        assert!(reopened.contains(&fp));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn ron_store_rejects_garbage_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("store.ron");
        std::fs::write(&path, "this is not ron {").unwrap();
        assert!(RonFingerprintStore::open(&path).is_err());
    }
}
