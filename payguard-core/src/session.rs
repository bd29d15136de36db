//! Session-scoped storage
//!
//! Carries a scanned payment across navigation steps: the scan step
//! persists the raw payload and the parsed descriptor, the confirmation
//! step recovers them.

use crate::{extract_payment, Error, PaymentDescriptor, Result};
use dashmap::DashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Key/value session storage
pub trait SessionStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value; missing keys are not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process session storage
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: DashMap<String, String>,
}

impl MemorySessionStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Directory-backed session storage, one file per key.
/// Writes go through a temp file and an atomic rename.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Store rooted at `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::Session(format!("invalid session key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        let mut temp_file = NamedTempFile::new_in(&self.dir)?;
        temp_file.write_all(value.as_bytes())?;
        temp_file
            .persist(&path)
            .map_err(|e| Error::Session(format!("failed to persist {}: {}", path.display(), e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Scan hand-off between the scan and confirmation steps
pub struct ScanSession<'a> {
    store: &'a dyn SessionStore,
}

impl<'a> ScanSession<'a> {
    /// Raw scanned text
    pub const PENDING_SCAN_KEY: &'static str = "pending_scan";

    /// Parsed [`PaymentDescriptor`] as JSON
    pub const PARSED_SCAN_KEY: &'static str = "parsed_scan";

    /// Wrap a store
    pub fn new(store: &'a dyn SessionStore) -> Self {
        Self { store }
    }

    /// Persist a successful scan
    pub fn persist_scan(&self, descriptor: &PaymentDescriptor) -> Result<()> {
        self.store.set(
            Self::PENDING_SCAN_KEY,
            &serde_json::to_string(descriptor.raw())?,
        )?;
        self.store.set(
            Self::PARSED_SCAN_KEY,
            &serde_json::to_string(descriptor)?,
        )?;
        debug!(identifier = %descriptor.identifier(), "Scan persisted to session");
        Ok(())
    }

    /// Take back the last scan, consuming it.
    ///
    /// Prefers the parsed descriptor and falls back to re-extracting the raw
    /// payload when the descriptor is missing or unreadable.
    pub fn recover_scan(&self) -> Result<Option<PaymentDescriptor>> {
        let parsed = self.store.get(Self::PARSED_SCAN_KEY)?;
        let pending = self.store.get(Self::PENDING_SCAN_KEY)?;
        self.clear()?;

        if let Some(json) = parsed {
            match serde_json::from_str::<PaymentDescriptor>(&json) {
                Ok(descriptor) => return Ok(Some(descriptor)),
                Err(e) => warn!("Stored scan descriptor unreadable, retrying raw payload: {}", e),
            }
        }

        let Some(pending) = pending else {
            return Ok(None);
        };

        let raw: String = serde_json::from_str(&pending).unwrap_or(pending);
        match extract_payment(&raw) {
            Ok(descriptor) => Ok(Some(descriptor)),
            Err(e) => {
                warn!("Stored raw scan no longer parses: {}", e);
                Ok(None)
            }
        }
    }

    /// Forget any stored scan
    pub fn clear(&self) -> Result<()> {
        self.store.remove(Self::PARSED_SCAN_KEY)?;
        self.store.remove(Self::PENDING_SCAN_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanned() -> PaymentDescriptor {
        extract_payment("upi://pay?pa=merchant@upi&pn=Test%20Merchant&am=100").unwrap()
    }

    #[test]
    fn test_persist_and_recover() {
        let store = MemorySessionStore::new();
        let session = ScanSession::new(&store);

        session.persist_scan(&scanned()).unwrap();
        assert_eq!(store.len(), 2);

        let recovered = session.recover_scan().unwrap().unwrap();
        assert_eq!(recovered, scanned());
        assert!(store.is_empty());
        assert!(session.recover_scan().unwrap().is_none());
    }

    #[test]
    fn test_recover_from_raw_only() {
        let store = MemorySessionStore::new();
        store
            .set(ScanSession::PENDING_SCAN_KEY, "\"upi://pay?pa=cafe@okhdfc&am=20\"")
            .unwrap();

        let recovered = ScanSession::new(&store).recover_scan().unwrap().unwrap();
        assert_eq!(recovered.identifier().as_str(), "cafe@okhdfc");
        assert_eq!(recovered.amount(), Some("20"));
    }

    #[test]
    fn test_recover_with_corrupt_descriptor() {
        let store = MemorySessionStore::new();
        store.set(ScanSession::PARSED_SCAN_KEY, "{not json").unwrap();
        store
            .set(ScanSession::PENDING_SCAN_KEY, "\"shop@upi\"")
            .unwrap();

        let recovered = ScanSession::new(&store).recover_scan().unwrap().unwrap();
        assert_eq!(recovered.identifier().as_str(), "shop@upi");
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session"));

        assert_eq!(store.get("auth").unwrap(), None);
        store.set("auth", "{\"a\":1}").unwrap();
        assert_eq!(store.get("auth").unwrap().as_deref(), Some("{\"a\":1}"));

        store.remove("auth").unwrap();
        store.remove("auth").unwrap();
        assert_eq!(store.get("auth").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        assert!(store.set("../escape", "x").is_err());
        assert!(store.get("").is_err());
    }
}
