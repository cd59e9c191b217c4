//! Credential records and the shared in-memory store.
//!
//! # File format
//!
//! ```json
//! [
//!   {"handle": "alice", "pin": "123456"},
//!   {"handle": "bob", "pin": "654321"}
//! ]
//! ```
//!
//! The remote source serves the same format.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::error::{StorageError, StorageResult};

/// One entry of the credential file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Display name greeted on success.
    #[serde(alias = "Handle")]
    pub handle: String,

    #[serde(alias = "Pin")]
    pub pin: String,
}

impl CredentialRecord {
    pub fn new(handle: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            pin: pin.into(),
        }
    }
}

/// Immutable PIN to handle mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    by_pin: HashMap<String, String>,
}

impl Credentials {
    /// Build the mapping. A PIN listed twice keeps the last handle.
    pub fn from_records(records: Vec<CredentialRecord>) -> Self {
        let mut by_pin = HashMap::with_capacity(records.len());
        for record in records {
            if let Some(previous) = by_pin.insert(record.pin, record.handle.clone()) {
                warn!("Duplicate PIN for {} and {}, keeping {}", previous, record.handle, record.handle);
            }
        }
        Self { by_pin }
    }

    /// Parse a JSON array of records.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        let records: Vec<CredentialRecord> = serde_json::from_slice(bytes)?;
        Ok(Self::from_records(records))
    }

    /// Find the handle for `pin`.
    ///
    /// Every stored PIN is compared in constant time and the scan never
    /// stops early, so the time taken does not depend on which entry matched.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinpad_storage::{CredentialRecord, Credentials};
    ///
    /// let credentials = Credentials::from_records(vec![CredentialRecord::new("secure", "123456")]);
    /// assert_eq!(credentials.lookup("123456"), Some("secure"));
    /// assert_eq!(credentials.lookup("654321"), None);
    /// ```
    pub fn lookup(&self, pin: &str) -> Option<&str> {
        let mut found = None;
        for (stored, handle) in &self.by_pin {
            if bool::from(stored.as_bytes().ct_eq(pin.as_bytes())) {
                found = Some(handle.as_str());
            }
        }
        found
    }

    pub fn len(&self) -> usize {
        self.by_pin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pin.is_empty()
    }

    /// Records sorted by PIN.
    pub fn to_records(&self) -> Vec<CredentialRecord> {
        let mut records: Vec<CredentialRecord> = self
            .by_pin
            .iter()
            .map(|(pin, handle)| CredentialRecord::new(handle.clone(), pin.clone()))
            .collect();
        records.sort_by(|a, b| a.pin.cmp(&b.pin));
        records
    }
}

/// Read a credential file.
///
/// A missing file is an empty mapping.
///
/// # Errors
///
/// Any other read failure and any parse failure.
pub fn load_file(path: &Path) -> StorageResult<Credentials> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Credentials::default()),
        Err(source) => {
            return Err(StorageError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    Credentials::from_json(&bytes).map_err(|source| StorageError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read access to the authorization list.
pub trait CredentialLookup: Send + Sync + 'static {
    /// Handle of the credential holding `pin`, if any.
    fn lookup(&self, pin: &str) -> Option<String>;
}

impl<T: CredentialLookup> CredentialLookup for Arc<T> {
    fn lookup(&self, pin: &str) -> Option<String> {
        (**self).lookup(pin)
    }
}

/// Current credentials plus the file they persist to.
///
/// Clones share the same mapping. Readers work on a snapshot; the
/// synchronizer swaps the whole mapping at once, so a reader never sees a
/// partial update.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    current: Arc<RwLock<Arc<Credentials>>>,
}

impl CredentialStore {
    /// Load the store from `path` (see [`load_file`]).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] or [`StorageError::Parse`].
    pub fn load(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let credentials = load_file(&path)?;
        info!("Loaded {} credentials from {}", credentials.len(), path.display());
        Ok(Self::with_credentials(path, credentials))
    }

    pub fn with_credentials(path: impl Into<PathBuf>, credentials: Credentials) -> Self {
        Self {
            path: path.into(),
            current: Arc::new(RwLock::new(Arc::new(credentials))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The mapping as it is right now.
    pub fn snapshot(&self) -> Arc<Credentials> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in a new mapping.
    pub fn replace(&self, credentials: Credentials) {
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(credentials);
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl CredentialLookup for CredentialStore {
    fn lookup(&self, pin: &str) -> Option<String> {
        self.snapshot().lookup(pin).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample() -> Credentials {
        Credentials::from_records(vec![
            CredentialRecord::new("secure", "123456"),
            CredentialRecord::new("bob", "654321"),
        ])
    }

    #[rstest]
    #[case("123456", Some("secure"))]
    #[case("654321", Some("bob"))]
    #[case("000000", None)]
    #[case("12345", None)]
    #[case("", None)]
    fn test_lookup(#[case] pin: &str, #[case] expected: Option<&str>) {
        assert_eq!(sample().lookup(pin), expected);
    }

    #[test]
    fn test_duplicate_pin_last_wins() {
        let credentials = Credentials::from_records(vec![
            CredentialRecord::new("first", "111111"),
            CredentialRecord::new("second", "111111"),
        ]);
        assert_eq!(credentials.len(), 1);
        assert_eq!(credentials.lookup("111111"), Some("second"));
    }

    #[test]
    fn test_parse_json() {
        let json = br#"[{"handle":"alice","pin":"123456"},{"Handle":"bob","Pin":"222222"}]"#;
        let credentials = Credentials::from_json(json).unwrap();
        assert_eq!(credentials.lookup("123456"), Some("alice"));
        assert_eq!(credentials.lookup("222222"), Some("bob"));
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(Credentials::from_json(br#"{"handle":"alice"}"#).is_err());
        assert!(Credentials::from_json(b"not json").is_err());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::load(dir.path().join("pins.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pins.json");
        std::fs::write(&path, b"[{").unwrap();

        assert!(matches!(CredentialStore::load(&path), Err(StorageError::Parse { .. })));
    }

    #[test]
    fn test_unreadable_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be
        assert!(matches!(
            CredentialStore::load(dir.path()),
            Err(StorageError::Read { .. })
        ));
    }

    #[test]
    fn test_replace_is_visible_to_clones() {
        let store = CredentialStore::with_credentials("pins.json", sample());
        let reader = store.clone();
        let before = reader.snapshot();

        store.replace(Credentials::from_records(vec![CredentialRecord::new("carol", "999999")]));

        assert_eq!(reader.lookup("999999"), Some("carol".to_string()));
        assert_eq!(reader.lookup("123456"), None);
        // Old snapshots stay intact
        assert_eq!(before.lookup("123456"), Some("secure"));
    }

    #[test]
    fn test_to_records_sorted() {
        let records = sample().to_records();
        assert_eq!(records[0], CredentialRecord::new("secure", "123456"));
        assert_eq!(records[1], CredentialRecord::new("bob", "654321"));
    }
}
