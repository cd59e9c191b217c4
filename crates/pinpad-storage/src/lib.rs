//! Credential storage for the pinpad controller.
//!
//! Holds the PIN to handle mapping used by the validator, persists it to a
//! JSON file and keeps it in sync with a remote list over HTTP.

pub mod credentials;
pub mod error;
pub mod indicator;
pub mod sync;

pub use credentials::{CredentialLookup, CredentialRecord, CredentialStore, Credentials, load_file};
pub use error::{StorageError, StorageResult};
pub use indicator::FailureIndicator;
pub use sync::{SyncConfig, SyncOutcome, Synchronizer};
