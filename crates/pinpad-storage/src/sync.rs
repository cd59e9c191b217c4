//! Periodic refresh of the credential file from a remote URL.
//!
//! Each update downloads the whole list, and compares its SHA-256 with the
//! last applied one. A changed payload is staged to a temporary file next to
//! the credential file, parsed from there, renamed over the permanent path
//! and only then swapped into memory.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use pinpad_core::constants::{
    DEFAULT_PIN_URL, DEFAULT_SYNC_FAILURE_THRESHOLD, DEFAULT_SYNC_INTERVAL_SECS,
};
use sha2::{Digest, Sha256};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::credentials::{CredentialStore, Credentials, load_file};
use crate::error::{StorageError, StorageResult};
use crate::indicator::{DEFAULT_INDICATOR_PERIOD, FailureIndicator};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cap on the downloaded payload.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

/// Synchronizer settings.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub url: String,
    pub interval: Duration,
    pub request_timeout: Duration,
    pub max_payload: usize,

    /// Consecutive failures before the indicator engages.
    pub failure_threshold: u32,

    pub indicator_period: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PIN_URL.to_string(),
            interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_payload: DEFAULT_MAX_PAYLOAD,
            failure_threshold: DEFAULT_SYNC_FAILURE_THRESHOLD,
            indicator_period: DEFAULT_INDICATOR_PERIOD,
        }
    }
}

/// Result of one update attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Remote content matches the last applied payload.
    Unchanged,

    /// New content was persisted and swapped in.
    Applied { entries: usize },

    /// Nothing changed locally.
    Failed(String),
}

/// Keeps a [`CredentialStore`] in step with the remote list.
#[derive(Debug)]
pub struct Synchronizer {
    store: CredentialStore,
    client: reqwest::Client,
    config: SyncConfig,
    last_checksum: Option<[u8; 32]>,
    consecutive_failures: u32,
    indicator: FailureIndicator,
    last_success: Option<DateTime<Utc>>,
}

impl Synchronizer {
    /// # Errors
    ///
    /// Returns [`StorageError::Fetch`] if the HTTP client cannot be built.
    pub fn new(
        store: CredentialStore,
        config: SyncConfig,
        indicator: FailureIndicator,
    ) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            store,
            client,
            config,
            last_checksum: None,
            consecutive_failures: 0,
            indicator,
            last_success: None,
        })
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }

    /// Hex SHA-256 of the last applied credential list.
    pub fn applied_digest(&self) -> Option<String> {
        self.last_checksum.map(hex::encode)
    }

    pub fn indicator_engaged(&self) -> bool {
        self.indicator.is_running()
    }

    /// Update from the configured URL.
    pub async fn update(&mut self) -> SyncOutcome {
        let url = self.config.url.clone();
        self.update_from(&url).await
    }

    /// Fetch `url` and apply it if its content changed.
    ///
    /// Failures never touch the store or the credential file; they only
    /// count towards the indicator threshold.
    pub async fn update_from(&mut self, url: &str) -> SyncOutcome {
        match self.try_update(url).await {
            Ok(outcome) => {
                self.consecutive_failures = 0;
                self.last_success = Some(Utc::now());
                self.indicator.clear();
                outcome
            }
            Err(e) => {
                self.consecutive_failures += 1;
                warn!(
                    "Credential sync failed ({} in a row): {}",
                    self.consecutive_failures, e
                );
                if self.consecutive_failures >= self.config.failure_threshold {
                    self.indicator.engage();
                }
                SyncOutcome::Failed(e.to_string())
            }
        }
    }

    /// Update every `interval`, starting one interval from now.
    pub async fn run(mut self) {
        let start = Instant::now() + self.config.interval;
        let mut ticker = tokio::time::interval_at(start, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.update().await;
        }
    }

    async fn try_update(&mut self, url: &str) -> StorageResult<SyncOutcome> {
        let (body, checksum) = self.fetch(url).await?;

        if self.last_checksum == Some(checksum) {
            debug!("Credential list unchanged");
            return Ok(SyncOutcome::Unchanged);
        }

        let path = self.store.path().to_path_buf();
        let credentials = tokio::task::spawn_blocking(move || stage(&path, &body))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        let entries = credentials.len();
        self.store.replace(credentials);
        self.last_checksum = Some(checksum);
        info!(
            "Applied credential list with {} entries (sha256 {})",
            entries,
            hex::encode(checksum)
        );

        Ok(SyncOutcome::Applied { entries })
    }

    /// Download the body, hashing as it streams in.
    async fn fetch(&self, url: &str) -> StorageResult<(Vec<u8>, [u8; 32])> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::HttpStatus(status.as_u16()));
        }

        let limit = self.config.max_payload;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(StorageError::PayloadTooLarge { limit });
        }

        let mut hasher = Sha256::new();
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if body.len() + chunk.len() > limit {
                return Err(StorageError::PayloadTooLarge { limit });
            }
            hasher.update(&chunk);
            body.extend_from_slice(&chunk);
        }

        Ok((body, hasher.finalize().into()))
    }
}

/// Write `body` to a temporary file beside `path`, load it, then rename it
/// over `path`. The temporary file is removed on every failure.
fn stage(path: &Path, body: &[u8]) -> StorageResult<Credentials> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let prefix = path
        .file_name()
        .map(|name| format!("{}.", name.to_string_lossy()))
        .unwrap_or_else(|| "credentials.".to_string());

    let mut staged = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(StorageError::Persist)?;
    staged.write_all(body).map_err(StorageError::Persist)?;
    staged.as_file().sync_all().map_err(StorageError::Persist)?;

    let credentials = load_file(staged.path())?;

    staged
        .persist(path)
        .map_err(|e| StorageError::Persist(e.error))?;

    Ok(credentials)
}
