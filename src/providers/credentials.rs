/*!
 * Round-robin rotation over a provider's API keys.
 *
 * The rotation index lives in the key-value store so that it survives
 * restarts and is shared by every client on the same store. Access to the
 * index is exclusive: within the process through an async mutex, across
 * processes through a lock record `{holder, acquired_at}` in the store. A
 * record older than the stale timeout is treated as abandoned.
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::ProviderError;
use crate::store::{KeyValueStore, get_json, set_json};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(25);
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct LockRecord {
    holder: String,
    acquired_at: i64,
}

#[derive(Debug)]
pub struct CredentialRotator {
    provider_id: String,
    keys: Vec<String>,
    store: Arc<dyn KeyValueStore>,
    local: Mutex<()>,
    holder: String,
    lock_timeout: Duration,
    stale_after: Duration,
}

/// Split a key list written as one string (`,` `;` or newline separated)
pub fn parse_keys(text: &str) -> Vec<String> {
    text.split([',', ';', '\n', '，', '；'])
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn store_error(e: anyhow::Error) -> ProviderError {
    ProviderError::Unclassified {
        status_code: None,
        message: format!("Credential store unavailable: {}", e),
    }
}

impl CredentialRotator {
    pub fn new(provider_id: &str, keys: Vec<String>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            keys: keys.into_iter().filter(|k| !k.trim().is_empty()).collect(),
            store,
            local: Mutex::new(()),
            holder: Uuid::new_v4().to_string(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }

    pub fn with_timeouts(mut self, lock_timeout: Duration, stale_after: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self.stale_after = stale_after;
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn index_key(&self) -> String {
        format!("credential_index:{}", self.provider_id)
    }

    fn lock_key(&self) -> String {
        format!("credential_lock:{}", self.provider_id)
    }

    /// The next key in rotation
    pub async fn next_key(&self) -> Result<String, ProviderError> {
        if self.keys.is_empty() {
            return Err(ProviderError::AuthInvalid(format!(
                "No API key configured for {}",
                self.provider_id
            )));
        }
        if self.keys.len() == 1 {
            return Ok(self.keys[0].clone());
        }

        let _guard = tokio::time::timeout(self.lock_timeout, self.local.lock())
            .await
            .map_err(|_| ProviderError::Timeout("Timed out waiting for the credential lock".to_string()))?;
        self.acquire_record().await?;

        let result = self.advance();
        if let Err(e) = self.store.delete(&self.lock_key()) {
            warn!("Failed to release credential lock: {}", e);
        }
        result
    }

    fn advance(&self) -> Result<String, ProviderError> {
        let store = self.store.as_ref();
        let index = get_json::<usize>(store, &self.index_key()).map_err(store_error)?.unwrap_or(0) % self.keys.len();
        set_json(store, &self.index_key(), &((index + 1) % self.keys.len())).map_err(store_error)?;
        debug!("Using key #{} of {} for {}", index + 1, self.keys.len(), self.provider_id);
        Ok(self.keys[index].clone())
    }

    async fn acquire_record(&self) -> Result<(), ProviderError> {
        let store = self.store.as_ref();
        let deadline = Instant::now() + self.lock_timeout;
        loop {
            let now = Utc::now().timestamp_millis();
            let record: Option<LockRecord> = get_json(store, &self.lock_key()).map_err(store_error)?;
            match record {
                Some(r) if r.holder != self.holder && now - r.acquired_at < self.stale_after.as_millis() as i64 => {
                    if Instant::now() >= deadline {
                        warn!("Credential lock for {} held too long by {}, taking over", self.provider_id, r.holder);
                        break;
                    }
                    tokio::time::sleep(LOCK_POLL_INTERVAL).await;
                }
                Some(r) if r.holder != self.holder => {
                    debug!("Discarding stale credential lock held by {}", r.holder);
                    break;
                }
                _ => break,
            }
        }

        let record = LockRecord {
            holder: self.holder.clone(),
            acquired_at: Utc::now().timestamp_millis(),
        };
        set_json(store, &self.lock_key(), &record).map_err(store_error)
    }
}
