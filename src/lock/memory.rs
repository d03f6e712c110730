use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::LockError;
use crate::ports::{DistributedLock, LockToken};

#[derive(Debug)]
struct Entry {
    owner: String,
    expires_at: Instant,
}

/// In-process lock with TTL expiry, for single-node runs and tests.
///
/// Share it between invocations behind an `Arc`. An expired entry is treated
/// as free, which is the crash-recovery path of a real lock service.
#[derive(Debug, Default)]
pub struct MemoryLock {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no unexpired lock is held.
    pub async fn is_empty(&self) -> bool {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        !entries.values().any(|e| e.expires_at > now)
    }
}

impl DistributedLock for MemoryLock {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<LockToken, LockError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if entries.get(key).is_some_and(|entry| entry.expires_at > now) {
            return Err(LockError::Held {
                key: key.to_string(),
            });
        }
        let owner = Uuid::new_v4().to_string();
        entries.insert(
            key.to_string(),
            Entry {
                owner: owner.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(LockToken {
            key: key.to_string(),
            owner,
        })
    }

    async fn release(&self, token: LockToken) -> Result<(), LockError> {
        let mut entries = self.entries.lock().await;
        match entries.get(&token.key).map(|entry| entry.owner == token.owner) {
            Some(true) => {
                entries.remove(&token.key);
                Ok(())
            }
            // Expired and taken over by someone else: not ours to release.
            Some(false) => Err(LockError::Service(format!(
                "lock {} is owned by another holder",
                token.key
            ))),
            None => Ok(()),
        }
    }
}
