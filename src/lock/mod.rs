//! Distributed lock backends.

mod http;
mod memory;

use std::time::Duration;

pub use http::HttpLockClient;
pub use memory::MemoryLock;

use crate::config::CapturaConfig;
use crate::error::LockError;
use crate::ports::{DistributedLock, LockToken};

/// Lock backend picked at startup from configuration.
pub enum LockBackend {
    Http(HttpLockClient),
    Memory(MemoryLock),
}

impl LockBackend {
    /// HTTP client when `lock_service_url` is set, in-process lock otherwise.
    pub fn from_config(config: &CapturaConfig) -> Result<Self, LockError> {
        match &config.lock_service_url {
            Some(url) => Ok(Self::Http(HttpLockClient::new(url.as_str())?)),
            None => Ok(Self::Memory(MemoryLock::new())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Memory(_) => "memory",
        }
    }
}

impl DistributedLock for LockBackend {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<LockToken, LockError> {
        match self {
            Self::Http(lock) => lock.acquire(key, ttl).await,
            Self::Memory(lock) => lock.acquire(key, ttl).await,
        }
    }

    async fn release(&self, token: LockToken) -> Result<(), LockError> {
        match self {
            Self::Http(lock) => lock.release(token).await,
            Self::Memory(lock) => lock.release(token).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_follows_lock_service_url() {
        let config = CapturaConfig::default();
        assert_eq!(LockBackend::from_config(&config).unwrap().name(), "memory");

        let config = CapturaConfig {
            lock_service_url: Some("http://127.0.0.1:7000".into()),
            ..CapturaConfig::default()
        };
        assert_eq!(LockBackend::from_config(&config).unwrap().name(), "http");
    }

    #[tokio::test]
    async fn memory_backend_delegates() {
        let lock = LockBackend::from_config(&CapturaConfig::default()).unwrap();
        let token = lock.acquire("k", Duration::from_secs(5)).await.unwrap();
        assert!(matches!(
            lock.acquire("k", Duration::from_secs(5)).await,
            Err(LockError::Held { .. })
        ));
        lock.release(token).await.unwrap();
        assert!(lock.acquire("k", Duration::from_secs(5)).await.is_ok());
    }
}
