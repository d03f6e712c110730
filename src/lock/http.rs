//! Cliente HTTP para um serviço de lock distribuído.
//!
//! Contrato esperado do serviço:
//! - `POST {base}/locks/{key}` com `{"owner": "...", "ttl_seconds": N}`:
//!   200/201 quando o lock foi concedido, 409 quando já está em uso.
//! - `DELETE {base}/locks/{key}?owner=...`: 200/204 liberado, 404 já expirado.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::LockError;
use crate::ports::{DistributedLock, LockToken};

#[derive(Debug, Serialize)]
struct AcquireBody<'a> {
    owner: &'a str,
    ttl_seconds: u64,
}

pub struct HttpLockClient {
    client: Client,
    base_url: String,
}

impl HttpLockClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, LockError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn lock_url(&self, key: &str) -> String {
        format!("{}/locks/{}", self.base_url, key)
    }
}

impl DistributedLock for HttpLockClient {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<LockToken, LockError> {
        let owner = Uuid::new_v4().to_string();
        // The service counts in whole seconds; never send a zero TTL.
        let ttl_seconds = ttl.as_secs().max(1);
        let response = self
            .client
            .post(self.lock_url(key))
            .json(&AcquireBody {
                owner: &owner,
                ttl_seconds,
            })
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                debug!(key, ttl_seconds, "Lock acquired");
                Ok(LockToken {
                    key: key.to_string(),
                    owner,
                })
            }
            StatusCode::CONFLICT => Err(LockError::Held {
                key: key.to_string(),
            }),
            status => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown error".to_string());
                Err(LockError::Service(format!(
                    "acquire returned status {}: {message}",
                    status.as_u16()
                )))
            }
        }
    }

    async fn release(&self, token: LockToken) -> Result<(), LockError> {
        let response = self
            .client
            .delete(self.lock_url(&token.key))
            .query(&[("owner", token.owner.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
                debug!(key = %token.key, "Lock released");
                Ok(())
            }
            status => Err(LockError::Service(format!(
                "release returned status {}",
                status.as_u16()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn acquire_sends_owner_and_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/locks/captura:processo:1"))
            .and(body_partial_json(serde_json::json!({ "ttl_seconds": 300 })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpLockClient::new(server.uri()).unwrap();
        let token = client
            .acquire("captura:processo:1", Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(token.key, "captura:processo:1");
        assert!(!token.owner.is_empty());
    }

    #[tokio::test]
    async fn conflict_maps_to_held() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let client = HttpLockClient::new(format!("{}/", server.uri())).unwrap();
        let err = client
            .acquire("captura:processo:2", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::Held { .. }));
    }

    #[tokio::test]
    async fn server_error_maps_to_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("redis down"))
            .mount(&server)
            .await;

        let client = HttpLockClient::new(server.uri()).unwrap();
        let err = client
            .acquire("k", Duration::from_secs(60))
            .await
            .unwrap_err();
        match err {
            LockError::Service(msg) => {
                assert!(msg.contains("503"));
                assert!(msg.contains("redis down"));
            }
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn release_passes_owner() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/locks/k"))
            .and(query_param("owner", "abc"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpLockClient::new(server.uri()).unwrap();
        client
            .release(LockToken {
                key: "k".into(),
                owner: "abc".into(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn release_of_expired_lock_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpLockClient::new(server.uri()).unwrap();
        let result = client
            .release(LockToken {
                key: "k".into(),
                owner: "abc".into(),
            })
            .await;
        assert!(result.is_ok());
    }
}
