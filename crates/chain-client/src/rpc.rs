use crate::{AdRecord, ChainError, ChainQuery};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const JSON_VERSION: &str = "2.0";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Immediate retries after a transport failure before the error surfaces.
const TRANSPORT_RETRIES: u8 = 2;
const HEALTH_METHOD: &str = "system_health";

#[derive(Serialize)]
struct RpcCall<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcFailure>,
}

#[derive(Deserialize)]
struct RpcFailure {
    code: i64,
    message: String,
}

/// JSON-RPC client for the external chain.
///
/// The HTTP handle is created lazily on first use, verified with a
/// health-check round-trip, and cached for every later call. A transport
/// failure clears the handle and the call is retried immediately a small
/// number of times before the error reaches the caller.
pub struct ChainClient {
    endpoint: String,
    timeout: Duration,
    retries: u8,
    next_id: AtomicU64,
    handle: Mutex<Option<reqwest::Client>>,
}

impl ChainClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
            retries: TRANSPORT_RETRIES,
            next_id: AtomicU64::new(0),
            handle: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Drop the cached handle; the next call re-establishes it.
    pub async fn disconnect(&self) {
        self.handle.lock().await.take();
    }

    async fn ensure_handle(&self) -> Result<reqwest::Client, ChainError> {
        let mut guard = self.handle.lock().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| ChainError::Connect(err.to_string()))?;
        self.roundtrip::<Value>(&client, HEALTH_METHOD, json!([]))
            .await
            .map_err(|err| ChainError::Connect(err.to_string()))?;
        debug!(endpoint = %self.endpoint, "chain connection established");
        *guard = Some(client.clone());
        Ok(client)
    }

    async fn roundtrip<T: DeserializeOwned>(
        &self,
        client: &reqwest::Client,
        method: &str,
        params: Value,
    ) -> Result<T, ChainError> {
        let call = RpcCall {
            jsonrpc: JSON_VERSION,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let reply: RpcReply = client
            .post(&self.endpoint)
            .json(&call)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if let Some(failure) = reply.error {
            return Err(ChainError::Rpc {
                code: failure.code,
                message: failure.message,
            });
        }
        let result = reply.result.unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(|err| ChainError::Decode(err.to_string()))
    }

    /// Invoke `method`, reconnecting and retrying on transport failures.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ChainError> {
        let mut last_error: Option<ChainError> = None;
        for attempt in 0..=self.retries {
            if attempt > 0 {
                warn!(method, attempt, "retrying chain call");
            }
            let client = match self.ensure_handle().await {
                Ok(client) => client,
                Err(err) => {
                    last_error = Some(err);
                    continue;
                }
            };
            match self.roundtrip(&client, method, params.clone()).await {
                Ok(value) => return Ok(value),
                Err(err @ ChainError::Transport(_)) => {
                    self.disconnect().await;
                    warn!(method, error = %err, "chain transport failure");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_error.unwrap_or_else(|| ChainError::Connect("retries exhausted".into())))
    }
}

#[async_trait]
impl ChainQuery for ChainClient {
    async fn connect(&self) -> Result<(), ChainError> {
        self.ensure_handle().await.map(|_| ())
    }

    async fn ad(&self, ad_id: u32) -> Result<Option<AdRecord>, ChainError> {
        self.call("ads_ad", json!([ad_id])).await
    }

    async fn pending_sponsorship(&self, account: &str) -> Result<Option<u32>, ChainError> {
        self.call("feeSponsorship_pendingSponsorship", json!([account]))
            .await
    }

    async fn submit_extrinsic(&self, call_hex: &str) -> Result<String, ChainError> {
        self.call("author_submitExtrinsic", json!([call_hex])).await
    }
}
