//! Balance service client

use std::time::Duration;

use futures::future::try_join_all;
use thiserror::Error;
use tracing::{debug, warn};

use super::wire::{BalancesRequest, BalancesResponse, ChainsResponse};
use crate::config::ApiConfig;
use crate::domain::{AddressResult, NetworkRef, QueryResults, QueryTarget};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("no balance data for {0}")]
    MissingAddress(String),
}

impl ApiError {
    /// The service could not be reached or did not answer in time, as
    /// opposed to answering with data.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Remote balance service
#[async_trait::async_trait]
pub trait BalanceApi: Send + Sync {
    /// Networks the service supports, optionally filtered by keyword
    async fn list_networks(&self, keyword: Option<&str>) -> Result<Vec<NetworkRef>, ApiError>;

    /// Balances of one address on the given networks (all networks if empty)
    async fn fetch_address(
        &self,
        address: &str,
        network_keys: &[String],
    ) -> Result<AddressResult, ApiError>;
}

/// Fetch balances for a query target. Batch targets fan out one call per
/// address and fail as a whole if any call fails.
pub async fn fetch_target(
    api: &dyn BalanceApi,
    target: &QueryTarget,
    network_keys: &[String],
) -> Result<QueryResults, ApiError> {
    match target {
        QueryTarget::Address(address) => api
            .fetch_address(address, network_keys)
            .await
            .map(QueryResults::Single),
        QueryTarget::Batch(addresses) => {
            let calls = addresses
                .iter()
                .map(|address| api.fetch_address(address, network_keys));
            try_join_all(calls).await.map(QueryResults::Batch)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            delay: Duration::from_secs(1),
        }
    }
}

/// HTTP implementation of [`BalanceApi`]
pub struct HttpBalanceClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpBalanceClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy {
                retries: config.retries,
                delay: Duration::from_millis(config.retry_delay_ms),
            },
        })
    }

    async fn with_retry<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0u32;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.retry.retries => {
                    attempt += 1;
                    warn!(what, attempt, error = %err, "request failed, retrying");
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[async_trait::async_trait]
impl BalanceApi for HttpBalanceClient {
    async fn list_networks(&self, keyword: Option<&str>) -> Result<Vec<NetworkRef>, ApiError> {
        let url = format!("{}/chains", self.base_url);
        let keyword = keyword.map(str::trim).filter(|k| !k.is_empty());
        let response: ChainsResponse = self
            .with_retry("list_networks", || {
                let mut request = self.http.get(&url);
                if let Some(keyword) = keyword {
                    request = request.query(&[("keyword", keyword)]);
                }
                async move { Self::read_json(request.send().await?).await }
            })
            .await?;
        debug!(count = response.items.len(), ?keyword, "catalog loaded");
        Ok(response.items.into_iter().map(NetworkRef::from).collect())
    }

    async fn fetch_address(
        &self,
        address: &str,
        network_keys: &[String],
    ) -> Result<AddressResult, ApiError> {
        let url = format!("{}/addresses/balances", self.base_url);
        let body = BalancesRequest {
            addresses: vec![address],
            chains: (!network_keys.is_empty()).then_some(network_keys),
        };
        let response: BalancesResponse = self
            .with_retry("fetch_address", || {
                let request = self.http.post(&url).json(&body);
                async move { Self::read_json(request.send().await?).await }
            })
            .await?;

        let fallback_price = response.eth_price;
        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::MissingAddress(address.to_string()))?;
        let mut result = item.into_result(fallback_price);
        if result.address.is_empty() {
            result.address = address.to_string();
        }
        Ok(result)
    }
}
