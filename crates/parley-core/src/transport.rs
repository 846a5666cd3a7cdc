//! Outbound HTTP seam. The router talks to [`ProviderTransport`]; production uses reqwest.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{GatewayError, GatewayResult};
use crate::providers::{Auth, ProviderRequest};
use crate::redact::redact_secrets;

/// Status and raw body of a completed HTTP exchange (any status).
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait ProviderTransport: Send + Sync {
    /// POST the request. `Err` only for failures where no response arrived.
    async fn send(&self, request: &ProviderRequest) -> GatewayResult<TransportResponse>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ProviderTransport for ReqwestTransport {
    async fn send(&self, request: &ProviderRequest) -> GatewayResult<TransportResponse> {
        let mut req = self
            .client
            .post(&request.url)
            .header("Content-Type", "application/json")
            .json(&request.body);
        req = match &request.auth {
            Auth::Bearer(token) => req.bearer_auth(token),
            Auth::Query { name, value } => req.query(&[(*name, value.as_str())]),
        };

        let res = req.send().await.map_err(|e| {
            GatewayError::ProviderTransport(redact_secrets(&e.without_url().to_string()))
        })?;
        let status = res.status().as_u16();
        let body = res.text().await.map_err(|e| {
            GatewayError::ProviderTransport(redact_secrets(&e.without_url().to_string()))
        })?;
        Ok(TransportResponse { status, body })
    }
}
