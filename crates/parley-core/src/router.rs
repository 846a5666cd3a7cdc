//! Fallback router: walks a provider's candidate chain until one candidate yields text.
//!
//! Candidates are tried strictly one after another, never raced. Every attempt is bounded
//! by `request_timeout_ms`; dropping the `dispatch` future cancels the in-flight call.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::conversation::Turn;
use crate::error::{GatewayError, GatewayResult};
use crate::providers::{adapter_for, Provider, ProviderAdapter, ProviderCandidate};
use crate::redact::log_snippet;
use crate::transport::{ProviderTransport, ReqwestTransport};

const ERROR_BODY_SNIPPET: usize = 300;

pub struct FallbackRouter {
    config: Arc<GatewayConfig>,
    transport: Arc<dyn ProviderTransport>,
}

impl FallbackRouter {
    pub fn new(config: Arc<GatewayConfig>, transport: Arc<dyn ProviderTransport>) -> Self {
        Self { config, transport }
    }

    /// Router backed by a reqwest client using the configured timeout.
    pub fn from_config(config: Arc<GatewayConfig>) -> GatewayResult<Self> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Raw generated text from the first candidate that succeeds.
    pub async fn dispatch(&self, turns: &[Turn], provider: Provider) -> GatewayResult<String> {
        let credential = self.config.credential(provider).ok_or_else(|| {
            GatewayError::Configuration(format!(
                "no API key configured for {} (set {})",
                provider,
                self.config.providers.get(provider).api_key_env
            ))
        })?;
        let candidates = self.config.candidates(provider);
        if candidates.is_empty() {
            return Err(GatewayError::Configuration(format!(
                "no model candidates configured for {}",
                provider
            )));
        }

        let adapter = adapter_for(provider);
        let system_instruction = Some(self.config.system_prompt.as_str());
        let mut last_error = String::new();

        for (index, candidate) in candidates.iter().enumerate() {
            tracing::debug!(
                target: "parley::router",
                provider = %provider,
                model = %candidate.model_id,
                attempt = index + 1,
                "dispatching candidate"
            );
            match self
                .attempt(adapter.as_ref(), turns, system_instruction, candidate, credential)
                .await
            {
                Ok(text) => {
                    tracing::info!(
                        target: "parley::router",
                        provider = %provider,
                        model = %candidate.model_id,
                        attempt = index + 1,
                        "candidate succeeded"
                    );
                    return Ok(text);
                }
                Err(e) => {
                    tracing::warn!(
                        target: "parley::router",
                        provider = %provider,
                        model = %candidate.model_id,
                        attempt = index + 1,
                        error = %e,
                        "candidate failed; advancing"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(GatewayError::ProviderExhausted {
            provider,
            attempts: candidates.len(),
            last_error,
        })
    }

    async fn attempt(
        &self,
        adapter: &dyn ProviderAdapter,
        turns: &[Turn],
        system_instruction: Option<&str>,
        candidate: &ProviderCandidate,
        credential: &str,
    ) -> GatewayResult<String> {
        let request = adapter.build_request(turns, system_instruction, candidate, credential)?;
        let timeout = self.config.request_timeout();

        let response = tokio::time::timeout(timeout, self.transport.send(&request))
            .await
            .map_err(|_| {
                GatewayError::ProviderTransport(format!("timed out after {} ms", timeout.as_millis()))
            })??;

        if !response.is_success() {
            return Err(GatewayError::ProviderTransport(format!(
                "HTTP {}: {}",
                response.status,
                log_snippet(&response.body, ERROR_BODY_SNIPPET)
            )));
        }

        let value: serde_json::Value = serde_json::from_str(&response.body)
            .map_err(|e| GatewayError::MalformedResponse(format!("body is not JSON: {}", e)))?;
        adapter
            .extract_text(&value)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                GatewayError::MalformedResponse(format!(
                    "no text in {} response: {}",
                    adapter.provider(),
                    log_snippet(&response.body, ERROR_BODY_SNIPPET)
                ))
            })
    }
}
