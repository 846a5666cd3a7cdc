//! Provider adapters: one per upstream LLM API.
//!
//! The router never knows a provider's wire format. It asks the adapter to build a
//! [`ProviderRequest`] for a candidate and to pull the generated text back out of the
//! decoded response envelope.

mod chat_completions;
mod gemini;

pub use chat_completions::ChatCompletionsAdapter;
pub use gemini::GeminiAdapter;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::conversation::Turn;
use crate::error::{GatewayError, GatewayResult};

/// Placeholder in `endpoint_template` replaced by the candidate's model id.
pub const MODEL_PLACEHOLDER: &str = "{model}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    Groq,
    Openai,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Gemini, Provider::Groq, Provider::Openai];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Groq => "groq",
            Provider::Openai => "openai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "groq" => Ok(Provider::Groq),
            "openai" => Ok(Provider::Openai),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// One entry of a provider's ordered fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCandidate {
    /// Endpoint URL; `{model}` is substituted with `model_id`.
    pub endpoint_template: String,
    pub model_id: String,
    /// Ask the provider for strictly machine-parseable (JSON) output.
    #[serde(default)]
    pub force_json: bool,
}

impl ProviderCandidate {
    pub fn new(endpoint_template: &str, model_id: &str, force_json: bool) -> Self {
        Self {
            endpoint_template: endpoint_template.to_string(),
            model_id: model_id.to_string(),
            force_json,
        }
    }

    pub fn endpoint(&self) -> String {
        self.endpoint_template.replace(MODEL_PLACEHOLDER, &self.model_id)
    }
}

/// How the credential travels with the request.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Bearer(String),
    Query { name: &'static str, value: String },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Bearer(_) => f.write_str("Bearer(REDACTED)"),
            Auth::Query { name, .. } => write!(f, "Query({}=REDACTED)", name),
        }
    }
}

/// A fully built outbound call: POST `url` with JSON `body`.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub url: String,
    pub auth: Auth,
    pub body: serde_json::Value,
}

/// Capability set every provider implements.
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    fn build_request(
        &self,
        turns: &[Turn],
        system_instruction: Option<&str>,
        candidate: &ProviderCandidate,
        credential: &str,
    ) -> GatewayResult<ProviderRequest>;

    /// Generated text from a decoded success envelope; `None` when the field is absent.
    fn extract_text(&self, response: &serde_json::Value) -> Option<String>;
}

/// Serialize a typed request body. A failure fails only the current candidate.
fn encode_body<T: Serialize>(body: &T) -> GatewayResult<serde_json::Value> {
    serde_json::to_value(body)
        .map_err(|e| GatewayError::ProviderTransport(format!("could not encode request body: {}", e)))
}

/// The adapter that speaks `provider`'s wire format.
pub fn adapter_for(provider: Provider) -> Box<dyn ProviderAdapter> {
    match provider {
        Provider::Gemini => Box::new(GeminiAdapter),
        Provider::Groq | Provider::Openai => Box::new(ChatCompletionsAdapter::new(provider)),
    }
}
