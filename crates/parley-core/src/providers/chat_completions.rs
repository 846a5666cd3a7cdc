//! OpenAI-compatible `chat/completions` adapter (Groq, OpenAI).

use serde::{Deserialize, Serialize};

use super::{encode_body, Auth, Provider, ProviderAdapter, ProviderCandidate, ProviderRequest};
use crate::conversation::{Turn, TurnRole};
use crate::error::GatewayResult;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ChatCompletionsAdapter {
    provider: Provider,
}

impl ChatCompletionsAdapter {
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }
}

impl ProviderAdapter for ChatCompletionsAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn build_request(
        &self,
        turns: &[Turn],
        system_instruction: Option<&str>,
        candidate: &ProviderCandidate,
        credential: &str,
    ) -> GatewayResult<ProviderRequest> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        if let Some(s) = system_instruction.filter(|s| !s.trim().is_empty()) {
            messages.push(ChatMessage { role: "system", content: s });
        }
        messages.extend(turns.iter().map(|t| ChatMessage {
            role: match t.role {
                TurnRole::User => "user",
                TurnRole::Model => "assistant",
            },
            content: &t.text,
        }));

        let body = ChatRequest {
            model: &candidate.model_id,
            messages,
            response_format: candidate
                .force_json
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        Ok(ProviderRequest {
            url: candidate.endpoint(),
            auth: Auth::Bearer(credential.to_string()),
            body: encode_body(&body)?,
        })
    }

    /// `choices[0].message.content`.
    fn extract_text(&self, response: &serde_json::Value) -> Option<String> {
        let parsed: ChatResponse = serde_json::from_value(response.clone()).ok()?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
    }
}
