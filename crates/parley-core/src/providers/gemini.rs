//! Gemini `generateContent` adapter.

use serde::Serialize;

use super::{encode_body, Auth, Provider, ProviderAdapter, ProviderCandidate, ProviderRequest};
use crate::conversation::{Turn, TurnRole};
use crate::error::GatewayResult;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiAdapter;

impl ProviderAdapter for GeminiAdapter {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn build_request(
        &self,
        turns: &[Turn],
        system_instruction: Option<&str>,
        candidate: &ProviderCandidate,
        credential: &str,
    ) -> GatewayResult<ProviderRequest> {
        let contents = turns
            .iter()
            .map(|t| Content {
                role: match t.role {
                    TurnRole::User => "user",
                    TurnRole::Model => "model",
                },
                parts: vec![Part { text: &t.text }],
            })
            .collect();

        let body = GenerateContentRequest {
            contents,
            system_instruction: system_instruction
                .filter(|s| !s.trim().is_empty())
                .map(|s| SystemInstruction { parts: vec![Part { text: s }] }),
            generation_config: candidate.force_json.then_some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        };

        Ok(ProviderRequest {
            url: candidate.endpoint(),
            auth: Auth::Query {
                name: "key",
                value: credential.to_string(),
            },
            body: encode_body(&body)?,
        })
    }

    /// `candidates[0].content.parts[*].text`, concatenated.
    fn extract_text(&self, response: &serde_json::Value) -> Option<String> {
        let parts = response
            .get("candidates")?
            .get(0)?
            .get("content")?
            .get("parts")?
            .as_array()?;
        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
