//! Chat handler: `POST /api/chat`.
//!
//! The UI sends the whole conversation each time; the gateway owns the system prompt and
//! the provider fallback chain. Replies are always `{text, intent?}` or `{error}`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use parley_core::{ChatRequest, GatewayError, Message, Provider};
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub provider: Option<Provider>,
}

fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        GatewayError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        GatewayError::ProviderExhausted { .. }
        | GatewayError::ProviderTransport(_)
        | GatewayError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
    }
}

pub async fn chat_post(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => {
            tracing::info!(target: "parley::http", error = %rejection.body_text(), "rejected chat body");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": rejection.body_text() })),
            );
        }
    };

    let request = ChatRequest {
        messages: body.messages,
        provider: body.provider.unwrap_or(state.gateway.config().default_provider),
    };

    match state.gateway.submit(request).await {
        Ok(reply) => match serde_json::to_value(&reply) {
            Ok(v) => (StatusCode::OK, Json(v)),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            ),
        },
        Err(e) => (status_for(&e), Json(serde_json::json!({ "error": e.to_string() }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_error_kind() {
        assert_eq!(
            status_for(&GatewayError::InvalidRequest("empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&GatewayError::Configuration("no key".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&GatewayError::ProviderExhausted {
                provider: Provider::Groq,
                attempts: 3,
                last_error: "timeout".into(),
            }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn provider_is_optional_in_body() {
        let body: ChatBody =
            serde_json::from_str(r#"{"messages":[{"role":"user","content":"hi"}]}"#).unwrap();
        assert!(body.provider.is_none());
        assert_eq!(body.messages.len(), 1);
    }

    #[test]
    fn unknown_role_fails_to_parse() {
        let parsed = serde_json::from_str::<ChatBody>(r#"{"messages":[{"role":"robot","content":"hi"}]}"#);
        assert!(parsed.is_err());
    }
}
