//! Chat pipeline: messages → turns → fallback dispatch → reply cascade → persona pass.
//!
//! Per request: RECEIVED → NORMALIZED → DISPATCHED(i) … → PARSED → SANITIZED → RETURNED,
//! or FAILED. A missing credential fails before anything is dispatched.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;

use crate::config::GatewayConfig;
use crate::conversation::{normalize_conversation, Message, Role};
use crate::error::{GatewayError, GatewayResult};
use crate::history::{record_in_background, HistoryStore};
use crate::providers::Provider;
use crate::response::{normalize_reply, ChatReply, UNPARSEABLE_PLACEHOLDER};
use crate::router::FallbackRouter;
use crate::sanitizer::OutputSanitizer;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub provider: Provider,
}

pub struct ChatGateway {
    router: FallbackRouter,
    sanitizer: OutputSanitizer,
    history: Option<Arc<dyn HistoryStore>>,
}

impl ChatGateway {
    pub fn new(router: FallbackRouter) -> Self {
        let sanitizer = OutputSanitizer::new(router.config().persona_case);
        Self {
            router,
            sanitizer,
            history: None,
        }
    }

    pub fn with_history(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(store);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        self.router.config()
    }

    pub fn history(&self) -> Option<&Arc<dyn HistoryStore>> {
        self.history.as_ref()
    }

    /// Produce exactly one reply or one error for `request`.
    pub async fn submit(&self, request: ChatRequest) -> GatewayResult<ChatReply> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("chat", request_id = %request_id, provider = %request.provider);
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: ChatRequest) -> GatewayResult<ChatReply> {
        tracing::info!(target: "parley::gateway", messages = request.messages.len(), "received");
        if request.messages.is_empty() {
            tracing::info!(target: "parley::gateway", "failed: empty message list");
            return Err(GatewayError::InvalidRequest("messages must not be empty".into()));
        }

        let turns = normalize_conversation(&request.messages);
        tracing::debug!(target: "parley::gateway", turns = turns.len(), "normalized");

        let raw = match self.router.dispatch(&turns, request.provider).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(target: "parley::gateway", error = %e, "failed");
                return Err(e);
            }
        };

        let parsed = normalize_reply(&raw);
        tracing::debug!(target: "parley::gateway", intent = ?parsed.intent, "parsed");

        let mut text = self.sanitizer.sanitize(&parsed.text);
        if text.is_empty() {
            text = self.sanitizer.sanitize(UNPARSEABLE_PLACEHOLDER);
        }
        let reply = ChatReply {
            text,
            intent: parsed.intent,
        };

        // Only completed exchanges are persisted, user turn first.
        if let Some(store) = &self.history {
            let mut rows = Vec::with_capacity(2);
            if let Some(latest) = request.messages.iter().rev().find(|m| m.role == Role::User) {
                rows.push((Role::User, latest.content.clone()));
            }
            rows.push((Role::Assistant, reply.text.clone()));
            record_in_background(Arc::clone(store), rows);
        }
        tracing::info!(target: "parley::gateway", chars = reply.text.len(), "returned");
        Ok(reply)
    }
}
