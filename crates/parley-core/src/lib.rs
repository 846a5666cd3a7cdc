//! parley-core: the AI response gateway behind the voice chat front end.
//!
//! Reshapes a provider-agnostic conversation into provider turns, walks a per-provider
//! model fallback chain, and normalizes whatever comes back into one `{text, intent}`
//! reply. The HTTP surface and the SQLite history live in the `parley-gateway` add-on.

mod config;
mod conversation;
mod error;
mod gateway;
mod history;
mod redact;
mod response;
mod router;
mod sanitizer;
mod transport;
pub mod providers;

pub use config::{GatewayConfig, ProviderSettings, ProviderTable};
pub use conversation::{normalize_conversation, Message, Role, Turn, TurnRole, SYSTEM_TAG};
pub use error::{ConfigError, GatewayError, GatewayResult, HistoryError};
pub use gateway::{ChatGateway, ChatRequest};
pub use history::{record_in_background, HistoryEntry, HistoryStore};
pub use providers::{Provider, ProviderAdapter, ProviderCandidate, ProviderRequest};
pub use redact::{log_snippet, redact_secrets};
pub use response::{normalize_reply, ChatReply, Intent, UNPARSEABLE_PLACEHOLDER};
pub use router::FallbackRouter;
pub use sanitizer::{OutputSanitizer, PersonaCase};
pub use transport::{ProviderTransport, ReqwestTransport, TransportResponse};
