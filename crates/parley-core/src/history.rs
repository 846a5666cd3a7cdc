//! Conversation history collaborator.
//!
//! The store is append-only. Writes from the chat path are best-effort: they run on the
//! blocking pool, are never awaited by the reply, and failures are only logged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::conversation::Role;
use crate::error::HistoryError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

pub trait HistoryStore: Send + Sync {
    fn insert(&self, role: Role, content: &str) -> Result<(), HistoryError>;

    /// Newest `limit` entries, returned oldest first.
    fn query(&self, limit: usize) -> Result<Vec<HistoryEntry>, HistoryError>;
}

/// Fire-and-forget insert of `rows`, in order, on one blocking task. Must be called from
/// within a tokio runtime.
pub fn record_in_background(store: Arc<dyn HistoryStore>, rows: Vec<(Role, String)>) {
    tokio::task::spawn_blocking(move || {
        for (role, content) in rows {
            if let Err(e) = store.insert(role, &content) {
                tracing::warn!(target: "parley::history", role = role.as_str(), error = %e, "history insert failed");
            }
        }
    });
}
