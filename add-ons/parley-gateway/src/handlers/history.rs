//! History handler: `GET /api/history?limit=N`.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Newest entries in chronological order. `limit` is capped at `history_limit`.
pub async fn history_get(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(store) = state.gateway.history().cloned() else {
        return (StatusCode::OK, Json(serde_json::json!({ "messages": [] })));
    };
    let max = state.gateway.config().history_limit;
    let limit = q.limit.unwrap_or(max).min(max);

    match tokio::task::spawn_blocking(move || store.query(limit)).await {
        Ok(Ok(entries)) => (StatusCode::OK, Json(serde_json::json!({ "messages": entries }))),
        Ok(Err(e)) => {
            tracing::warn!(target: "parley::history", error = %e, "history query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}
