//! Parley gateway: serves the voice chat UI and fronts the AI response gateway.
//!
//! Routes: `POST /api/chat`, `GET /api/history`, `GET /api/health`, plus the static UI
//! from `frontend_dir` when configured. Provider keys stay on this side; the browser never
//! sees them.

mod handlers;
mod history_sqlite;

use axum::extract::State;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use parley_core::{ChatGateway, FallbackRouter, GatewayConfig, HistoryStore, Provider};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::history_sqlite::HistorySqlite;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) gateway: Arc<ChatGateway>,
}

#[tokio::main]
async fn main() {
    // Provider keys live in .env or the process environment only.
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[parley-gateway] .env not loaded: {} (using system environment)", e);
    }

    let config = match GatewayConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[parley-gateway] config load failed: {}", e);
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--print-config") {
        match toml::to_string_pretty(&config.redacted()) {
            Ok(s) => {
                println!("{}", s);
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("[parley-gateway] could not render config: {}", e);
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    for provider in Provider::ALL {
        if !config.is_configured(provider) {
            tracing::warn!(
                target: "parley::startup",
                provider = %provider,
                env = %config.providers.get(provider).api_key_env,
                "no credential; requests for this provider will fail"
            );
        }
    }

    let config = Arc::new(config);
    let router = match FallbackRouter::from_config(Arc::clone(&config)) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("HTTP client init failed: {}", e);
            std::process::exit(1);
        }
    };

    let mut gateway = ChatGateway::new(router);
    match HistorySqlite::new(PathBuf::from(&config.history_path)) {
        Ok(store) => {
            tracing::info!(target: "parley::history", path = %store.path().display(), "history store ready");
            gateway = gateway.with_history(Arc::new(store) as Arc<dyn HistoryStore>);
        }
        Err(e) => {
            tracing::warn!(target: "parley::history", error = %e, "history disabled");
        }
    }

    let state = AppState {
        gateway: Arc::new(gateway),
    };
    let app = build_app(state);

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("could not bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("{} listening on {}", config.app_name, addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown (Ctrl+C received)");
        }
    }
}

fn build_app(state: AppState) -> Router {
    let frontend_dir = state.gateway.config().frontend_dir.clone();

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any);

    let mut app = Router::new()
        .route("/api/chat", post(handlers::chat::chat_post))
        .route("/api/history", get(handlers::history::history_get))
        .route("/api/health", get(health))
        .with_state(state);

    if let Some(dir) = frontend_dir {
        app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    app.layer(cors)
}

/// GET /api/health – liveness plus which providers have a credential.
async fn health(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    let config = state.gateway.config();
    let providers: serde_json::Map<String, serde_json::Value> = Provider::ALL
        .iter()
        .map(|p| (p.as_str().to_string(), serde_json::Value::Bool(config.is_configured(*p))))
        .collect();
    axum::Json(serde_json::json!({
        "status": "ok",
        "app_name": config.app_name,
        "providers": providers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use parley_core::{
        GatewayError, GatewayResult, ProviderCandidate, ProviderRequest, ProviderTransport, Role,
        TransportResponse,
    };
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Groq-style completion with fixed content, or a refused connection when `content` is None.
    struct StubTransport {
        content: Option<String>,
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProviderTransport for StubTransport {
        async fn send(&self, request: &ProviderRequest) -> GatewayResult<TransportResponse> {
            self.urls.lock().unwrap().push(request.url.clone());
            match &self.content {
                Some(c) => Ok(TransportResponse {
                    status: 200,
                    body: serde_json::json!({ "choices": [{ "message": { "content": c } }] }).to_string(),
                }),
                None => Err(GatewayError::ProviderTransport("connection refused".into())),
            }
        }
    }

    fn test_config() -> GatewayConfig {
        let mut cfg = GatewayConfig::default();
        cfg.app_name = "Test Parley".to_string();
        cfg.default_provider = Provider::Groq;
        cfg.history_limit = 2;
        cfg.providers.gemini.api_key = None;
        cfg.providers.gemini.api_key_env = "PARLEY_TEST_UNSET_GEMINI_KEY".to_string();
        cfg.providers.openai.api_key = None;
        cfg.providers.openai.api_key_env = "PARLEY_TEST_UNSET_OPENAI_KEY".to_string();
        cfg.providers.groq.api_key = Some("gsk-test".to_string());
        cfg.providers.groq.candidates = vec![
            ProviderCandidate::new("https://groq.test/a/chat/completions", "model-a", true),
            ProviderCandidate::new("https://groq.test/b/chat/completions", "model-b", true),
        ];
        cfg
    }

    fn test_app(content: Option<&str>, history: Option<Arc<dyn HistoryStore>>) -> (Router, Arc<StubTransport>) {
        let transport = Arc::new(StubTransport {
            content: content.map(str::to_string),
            urls: Mutex::new(Vec::new()),
        });
        let router = FallbackRouter::new(Arc::new(test_config()), transport.clone());
        let mut gateway = ChatGateway::new(router);
        if let Some(h) = history {
            gateway = gateway.with_history(h);
        }
        let app = build_app(AppState {
            gateway: Arc::new(gateway),
        });
        (app, transport)
    }

    fn post_chat(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(res: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_chat_uses_default_provider_and_sanitizes() {
        let (app, transport) = test_app(Some(r#"{"text":"  the answer is 4 "}"#), None);

        let res = app
            .oneshot(post_chat(r#"{"messages":[{"role":"user","content":"What is 2+2?"}]}"#))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        assert_eq!(json["text"], "THE ANSWER IS 4");
        assert!(json.get("intent").is_none());
        assert_eq!(transport.urls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_returns_intent_when_present() {
        let (app, _) = test_app(Some(r#"{"text":"opening","intent":{"type":"navigate","value":"home"}}"#), None);

        let res = app
            .oneshot(post_chat(r#"{"messages":[{"role":"user","content":"go home"}],"provider":"groq"}"#))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        assert_eq!(json["text"], "OPENING");
        assert_eq!(json["intent"]["type"], "navigate");
        assert_eq!(json["intent"]["value"], "home");
    }

    #[tokio::test]
    async fn test_chat_empty_messages_is_bad_request() {
        let (app, transport) = test_app(Some("unused"), None);

        let res = app.oneshot(post_chat(r#"{"messages":[]}"#)).await.unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(res).await["error"].is_string());
        assert!(transport.urls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_unknown_provider_is_bad_request() {
        let (app, _) = test_app(Some("unused"), None);

        let res = app
            .oneshot(post_chat(r#"{"messages":[{"role":"user","content":"hi"}],"provider":"claude"}"#))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(res).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_chat_unconfigured_provider_is_server_error() {
        let (app, transport) = test_app(Some("unused"), None);

        let res = app
            .oneshot(post_chat(r#"{"messages":[{"role":"user","content":"hi"}],"provider":"openai"}"#))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(res).await;
        assert!(json["error"].as_str().unwrap().contains("PARLEY_TEST_UNSET_OPENAI_KEY"));
        assert!(transport.urls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_exhausted_chain_is_bad_gateway() {
        let (app, transport) = test_app(None, None);

        let res = app
            .oneshot(post_chat(r#"{"messages":[{"role":"user","content":"hi"}]}"#))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        assert!(json_body(res).await["error"].as_str().unwrap().contains("connection refused"));
        assert_eq!(transport.urls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_health_reports_configured_providers() {
        let (app, _) = test_app(Some("unused"), None);

        let req = Request::builder()
            .method("GET")
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["app_name"], "Test Parley");
        assert_eq!(json["providers"]["groq"], true);
        assert_eq!(json["providers"]["gemini"], false);
        assert_eq!(json["providers"]["openai"], false);
    }

    #[tokio::test]
    async fn test_history_is_capped_and_chronological() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistorySqlite::new(dir.path().join("history.db")).unwrap();
        store.insert(Role::User, "first").unwrap();
        store.insert(Role::Assistant, "second").unwrap();
        store.insert(Role::User, "third").unwrap();
        let (app, _) = test_app(Some("unused"), Some(Arc::new(store)));

        let req = Request::builder()
            .method("GET")
            .uri("/api/history?limit=10")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["content"], "second");
        assert_eq!(messages[0]["role"], "assistant");
        assert_eq!(messages[1]["content"], "third");
    }

    #[tokio::test]
    async fn test_history_without_store_is_empty() {
        let (app, _) = test_app(Some("unused"), None);

        let req = Request::builder()
            .method("GET")
            .uri("/api/history")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["messages"].as_array().unwrap().len(), 0);
    }
}
