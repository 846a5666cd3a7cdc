//! Gateway configuration: compiled defaults, optional TOML file, then `PARLEY__*` env.
//!
//! Loaded once at process start and shared read-only (`Arc<GatewayConfig>`). Nothing in
//! the request path mutates it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::providers::{Provider, ProviderCandidate};
use crate::sanitizer::PersonaCase;

const ENV_CONFIG_PATH: &str = "PARLEY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/parley.toml";

const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent";
const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a voice assistant. Your reply is read aloud, \
so keep it short, plain and free of markdown. Always answer with a single JSON object: \
{\"text\": \"<what to say>\", \"intent\": {\"type\": \"<chat|question|command>\", \"value\": \"<optional detail>\"}}.";

/// Credential and ordered fallback chain for one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Inline key. When unset, `api_key_env` is consulted at load time.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the key (e.g. `GEMINI_API_KEY`).
    pub api_key_env: String,
    /// Tried strictly in order until one yields text.
    #[serde(default)]
    pub candidates: Vec<ProviderCandidate>,
}

impl ProviderSettings {
    fn new(api_key_env: &str, endpoint: &str, models: &[&str], force_json: bool) -> Self {
        Self {
            api_key: None,
            api_key_env: api_key_env.to_string(),
            candidates: models
                .iter()
                .map(|m| ProviderCandidate::new(endpoint, m, force_json))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTable {
    pub gemini: ProviderSettings,
    pub groq: ProviderSettings,
    pub openai: ProviderSettings,
}

impl ProviderTable {
    pub fn get(&self, provider: Provider) -> &ProviderSettings {
        match provider {
            Provider::Gemini => &self.gemini,
            Provider::Groq => &self.groq,
            Provider::Openai => &self.openai,
        }
    }

    fn get_mut(&mut self, provider: Provider) -> &mut ProviderSettings {
        match provider {
            Provider::Gemini => &mut self.gemini,
            Provider::Groq => &mut self.groq,
            Provider::Openai => &mut self.openai,
        }
    }
}

impl Default for ProviderTable {
    fn default() -> Self {
        Self {
            gemini: ProviderSettings::new(
                "GEMINI_API_KEY",
                GEMINI_ENDPOINT,
                &["gemini-2.0-flash", "gemini-1.5-flash", "gemini-1.5-flash-8b"],
                true,
            ),
            groq: ProviderSettings::new(
                "GROQ_API_KEY",
                GROQ_ENDPOINT,
                &["llama-3.3-70b-versatile", "llama-3.1-8b-instant", "gemma2-9b-it"],
                true,
            ),
            openai: ProviderSettings::new("OPENAI_API_KEY", OPENAI_ENDPOINT, &["gpt-4o-mini"], true),
        }
    }
}

/// Gateway configuration.
///
/// | Key | Env | Default |
/// |-----|-----|---------|
/// | bind_addr | PARLEY__BIND_ADDR | 127.0.0.1 |
/// | port | PARLEY__PORT | 8010 |
/// | history_path | PARLEY__HISTORY_PATH | ./data/history.db |
/// | history_limit | PARLEY__HISTORY_LIMIT | 50 |
/// | frontend_dir | PARLEY__FRONTEND_DIR | unset (no static UI) |
/// | request_timeout_ms | PARLEY__REQUEST_TIMEOUT_MS | 20000 |
/// | persona_case | PARLEY__PERSONA_CASE | upper |
/// | default_provider | PARLEY__DEFAULT_PROVIDER | gemini |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub app_name: String,
    pub bind_addr: String,
    pub port: u16,
    pub history_path: String,
    /// Default and maximum number of rows returned by the history read path.
    pub history_limit: usize,
    #[serde(default)]
    pub frontend_dir: Option<String>,
    /// Upper bound for a single candidate call.
    pub request_timeout_ms: u64,
    pub system_prompt: String,
    pub persona_case: PersonaCase,
    pub default_provider: Provider,
    pub providers: ProviderTable,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            app_name: "Parley Voice Gateway".to_string(),
            bind_addr: "127.0.0.1".to_string(),
            port: 8010,
            history_path: "./data/history.db".to_string(),
            history_limit: 50,
            frontend_dir: None,
            request_timeout_ms: 20_000,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            persona_case: PersonaCase::Upper,
            default_provider: Provider::Gemini,
            providers: ProviderTable::default(),
        }
    }
}

impl GatewayConfig {
    /// Load config. Precedence: env `PARLEY__*` > file (`PARLEY_CONFIG` or `config/parley.toml`) > defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let path = Path::new(&path);
        Self::load_from(path.exists().then_some(path))
    }

    /// Same as [`GatewayConfig::load`] with an explicit (optional) file.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = config::Config::try_from(&GatewayConfig::default())?;
        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let built = builder
            .add_source(config::Environment::with_prefix("PARLEY").separator("__"))
            .build()?;

        let mut cfg: GatewayConfig = built.try_deserialize()?;
        cfg.resolve_credentials();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Fill missing inline keys from each provider's `api_key_env`.
    fn resolve_credentials(&mut self) {
        for provider in Provider::ALL {
            let settings = self.providers.get_mut(provider);
            let key = settings
                .api_key
                .take()
                .or_else(|| std::env::var(&settings.api_key_env).ok())
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty());
            settings.api_key = key;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request_timeout_ms must be > 0".into()));
        }
        for provider in Provider::ALL {
            for (i, c) in self.providers.get(provider).candidates.iter().enumerate() {
                if c.endpoint_template.trim().is_empty() || c.model_id.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "{} candidate #{} needs endpoint_template and model_id",
                        provider, i
                    )));
                }
            }
        }
        Ok(())
    }

    /// Credential for `provider`, or `None` when absent or blank.
    pub fn credential(&self, provider: Provider) -> Option<&str> {
        self.providers
            .get(provider)
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn candidates(&self, provider: Provider) -> &[ProviderCandidate] {
        &self.providers.get(provider).candidates
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        self.credential(provider).is_some() && !self.candidates(provider).is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Copy with every credential replaced, safe to print or log.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for provider in Provider::ALL {
            let settings = copy.providers.get_mut(provider);
            if settings.api_key.is_some() {
                settings.api_key = Some("REDACTED".to_string());
            }
        }
        copy
    }
}
