// llm-client-rs/src/config.rs
// Backend configuration loaded from environment variables.
//
// Configuration (.env file):
// - LLM_API_BASE_URL: chat-completions endpoint of the primary backend
// - LLM_API_KEY: bearer token for the primary backend
// - LLM_CREDENTIAL_KEY: x-dep-ticket header value
// - LLM_MODEL_NAME: model identifier (default: "gpt-oss")
// - LLM_SYSTEM_NAME: Send-System-Name header (default: "AI_Evaluation_System")
// - LLM_USER_ID: User-ID header (default: "system_user")
// - LLM_B_API_BASE_URL / LLM_B_API_KEY / LLM_B_CREDENTIAL_KEY /
//   LLM_B_MODEL_NAME: optional secondary backend; debate mode is enabled
//   when both URL and key are present
// - LLM_TEMPERATURE: sampling temperature (default: 0.1)
// - LLM_REQUEST_TIMEOUT_SECS: per-request HTTP timeout (default: 60)

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Load a local `.env` file into the process environment, if present.
/// Call once before reading configs; safe to call repeatedly.
pub fn load_dotenv() {
    dotenv::dotenv().ok();
}

/// Connection settings for one OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub api_base_url: String,
    pub api_key: String,
    /// Credential ticket forwarded as the `x-dep-ticket` header.
    pub credential_key: String,
    pub model_name: String,
    /// `Send-System-Name` header value.
    pub system_name: String,
    /// `User-ID` header value.
    pub user_id: String,
    pub temperature: f64,
    pub request_timeout: Duration,
}

impl BackendConfig {
    /// Primary backend settings from `LLM_*` environment variables.
    pub fn primary_from_env() -> Self {
        Self {
            api_base_url: env::var("LLM_API_BASE_URL").unwrap_or_default(),
            api_key: env::var("LLM_API_KEY").unwrap_or_default(),
            credential_key: env::var("LLM_CREDENTIAL_KEY").unwrap_or_default(),
            model_name: env::var("LLM_MODEL_NAME").unwrap_or_else(|_| "gpt-oss".to_string()),
            system_name: env::var("LLM_SYSTEM_NAME")
                .unwrap_or_else(|_| "AI_Evaluation_System".to_string()),
            user_id: env::var("LLM_USER_ID").unwrap_or_else(|_| "system_user".to_string()),
            temperature: get_env_var("LLM_TEMPERATURE", 0.1),
            request_timeout: Duration::from_secs(get_env_var("LLM_REQUEST_TIMEOUT_SECS", 60)),
        }
    }

    /// Secondary (reviewer) backend from `LLM_B_*` variables. Returns
    /// `None` unless both the URL and key are set - that is the switch
    /// between single-model and debate mode. Unset secondary fields fall
    /// back to the primary's values, as the reference deployment does.
    pub fn secondary_from_env() -> Option<Self> {
        let api_base_url = env::var("LLM_B_API_BASE_URL").ok()?;
        let api_key = env::var("LLM_B_API_KEY").ok()?;
        if api_base_url.is_empty() || api_key.is_empty() {
            return None;
        }

        let primary = Self::primary_from_env();
        Some(Self {
            api_base_url,
            api_key,
            credential_key: env::var("LLM_B_CREDENTIAL_KEY")
                .unwrap_or_else(|_| primary.credential_key.clone()),
            model_name: env::var("LLM_B_MODEL_NAME")
                .unwrap_or_else(|_| primary.model_name.clone()),
            system_name: primary.system_name,
            user_id: primary.user_id,
            temperature: primary.temperature,
            request_timeout: primary.request_timeout,
        })
    }
}

// Helper to read environment variables with default values.
fn get_env_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
