use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Environment variable holding the credential shared by the LLM and
/// transcription collaborators. Read live on every use, never cached.
pub const LLM_API_KEY_VAR: &str = "OPENAI_API_KEY";

const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_LLM_MODEL: &str = "arcee-ai/trinity-large-preview:free";
const DEFAULT_LLM_MAX_TOKENS: u32 = 512;
const DEFAULT_TRANSCRIPTION_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the document Q&A server.
#[derive(Debug)]
pub struct Config {
    /// Base URL of the OpenAI-compatible chat completions endpoint.
    pub llm_base_url: String,
    /// Model identifier passed to the chat completions endpoint.
    pub llm_model: String,
    /// Completion token budget requested from the LLM.
    pub llm_max_tokens: u32,
    /// Base URL of the speech-to-text endpoint.
    pub transcription_base_url: String,
    /// Model identifier passed to the transcription endpoint.
    pub transcription_model: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Request body ceiling for the upload route.
    pub max_upload_bytes: usize,
    /// Optional character budget applied to the document section of the
    /// grounded prompt. Unset means the full text is sent in one call.
    pub max_document_chars: Option<usize>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            llm_base_url: load_env_optional("LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            llm_model: load_env_optional("LLM_MODEL")
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_max_tokens: parse_env_optional("LLM_MAX_TOKENS")?
                .unwrap_or(DEFAULT_LLM_MAX_TOKENS),
            transcription_base_url: load_env_optional("TRANSCRIPTION_BASE_URL")
                .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_BASE_URL.to_string()),
            transcription_model: load_env_optional("TRANSCRIPTION_MODEL")
                .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string()),
            server_port: parse_env_optional("SERVER_PORT")?,
            max_upload_bytes: parse_env_optional("MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            max_document_chars: parse_env_optional("MAX_DOCUMENT_CHARS")?,
        })
    }
}

/// Read the LLM credential from the process environment.
///
/// Deliberately not cached in [`Config`]: the health endpoint reports this
/// per call, and rotating the key does not require a restart.
pub fn llm_api_key() -> Option<String> {
    env::var(LLM_API_KEY_VAR)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}


/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        llm_base_url = %config.llm_base_url,
        llm_model = %config.llm_model,
        transcription_model = %config.transcription_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
