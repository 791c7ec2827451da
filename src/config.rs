use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "MedAssist";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_CHAT_MODEL: &str = "llama3.1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

/// Prefix shared by every environment variable the service reads.
const ENV_PREFIX: &str = "MEDASSIST_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Cannot determine home directory; set MEDASSIST_DATA_DIR")]
    NoHomeDir,
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medassist=info,medassist_lib=info,tower_http=info"
}

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub transcripts_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub knowledge_index_path: PathBuf,
    pub ollama_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
    pub temperature: f32,
    /// Upper bound on generated tokens per completion (`num_predict`).
    pub max_tokens: u32,
    /// Bound N of each per-session conversation buffer.
    pub conversation_window: usize,
    /// Identity used when a chat connection carries no `username`.
    pub fallback_user_name: String,
    pub cors_origins: Vec<String>,
    pub retrieval_top_k: usize,
    /// Web client base URL, used in links the assistant hands out.
    pub frontend_url: String,
    /// Externally reachable base URL of this server.
    pub public_url: String,
}

impl Config {
    /// Load `.env` if present, then read `MEDASSIST_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::info!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Failed to load .env file: {e}"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary lookup of `MEDASSIST_*` keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(&format!("{ENV_PREFIX}{key}")).filter(|v| !v.trim().is_empty())
        };

        let data_dir = match get("DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir().ok_or(ConfigError::NoHomeDir)?.join(APP_NAME),
        };

        let mut config = Self::for_data_dir(&data_dir);

        if let Some(v) = get("BIND_ADDR") {
            config.bind_addr = parse("BIND_ADDR", &v)?;
        }
        if let Some(v) = get("DATABASE_PATH") {
            config.database_path = PathBuf::from(v);
        }
        if let Some(v) = get("TRANSCRIPTS_DIR") {
            config.transcripts_dir = PathBuf::from(v);
        }
        if let Some(v) = get("UPLOADS_DIR") {
            config.uploads_dir = PathBuf::from(v);
        }
        if let Some(v) = get("KNOWLEDGE_INDEX") {
            config.knowledge_index_path = PathBuf::from(v);
        }
        if let Some(v) = get("OLLAMA_URL") {
            config.ollama_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("CHAT_MODEL") {
            config.chat_model = v;
        }
        if let Some(v) = get("EMBEDDING_MODEL") {
            config.embedding_model = v;
        }
        if let Some(v) = get("REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = parse("REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("TEMPERATURE") {
            config.temperature = parse("TEMPERATURE", &v)?;
        }
        if let Some(v) = get("MAX_TOKENS") {
            config.max_tokens = parse("MAX_TOKENS", &v)?;
        }
        if let Some(v) = get("CONVERSATION_WINDOW") {
            config.conversation_window = parse("CONVERSATION_WINDOW", &v)?;
            if config.conversation_window == 0 {
                return Err(ConfigError::InvalidValue {
                    key: format!("{ENV_PREFIX}CONVERSATION_WINDOW"),
                    value: v,
                    reason: "must be at least 1".into(),
                });
            }
        }
        if let Some(v) = get("USER_NAME") {
            config.fallback_user_name = v;
        }
        if let Some(v) = get("CORS_ORIGINS") {
            config.cors_origins = split_list(&v);
        }
        if let Some(v) = get("RETRIEVAL_TOP_K") {
            config.retrieval_top_k = parse("RETRIEVAL_TOP_K", &v)?;
        }
        if let Some(v) = get("FRONTEND_URL") {
            config.frontend_url = v.trim_end_matches('/').to_string();
        }
        match get("PUBLIC_URL") {
            Some(v) => config.public_url = v.trim_end_matches('/').to_string(),
            None => config.public_url = format!("http://localhost:{}", config.bind_addr.port()),
        }

        Ok(config)
    }

    /// Defaults with every file location rooted at `data_dir`.
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            data_dir: data_dir.to_path_buf(),
            database_path: data_dir.join("medassist.db"),
            transcripts_dir: data_dir.join("chat_history"),
            uploads_dir: data_dir.join("uploads"),
            knowledge_index_path: data_dir.join("knowledge").join("index.json"),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            request_timeout_secs: 300,
            temperature: 0.1,
            max_tokens: 512,
            conversation_window: 10,
            fallback_user_name: "Patient".to_string(),
            cors_origins: split_list(
                "http://localhost:5173,http://localhost:5174,http://localhost:5175",
            ),
            retrieval_top_k: 2,
            frontend_url: "http://localhost:5173".to_string(),
            public_url: "http://localhost:8000".to_string(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: format!("{ENV_PREFIX}{key}"),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
