use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Runtime configuration, resolved once at startup from environment
/// variables. Service credentials stay optional here; the collaborator that
/// needs one fails fast with `CONFIG_MISSING` before any network call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Root for index directories, transcripts, and rendered reports.
    pub data_dir: PathBuf,
    /// Token budget per chunk.
    pub max_tokens: usize,
    /// Retrieval fan-out.
    pub top_k: usize,
    pub transcribe_endpoint: Option<String>,
    pub transcribe_api_key: Option<String>,
    pub embed_base_url: String,
    pub embed_model: String,
    pub chat_base_url: String,
    pub chat_api_key: Option<String>,
    pub chat_model: String,
}

pub const DEFAULT_MAX_TOKENS: usize = 300;
pub const DEFAULT_TOP_K: usize = 4;

impl AppConfig {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get_trimmed = |name: &str| {
            get(name).and_then(|v| {
                let t = v.trim().to_string();
                if t.is_empty() {
                    None
                } else {
                    Some(t)
                }
            })
        };

        let data_dir = get_trimmed("DCR_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("consult_data"));

        let max_tokens = parse_positive(get_trimmed("DCR_MAX_TOKENS"), "DCR_MAX_TOKENS", DEFAULT_MAX_TOKENS)?;
        let top_k = parse_positive(get_trimmed("DCR_TOP_K"), "DCR_TOP_K", DEFAULT_TOP_K)?;

        let embed_base_url = get_trimmed("DCR_EMBED_BASE_URL")
            .unwrap_or_else(|| "http://127.0.0.1:11434".to_string())
            .trim_end_matches('/')
            .to_string();
        let embed_model =
            get_trimmed("DCR_EMBED_MODEL").unwrap_or_else(|| "nomic-embed-text".to_string());

        let chat_base_url = get_trimmed("DCR_CHAT_BASE_URL")
            .unwrap_or_else(|| "http://127.0.0.1:11434".to_string())
            .trim_end_matches('/')
            .to_string();
        let chat_model = get_trimmed("DCR_CHAT_MODEL").unwrap_or_else(|| "llama3.1".to_string());

        Ok(Self {
            data_dir,
            max_tokens,
            top_k,
            transcribe_endpoint: get_trimmed("DCR_TRANSCRIBE_ENDPOINT"),
            transcribe_api_key: get_trimmed("DCR_TRANSCRIBE_API_KEY"),
            embed_base_url,
            embed_model,
            chat_base_url,
            chat_api_key: get_trimmed("DCR_CHAT_API_KEY"),
            chat_model,
        })
    }

    pub fn index_root(&self) -> PathBuf {
        self.data_dir.join("indexes")
    }

    pub fn transcripts_dir(&self) -> PathBuf {
        self.data_dir.join("transcripts")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }
}

fn parse_positive(raw: Option<String>, name: &str, default: usize) -> Result<usize, AppError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value: usize = raw.parse().map_err(|_| {
        AppError::new("CONFIG_INVALID", "Configuration value is not a number")
            .with_details(format!("setting={name}; value={raw}"))
    })?;
    if value == 0 {
        return Err(AppError::new("CONFIG_INVALID", "Configuration value must be positive")
            .with_details(format!("setting={name}")));
    }
    Ok(value)
}
