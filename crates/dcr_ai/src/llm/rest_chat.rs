use dcr_core::config::AppConfig;
use dcr_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatModel};

/// Chat client for an Ollama-compatible chat endpoint. A bearer key is
/// attached when configured so hosted gateways with the same wire shape
/// work unchanged.
#[derive(Debug, Clone)]
pub struct RestChatModel {
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl RestChatModel {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.chat_base_url.clone(),
            cfg.chat_model.clone(),
            cfg.chat_api_key.clone(),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl ChatModel for RestChatModel {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, AppError> {
        let url = format!("{}/api/chat", self.base_url);
        let req = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };

        let mut call = ureq::post(&url).timeout(std::time::Duration::from_secs(30));
        if let Some(key) = self.api_key.as_deref() {
            call = call.set("Authorization", &format!("Bearer {key}"));
        }
        let resp = call.send_json(serde_json::to_value(req).map_err(|e| {
            AppError::new("CHAT_FAILED", "Failed to encode chat request")
                .with_details(e.to_string())
        })?);

        match resp {
            Ok(r) if r.status() == 200 => {
                let v: ChatResponse = r.into_json().map_err(|e| {
                    AppError::new("CHAT_FAILED", "Failed to decode chat response")
                        .with_details(e.to_string())
                })?;
                if v.message.content.trim().is_empty() {
                    return Err(AppError::new("CHAT_FAILED", "Chat response was empty"));
                }
                Ok(v.message.content)
            }
            Ok(r) => Err(AppError::new("CHAT_FAILED", "Chat request failed")
                .with_details(format!("status={}", r.status()))),
            Err(e) => Err(AppError::new("CHAT_FAILED", "Failed to call chat endpoint")
                .with_details(e.to_string())
                .with_retryable(true)),
        }
    }
}
