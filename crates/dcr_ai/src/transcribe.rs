use std::fs;
use std::path::Path;

use dcr_core::config::AppConfig;
use dcr_core::error::AppError;
use serde::Deserialize;
use tracing::info;

/// Transcription collaborator for turning a consultation recording into
/// plain text.
pub trait Transcriber {
    fn transcribe(&self, audio_path: &Path) -> Result<String, AppError>;
}

/// Client for a hosted speech-to-text endpoint. Credentials are checked at
/// call time so text-only workflows never need them.
#[derive(Debug, Clone)]
pub struct RestTranscriber {
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl RestTranscriber {
    pub fn new(endpoint: Option<String>, api_key: Option<String>) -> Self {
        Self { endpoint, api_key }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.transcribe_endpoint.clone(), cfg.transcribe_api_key.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl Transcriber for RestTranscriber {
    fn transcribe(&self, audio_path: &Path) -> Result<String, AppError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| AppError::config_missing("DCR_TRANSCRIBE_ENDPOINT"))?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::config_missing("DCR_TRANSCRIBE_API_KEY"))?;

        let bytes = fs::read(audio_path).map_err(|e| {
            AppError::new("TRANSCRIBE_FAILED", "Failed to read audio file")
                .with_details(format!("path={}; err={}", audio_path.display(), e))
        })?;
        info!(path = %audio_path.display(), bytes = bytes.len(), "transcribing audio");

        let resp = ureq::post(endpoint)
            .set("Authorization", &format!("Bearer {api_key}"))
            .set("Content-Type", "audio/mpeg")
            .timeout(std::time::Duration::from_secs(120))
            .send_bytes(&bytes);

        match resp {
            Ok(r) if r.status() == 200 => {
                let v: TranscriptionResponse = r.into_json().map_err(|e| {
                    AppError::new("TRANSCRIBE_FAILED", "Failed to decode transcription response")
                        .with_details(e.to_string())
                })?;
                let transcript = v.text.trim().to_string();
                if transcript.is_empty() {
                    return Err(AppError::new(
                        "TRANSCRIBE_FAILED",
                        "Transcription returned no text",
                    ));
                }
                Ok(transcript)
            }
            Ok(r) => Err(
                AppError::new("TRANSCRIBE_FAILED", "Transcription request failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(e) => Err(
                AppError::new("TRANSCRIBE_FAILED", "Failed to call transcription endpoint")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }
}
