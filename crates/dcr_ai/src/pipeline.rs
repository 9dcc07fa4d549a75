use std::fs;
use std::path::{Path, PathBuf};

use dcr_core::error::AppError;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;

use crate::chunking::{normalize_newlines, split_into_chunks};
use crate::embeddings::Embedder;
use crate::index::{IndexCache, IndexStore};
use crate::tokenize::TokenCounter;
use crate::transcribe::Transcriber;

/// Extensions routed through the transcription service; anything else is
/// read as an existing transcript.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub index_name: String,
    pub chunk_count: u32,
    /// Saved transcript copy; `None` when the source already was a text file.
    pub transcript_path: Option<PathBuf>,
    pub updated_at: String,
}

/// One upload-then-index cycle: transcribe (or read), chunk, embed, persist,
/// and drop any cached handle for the rebuilt index.
pub struct Ingestor<'a> {
    pub store: &'a IndexStore,
    pub cache: &'a IndexCache,
    pub transcriber: &'a dyn Transcriber,
    pub embedder: &'a dyn Embedder,
    pub tokens: &'a TokenCounter,
    pub max_tokens: usize,
    pub transcripts_dir: PathBuf,
}

impl Ingestor<'_> {
    pub fn process_source(
        &self,
        source: &Path,
        index_name: Option<&str>,
    ) -> Result<ProcessSummary, AppError> {
        let name = match index_name {
            Some(n) => n.to_string(),
            None => derive_index_name(source),
        };

        let (transcript, transcript_path) = if is_audio(source) {
            info!(path = %source.display(), "transcribing consultation recording");
            let text = self.transcriber.transcribe(source)?;
            let path = self.save_transcript(&name, &text)?;
            (text, Some(path))
        } else {
            let text = fs::read_to_string(source).map_err(|e| {
                AppError::new("TRANSCRIPT_READ_FAILED", "Failed to read transcript file")
                    .with_details(format!("path={}; err={}", source.display(), e))
            })?;
            (text, None)
        };

        let chunks = split_into_chunks(&transcript, self.max_tokens, self.tokens);
        info!(index = %name, chunk_count = chunks.len(), "transcript chunked");

        let updated_at = now_rfc3339()?;
        let status = self
            .store
            .build_and_persist(&chunks, self.embedder, &name, &updated_at)?;
        // A stale handle must never outlive the rebuild.
        self.cache.invalidate(&name);

        Ok(ProcessSummary {
            index_name: name,
            chunk_count: status.chunk_count,
            transcript_path,
            updated_at,
        })
    }

    fn save_transcript(&self, name: &str, text: &str) -> Result<PathBuf, AppError> {
        fs::create_dir_all(&self.transcripts_dir).map_err(|e| {
            AppError::new("TRANSCRIPT_WRITE_FAILED", "Failed to create transcripts directory")
                .with_details(format!("path={}; err={}", self.transcripts_dir.display(), e))
        })?;
        let path = self.transcripts_dir.join(format!("{name}.txt"));
        let tmp = path.with_extension("tmp");
        let normalized = normalize_newlines(text);
        fs::write(&tmp, normalized.as_bytes()).map_err(|e| {
            AppError::new("TRANSCRIPT_WRITE_FAILED", "Failed to write transcript copy")
                .with_details(format!("path={}; err={}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            AppError::new("TRANSCRIPT_WRITE_FAILED", "Failed to finalize transcript copy")
                .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
        })?;
        Ok(path)
    }
}

pub fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Default index name: the source file's stem with whitespace and other
/// non-alphanumeric characters normalized to underscores.
pub fn derive_index_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("consultation");
    let out: String = stem
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect();
    if out.chars().all(|c| c == '_') {
        "consultation".to_string()
    } else {
        out
    }
}

fn now_rfc3339() -> Result<String, AppError> {
    OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| {
        AppError::new("INDEX_BUILD_FAILED", "Failed to format timestamp")
            .with_details(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn index_name_normalizes_stem_characters() {
        assert_eq!(derive_index_name(Path::new("RES0215.mp3")), "RES0215");
        assert_eq!(
            derive_index_name(Path::new("visit notes (final).mp3")),
            "visit_notes__final_"
        );
        assert_eq!(derive_index_name(Path::new("consult.2026.txt")), "consult_2026");
    }

    #[test]
    fn audio_detection_is_extension_based() {
        assert!(is_audio(Path::new("a.mp3")));
        assert!(is_audio(Path::new("a.MP3")));
        assert!(is_audio(Path::new("b.wav")));
        assert!(!is_audio(Path::new("a.txt")));
        assert!(!is_audio(Path::new("noext")));
    }
}
