use std::path::PathBuf;

use dcr_core::error::AppError;
use dcr_core::report::ReportRenderer;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::embeddings::Embedder;
use crate::index::{IndexCache, IndexStore, LoadedIndex};
use crate::llm::{ChatMessage, ChatModel};
use crate::retrieve::{retrieve, RetrievedChunk};
use crate::session::Session;

pub mod prompts;

/// Retrieval query used for report extraction instead of the user's words.
pub const REPORT_RETRIEVAL_QUERY: &str = "patient summary, diagnosis and medications";

const REPORT_TITLE: &str = "Patient Report";
const NOT_FOUND: &str = "Not found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Chat,
    Report,
}

/// A query is a report request iff it mentions generating or downloading a
/// report, case-insensitively. Everything else is an open question.
pub fn classify_query(query: &str) -> QueryMode {
    let q = query.to_lowercase();
    if q.contains("generate report") || q.contains("download report") {
        QueryMode::Report
    } else {
        QueryMode::Chat
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSections {
    pub diagnosis: String,
    pub medications: String,
}

/// Outcome of one routed query. Every variant carries the retrieval result
/// that produced it; `NoIndex` always has an empty one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Answer {
    Chat {
        answer: String,
        sources: Vec<RetrievedChunk>,
    },
    Report {
        answer: String,
        sections: ReportSections,
        document_path: PathBuf,
        sources: Vec<RetrievedChunk>,
    },
    NoIndex {
        answer: String,
        sources: Vec<RetrievedChunk>,
    },
}

/// Everything the router needs besides the session. The caller assembles it
/// once and reuses it across queries; the only state behind it is the index
/// handle cache.
pub struct AnswerContext<'a> {
    pub store: &'a IndexStore,
    pub cache: &'a IndexCache,
    pub embedder: &'a dyn Embedder,
    pub chat: &'a dyn ChatModel,
    pub renderer: &'a dyn ReportRenderer,
    pub top_k: usize,
}

impl AnswerContext<'_> {
    /// Route one query: classify, retrieve, call the model once, and shape
    /// the response. A missing index is an answer, not an error — the chat
    /// model is never contacted in that case.
    pub fn answer(&self, session: &Session, query: &str) -> Result<Answer, AppError> {
        let Some(name) = session.index_name() else {
            return Ok(no_index_answer());
        };
        let Some(index) = self.cache.get_or_load(self.store, name)? else {
            return Ok(no_index_answer());
        };

        match classify_query(query) {
            QueryMode::Report => self.report_answer(&index),
            QueryMode::Chat => self.chat_answer(&index, query),
        }
    }

    fn report_answer(&self, index: &LoadedIndex) -> Result<Answer, AppError> {
        let sources = retrieve(index, self.embedder, REPORT_RETRIEVAL_QUERY, self.top_k)?;
        let context = join_context(&sources);

        let messages = [
            ChatMessage::system(prompts::report_system_prompt()),
            ChatMessage::user(prompts::report_prompt(&context)),
        ];
        let response = self.chat.complete(&messages)?;

        let sections = extract_report_sections(&response);
        if sections.medications == NOT_FOUND {
            warn!(index = %index.name, "report response missing expected markers; using placeholders");
        }

        let document_path =
            self.renderer
                .render_report(REPORT_TITLE, &sections.diagnosis, &sections.medications)?;

        Ok(Answer::Report {
            answer: "Report generated successfully.".to_string(),
            sections,
            document_path,
            sources,
        })
    }

    fn chat_answer(&self, index: &LoadedIndex, query: &str) -> Result<Answer, AppError> {
        let sources = retrieve(index, self.embedder, query, self.top_k)?;
        let context = join_context(&sources);

        let messages = [
            ChatMessage::system(prompts::chat_system_prompt()),
            ChatMessage::user(prompts::chat_prompt(&context, query)),
        ];
        let answer = self.chat.complete(&messages)?;

        Ok(Answer::Chat { answer, sources })
    }
}

fn no_index_answer() -> Answer {
    Answer::NoIndex {
        answer: "No consultation index is loaded. Process a recording first.".to_string(),
        sources: Vec::new(),
    }
}

fn join_context(sources: &[RetrievedChunk]) -> String {
    sources
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Split a free-form report response into diagnosis and medications on the
/// literal "Diagnosis"/"Medications" markers.
///
/// This is a deliberately brittle heuristic over unstructured model output;
/// missing markers degrade to placeholders rather than failing the query.
/// Swapping it for structured output only needs to touch this function.
pub fn extract_report_sections(response: &str) -> ReportSections {
    if !response.contains("Diagnosis") {
        return ReportSections {
            diagnosis: response.trim().to_string(),
            medications: NOT_FOUND.to_string(),
        };
    }

    let mut parts = response.splitn(2, "Medications");
    let head = parts.next().unwrap_or("");
    let diagnosis = strip_marker_residue(&head.replace("Diagnosis", ""));
    let medications = match parts.next() {
        Some(rest) => {
            let cleaned = strip_marker_residue(rest);
            if cleaned.is_empty() {
                NOT_FOUND.to_string()
            } else {
                cleaned
            }
        }
        None => NOT_FOUND.to_string(),
    };

    ReportSections {
        diagnosis,
        medications,
    }
}

fn strip_marker_residue(s: &str) -> String {
    s.trim().trim_start_matches([':', '-']).trim().to_string()
}
