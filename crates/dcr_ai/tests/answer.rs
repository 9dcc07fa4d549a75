use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use dcr_ai::answer::{Answer, AnswerContext, REPORT_RETRIEVAL_QUERY};
use dcr_ai::embeddings::Embedder;
use dcr_ai::index::{IndexCache, IndexStore};
use dcr_ai::llm::{ChatMessage, ChatModel};
use dcr_ai::session::Session;
use dcr_core::error::AppError;
use dcr_core::report::MarkdownReportRenderer;

/// Deterministic embedding plus a log of every embedded text.
struct RecordingEmbedder {
    seen: Mutex<Vec<String>>,
}

impl RecordingEmbedder {
    fn new() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
        }
    }

    fn queries(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl Embedder for RecordingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        self.seen.lock().unwrap().push(text.to_string());
        let bytes = text.as_bytes();
        let first = bytes.first().copied().unwrap_or(0) as f32;
        let last = bytes.last().copied().unwrap_or(0) as f32;
        Ok(vec![bytes.len() as f32, first, last])
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

struct ScriptedChat {
    out: String,
    calls: AtomicUsize,
    last_messages: Mutex<Vec<ChatMessage>>,
}

impl ScriptedChat {
    fn new(out: &str) -> Self {
        Self {
            out: out.to_string(),
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages.lock().unwrap().clone()
    }
}

impl ChatModel for ScriptedChat {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();
        Ok(self.out.clone())
    }
}

struct Fixture {
    store: IndexStore,
    cache: IndexCache,
    embedder: RecordingEmbedder,
    renderer: MarkdownReportRenderer,
    _dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = IndexStore::open(dir.path().join("indexes"));
        let renderer = MarkdownReportRenderer::new(dir.path().join("reports"));
        Self {
            store,
            cache: IndexCache::new(),
            embedder: RecordingEmbedder::new(),
            renderer,
            _dir: dir,
        }
    }

    fn index_transcript(&self, name: &str, chunks: &[&str]) {
        let chunks: Vec<String> = chunks.iter().map(|c| c.to_string()).collect();
        self.store
            .build_and_persist(&chunks, &self.embedder, name, "2026-08-05T00:00:00Z")
            .expect("build");
    }

    fn context<'a>(&'a self, chat: &'a ScriptedChat) -> AnswerContext<'a> {
        AnswerContext {
            store: &self.store,
            cache: &self.cache,
            embedder: &self.embedder,
            chat,
            renderer: &self.renderer,
            top_k: 4,
        }
    }

    fn queries(&self) -> Vec<String> {
        self.embedder.queries()
    }
}

#[test]
fn open_question_routes_to_chat_mode() {
    let fx = Fixture::new();
    fx.index_transcript(
        "visit",
        &["The doctor suspected seasonal flu and prescribed Tamiflu."],
    );
    let chat = ScriptedChat::new("Tamiflu was prescribed for the flu.");
    let ctx = fx.context(&chat);
    let session = Session::with_index("visit");

    let answer = ctx
        .answer(&session, "what was prescribed?")
        .expect("answer");
    match answer {
        Answer::Chat { answer, sources } => {
            assert_eq!(answer, "Tamiflu was prescribed for the flu.");
            assert_eq!(sources.len(), 1);
            assert!(sources[0].text.contains("Tamiflu"));
        }
        other => panic!("expected chat answer, got {other:?}"),
    }
    assert_eq!(chat.call_count(), 1);

    // The literal user query drives retrieval in chat mode.
    assert!(fx
        .queries()
        .iter()
        .any(|q| q == "what was prescribed?"));
}

#[test]
fn report_request_routes_to_report_mode_and_renders_a_document() {
    let fx = Fixture::new();
    fx.index_transcript(
        "visit",
        &["Assessment: influenza A. Plan: oseltamivir twice daily for five days."],
    );
    let chat = ScriptedChat::new("Diagnosis: Influenza A\nMedications: Oseltamivir 75mg");
    let ctx = fx.context(&chat);
    let session = Session::with_index("visit");

    let answer = ctx
        .answer(&session, "Please GENERATE REPORT now")
        .expect("answer");
    match answer {
        Answer::Report {
            sections,
            document_path,
            sources,
            ..
        } => {
            assert_eq!(sections.diagnosis, "Influenza A");
            assert_eq!(sections.medications, "Oseltamivir 75mg");
            assert!(document_path.exists());
            let body = std::fs::read_to_string(&document_path).expect("report body");
            assert!(body.contains("Influenza A"));
            assert!(body.contains("Oseltamivir 75mg"));
            assert!(!sources.is_empty());
        }
        other => panic!("expected report answer, got {other:?}"),
    }
    assert_eq!(chat.call_count(), 1);

    // Report mode retrieves with the fixed internal query, not the user's text.
    let queries = fx.queries();
    assert!(queries.iter().any(|q| q == REPORT_RETRIEVAL_QUERY));
    assert!(!queries.iter().any(|q| q.contains("GENERATE REPORT")));
}

#[test]
fn report_prompt_carries_retrieved_context_to_the_model() {
    let fx = Fixture::new();
    fx.index_transcript("visit", &["Plan: oseltamivir twice daily."]);
    let chat = ScriptedChat::new("Diagnosis: flu\nMedications: oseltamivir");
    let ctx = fx.context(&chat);
    let session = Session::with_index("visit");

    ctx.answer(&session, "generate report").expect("answer");

    let messages = chat.last_messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, "system");
    assert_eq!(messages[1].role, "user");
    assert!(messages[1].content.contains("oseltamivir twice daily"));
}

#[test]
fn missing_index_answers_without_contacting_the_model() {
    let fx = Fixture::new();
    let chat = ScriptedChat::new("should never be used");
    let ctx = fx.context(&chat);

    // Session points at an index that was never built.
    let session = Session::with_index("never_built");
    let answer = ctx.answer(&session, "anything").expect("answer");
    match answer {
        Answer::NoIndex { sources, .. } => assert!(sources.is_empty()),
        other => panic!("expected no-index answer, got {other:?}"),
    }

    // Session with no index at all behaves the same.
    let session = Session::new();
    let answer = ctx.answer(&session, "generate report").expect("answer");
    assert!(matches!(answer, Answer::NoIndex { .. }));

    assert_eq!(chat.call_count(), 0);
}

#[test]
fn report_without_markers_degrades_to_placeholders() {
    let fx = Fixture::new();
    fx.index_transcript("visit", &["General discussion, nothing conclusive."]);
    let chat = ScriptedChat::new("The conversation does not identify a condition.");
    let ctx = fx.context(&chat);
    let session = Session::with_index("visit");

    let answer = ctx.answer(&session, "download report").expect("answer");
    match answer {
        Answer::Report { sections, .. } => {
            assert_eq!(
                sections.diagnosis,
                "The conversation does not identify a condition."
            );
            assert_eq!(sections.medications, "Not found.");
        }
        other => panic!("expected report answer, got {other:?}"),
    }
}
