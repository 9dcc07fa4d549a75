use std::io::{self, BufRead, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dcr_ai::answer::{Answer, AnswerContext};
use dcr_ai::embeddings::RestEmbedder;
use dcr_ai::index::{IndexCache, IndexStore};
use dcr_ai::llm::RestChatModel;
use dcr_ai::pipeline::Ingestor;
use dcr_ai::retrieve::RetrievedChunk;
use dcr_ai::session::Session;
use dcr_ai::tokenize::TokenCounter;
use dcr_ai::transcribe::RestTranscriber;
use dcr_core::config::AppConfig;
use dcr_core::error::AppError;
use dcr_core::report::MarkdownReportRenderer;

#[derive(Parser)]
#[command(
    name = "consultreview",
    about = "Chat with a recorded doctor-patient consultation",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe (if audio), chunk, and index a consultation recording
    Process {
        /// Audio recording or existing transcript (.txt)
        path: PathBuf,
        /// Override the index name derived from the file name
        #[arg(long)]
        index_name: Option<String>,
    },
    /// Ask one question about an indexed consultation
    Ask { index_name: String, question: String },
    /// Interactive chat against an indexed consultation
    Chat { index_name: String },
    /// Generate the structured consultation report
    Report { index_name: String },
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if let Some(details) = &e.details {
                eprintln!("  {details}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let cfg = AppConfig::from_env()?;
    let store = IndexStore::open(cfg.index_root());
    let cache = IndexCache::new();
    let embedder = RestEmbedder::from_config(&cfg);

    match cli.command {
        Command::Process { path, index_name } => {
            let tokens = TokenCounter::new()?;
            let transcriber = RestTranscriber::from_config(&cfg);
            let ingestor = Ingestor {
                store: &store,
                cache: &cache,
                transcriber: &transcriber,
                embedder: &embedder,
                tokens: &tokens,
                max_tokens: cfg.max_tokens,
                transcripts_dir: cfg.transcripts_dir(),
            };
            let summary = ingestor.process_source(&path, index_name.as_deref())?;
            println!(
                "Indexed {} chunk(s) as \"{}\".",
                summary.chunk_count, summary.index_name
            );
            if let Some(p) = &summary.transcript_path {
                println!("Transcript saved to {}.", p.display());
            }
            Ok(())
        }
        Command::Ask { index_name, question } => {
            let chat = RestChatModel::from_config(&cfg);
            let renderer = MarkdownReportRenderer::new(cfg.reports_dir());
            let ctx = AnswerContext {
                store: &store,
                cache: &cache,
                embedder: &embedder,
                chat: &chat,
                renderer: &renderer,
                top_k: cfg.top_k,
            };
            let session = Session::with_index(index_name);
            let answer = ctx.answer(&session, &question)?;
            print_answer(&answer);
            Ok(())
        }
        Command::Report { index_name } => {
            let chat = RestChatModel::from_config(&cfg);
            let renderer = MarkdownReportRenderer::new(cfg.reports_dir());
            let ctx = AnswerContext {
                store: &store,
                cache: &cache,
                embedder: &embedder,
                chat: &chat,
                renderer: &renderer,
                top_k: cfg.top_k,
            };
            let session = Session::with_index(index_name);
            let answer = ctx.answer(&session, "generate report")?;
            print_answer(&answer);
            Ok(())
        }
        Command::Chat { index_name } => {
            let chat = RestChatModel::from_config(&cfg);
            let renderer = MarkdownReportRenderer::new(cfg.reports_dir());
            let ctx = AnswerContext {
                store: &store,
                cache: &cache,
                embedder: &embedder,
                chat: &chat,
                renderer: &renderer,
                top_k: cfg.top_k,
            };
            repl(&ctx, Session::with_index(index_name))
        }
    }
}

fn repl(ctx: &AnswerContext<'_>, mut session: Session) -> Result<(), AppError> {
    println!("Ask anything about the consultation. Type \"exit\" to quit.");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().map_err(|e| {
            AppError::new("IO_FAILED", "Failed to flush stdout").with_details(e.to_string())
        })?;

        let mut line = String::new();
        let read = stdin.lock().read_line(&mut line).map_err(|e| {
            AppError::new("IO_FAILED", "Failed to read input").with_details(e.to_string())
        })?;
        if read == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        session.record("user", question);
        match ctx.answer(&session, question) {
            Ok(answer) => {
                print_answer(&answer);
                let text = match &answer {
                    Answer::Chat { answer, .. }
                    | Answer::Report { answer, .. }
                    | Answer::NoIndex { answer, .. } => answer.clone(),
                };
                session.record("assistant", text);
            }
            Err(e) => {
                eprintln!("error: {e}");
                if let Some(details) = &e.details {
                    eprintln!("  {details}");
                }
            }
        }
    }
    Ok(())
}

fn print_answer(answer: &Answer) {
    match answer {
        Answer::Chat { answer, sources } => {
            println!("{answer}");
            print_sources(sources);
        }
        Answer::Report {
            answer,
            document_path,
            sources,
            ..
        } => {
            println!("{answer}");
            println!("Report written to {}.", document_path.display());
            print_sources(sources);
        }
        Answer::NoIndex { answer, .. } => println!("{answer}"),
    }
}

fn print_sources(sources: &[RetrievedChunk]) {
    if sources.is_empty() {
        return;
    }
    println!("\nSource chunks:");
    for s in sources {
        println!("--- chunk {} (score {:.3}) ---", s.ordinal, s.score);
        println!("{}", s.text);
    }
}
