//! Terminal chat over ingested sources.
//!
//! Configuration comes from the environment (a `.env` file is honored):
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! export ANSWERSMITH_SEED_URL="https://example.com/docs/"
//! export ANSWERSMITH_MAX_DEPTH=2            # clamped to 1..=5
//! export ANSWERSMITH_FILES="notes.txt,report.pdf"
//! export ANSWERSMITH_MEDIA_URL="https://example.com/talk.mp3"
//! cargo run --bin chat
//! ```
//!
//! At least one source must be configured. Type questions at the prompt;
//! `exit` (or end-of-input) quits.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use rig::client::{CompletionClient, EmbeddingsClient, ProviderClient};
use rig::providers::openai;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::FmtSubscriber;
use url::Url;

use answersmith::config::{CrawlConfig, PipelineConfig};
use answersmith::ingest::{IngestRequest, IngestionPipeline};
use answersmith::providers::{HttpTranscriptionProvider, RigChatProvider, RigEmbeddingProvider};
use answersmith::session::{RetrievalOrchestrator, SessionContext};
use answersmith::types::RagError;

#[tokio::main]
async fn main() -> Result<(), RagError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let request = request_from_env()?;
    if request.is_empty() {
        eprintln!(
            "Nothing to ingest. Set ANSWERSMITH_SEED_URL, ANSWERSMITH_FILES, \
             and/or ANSWERSMITH_MEDIA_URL."
        );
        return Ok(());
    }

    let max_depth = env::var("ANSWERSMITH_MAX_DEPTH")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, 5);

    let chat_model_name =
        env::var("ANSWERSMITH_CHAT_MODEL").unwrap_or_else(|_| openai::GPT_4O.to_string());
    let embed_model_name = env::var("ANSWERSMITH_EMBED_MODEL")
        .unwrap_or_else(|_| openai::TEXT_EMBEDDING_3_SMALL.to_string());

    let openai_client = openai::Client::from_env();
    let embedder = Arc::new(RigEmbeddingProvider::new(
        openai_client.embedding_model(&embed_model_name),
    ));
    let chat = Arc::new(RigChatProvider::new(
        openai_client.completion_model(&chat_model_name),
    ));

    let mut builder = IngestionPipeline::builder()
        .embedder(embedder)
        .config(PipelineConfig::default().with_crawl(CrawlConfig::default().with_max_depth(max_depth)));

    if request.media_url.is_some() {
        let mut transcriber = HttpTranscriptionProvider::new(reqwest::Client::new());
        if let Ok(api_key) = env::var("OPENAI_API_KEY") {
            transcriber = transcriber.with_api_key(api_key);
        }
        builder = builder.transcriber(Arc::new(transcriber));
    }

    let pipeline = builder.build();

    println!("Processing data sources...");
    let (corpus, report) = pipeline.ingest(request).await?;
    println!(
        "Total sources processed: {} ({} records, {} chunks indexed)",
        report.sources_processed, report.records, report.chunks_indexed
    );

    let mut session = SessionContext::new();
    session.install_corpus(corpus);
    let orchestrator = RetrievalOrchestrator::new(chat);

    println!("Ready. Ask a question, or type 'exit' to quit.\n");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") {
            break;
        }

        let answer = orchestrator.answer(&mut session, question).await;
        println!("{answer}\n");
    }

    Ok(())
}

fn request_from_env() -> Result<IngestRequest, RagError> {
    let seed_url = match env::var("ANSWERSMITH_SEED_URL") {
        Ok(raw) if !raw.trim().is_empty() => Some(
            Url::parse(raw.trim()).map_err(|err| RagError::InvalidInput(err.to_string()))?,
        ),
        _ => None,
    };

    let media_url = match env::var("ANSWERSMITH_MEDIA_URL") {
        Ok(raw) if !raw.trim().is_empty() => Some(
            Url::parse(raw.trim()).map_err(|err| RagError::InvalidInput(err.to_string()))?,
        ),
        _ => None,
    };

    let files = env::var("ANSWERSMITH_FILES")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default();

    Ok(IngestRequest {
        seed_url,
        files,
        media_url,
    })
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
