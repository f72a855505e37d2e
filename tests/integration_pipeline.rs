//! End-to-end pipeline tests with mock capabilities.
//!
//! Network sources are served by an in-process HTTP mock; embeddings,
//! generation, and transcription use the deterministic in-crate mocks, so
//! every test runs offline and reproducibly.

use std::path::PathBuf;
use std::sync::Arc;

use httpmock::prelude::*;
use url::Url;

use answersmith::chunking::{Chunk, TextChunker};
use answersmith::config::{ChunkingConfig, CrawlConfig, PipelineConfig, RetrievalConfig};
use answersmith::crawl::Crawler;
use answersmith::index::{CorpusIndex, SearchMode};
use answersmith::ingest::{IngestRequest, IngestionPipeline};
use answersmith::providers::{
    MockChatProvider, MockEmbeddingProvider, MockTranscriptionProvider, TranscriptionProvider,
};
use answersmith::session::{RetrievalOrchestrator, SessionContext};
use answersmith::sources::RawRecord;
use answersmith::types::RagError;

fn mock_pipeline() -> IngestionPipeline {
    IngestionPipeline::builder()
        .embedder(Arc::new(MockEmbeddingProvider::new()))
        .build()
}

async fn write_temp_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    tokio::fs::write(&path, contents).await.unwrap();
    path
}

/// Serves a three-page site where A links to B and B links to C.
async fn linked_site(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/a");
            then.status(200)
                .header("content-type", "text/html")
                .body(
                    "<html><body><p>Page A content about alpacas.</p>\
                     <a href=\"/b\">next</a></body></html>",
                );
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/b");
            then.status(200)
                .header("content-type", "text/html")
                .body(
                    "<html><body><p>Page B content about bears.</p>\
                     <a href=\"/c\">next</a></body></html>",
                );
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/c");
            then.status(200)
                .header("content-type", "text/html")
                .body("<html><body><p>Page C content about cats.</p></body></html>");
        })
        .await;
}

#[tokio::test]
async fn crawl_depth_one_stops_one_hop_from_the_seed() {
    let server = MockServer::start_async().await;
    linked_site(&server).await;
    let seed = Url::parse(&server.url("/a")).unwrap();

    let crawler = Crawler::new(
        reqwest::Client::new(),
        CrawlConfig::default().with_max_depth(1),
    );
    let urls = crawler.crawl(&seed).await;

    let paths: Vec<&str> = urls.iter().map(|url| url.path()).collect();
    assert_eq!(paths, vec!["/a", "/b"]);
}

#[tokio::test]
async fn crawl_depth_two_reaches_the_second_hop() {
    let server = MockServer::start_async().await;
    linked_site(&server).await;
    let seed = Url::parse(&server.url("/a")).unwrap();

    let crawler = Crawler::new(
        reqwest::Client::new(),
        CrawlConfig::default().with_max_depth(2),
    );
    let urls = crawler.crawl(&seed).await;

    let paths: Vec<&str> = urls.iter().map(|url| url.path()).collect();
    assert_eq!(paths, vec!["/a", "/b", "/c"]);
}

#[tokio::test]
async fn unreachable_seed_yields_an_empty_crawl() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/gone");
            then.status(404);
        })
        .await;
    let seed = Url::parse(&server.url("/gone")).unwrap();

    let crawler = Crawler::new(reqwest::Client::new(), CrawlConfig::default());
    assert!(crawler.crawl(&seed).await.is_empty());
}

#[tokio::test]
async fn dead_links_are_skipped_without_aborting_the_crawl() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/a");
            then.status(200).body(
                "<html><body><a href=\"/dead\">dead</a><a href=\"/b\">live</a></body></html>",
            );
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/dead");
            then.status(500);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/b");
            then.status(200)
                .body("<html><body><a href=\"/c\">deeper</a></body></html>");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/c");
            then.status(200).body("<html><body>end</body></html>");
        })
        .await;
    let seed = Url::parse(&server.url("/a")).unwrap();

    let crawler = Crawler::new(
        reqwest::Client::new(),
        CrawlConfig::default().with_max_depth(2),
    );
    let urls = crawler.crawl(&seed).await;
    let paths: Vec<&str> = urls.iter().map(|url| url.path()).collect();
    // The dead URL is still discovered; it just contributes no further links.
    assert_eq!(paths, vec!["/a", "/dead", "/b", "/c"]);
}

#[tokio::test]
async fn web_ingestion_builds_a_searchable_corpus() {
    let server = MockServer::start_async().await;
    linked_site(&server).await;
    let seed = Url::parse(&server.url("/a")).unwrap();

    let pipeline = IngestionPipeline::builder()
        .embedder(Arc::new(MockEmbeddingProvider::new()))
        .config(
            PipelineConfig::default().with_crawl(CrawlConfig::default().with_max_depth(2)),
        )
        .build();

    let (corpus, report) = pipeline
        .ingest(IngestRequest {
            seed_url: Some(seed),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(report.sources_processed, 3);
    assert_eq!(report.records, 3);
    assert!(!corpus.is_empty().await.unwrap());

    let hits = corpus
        .search("bears", 3, SearchMode::Lexical)
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits[0].text.contains("bears"));
    assert!(hits[0].source_id.ends_with("/b"));
}

#[tokio::test]
async fn text_file_round_trips_through_chunking_without_loss() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_temp_file(&dir, "letters.txt", "Alpha. Beta. Gamma.").await;

    let pipeline = IngestionPipeline::builder()
        .embedder(Arc::new(MockEmbeddingProvider::new()))
        .config(
            PipelineConfig::default().with_chunking(
                ChunkingConfig::default().with_chunk_size(10).with_overlap(0),
            ),
        )
        .build();

    let (corpus, report) = pipeline
        .ingest(IngestRequest {
            files: vec![file],
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(report.sources_processed, 1);
    assert_eq!(report.records, 1);
    assert_eq!(report.chunks_indexed, 2);

    // Every chunk comes back, and their in-order concatenation is the
    // original text.
    let mut chunks = corpus
        .search("alpha beta gamma", 10, SearchMode::Lexical)
        .await
        .unwrap();
    chunks.sort_by_key(|chunk| chunk.sequence_index);
    let rebuilt: String = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
    assert_eq!(rebuilt, "Alpha. Beta. Gamma.");
}

#[tokio::test]
async fn sky_question_retrieves_the_sky_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_temp_file(&dir, "sky.txt", "The sky is blue.").await;

    let pipeline = mock_pipeline();
    let (corpus, _) = pipeline
        .ingest(IngestRequest {
            files: vec![file],
            ..Default::default()
        })
        .await
        .unwrap();

    let hits = corpus
        .search("What color is the sky?", 5, SearchMode::Hybrid)
        .await
        .unwrap();
    assert_eq!(hits[0].text, "The sky is blue.");
    assert_eq!(hits[0].source_id, "sky.txt");
}

struct FailingTranscriptionProvider;

#[async_trait::async_trait]
impl TranscriptionProvider for FailingTranscriptionProvider {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _file_name: &str,
        _language: &str,
    ) -> Result<String, RagError> {
        Err(RagError::Transcription("service unavailable".to_string()))
    }
}

#[tokio::test]
async fn transcription_failure_is_tolerated_alongside_other_sources() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/talk.mp3");
            then.status(200).body("not really audio");
        })
        .await;
    let media_url = Url::parse(&server.url("/talk.mp3")).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let file = write_temp_file(&dir, "notes.txt", "Written notes survive.").await;

    let pipeline = IngestionPipeline::builder()
        .embedder(Arc::new(MockEmbeddingProvider::new()))
        .transcriber(Arc::new(FailingTranscriptionProvider))
        .build();

    let (corpus, report) = pipeline
        .ingest(IngestRequest {
            files: vec![file],
            media_url: Some(media_url),
            ..Default::default()
        })
        .await
        .unwrap();

    // The media source contributes zero records and a zero count.
    assert_eq!(report.sources_processed, 1);
    assert_eq!(report.records, 1);
    let hits = corpus.search("notes", 5, SearchMode::Hybrid).await.unwrap();
    assert_eq!(hits[0].text, "Written notes survive.");
}

#[tokio::test]
async fn successful_transcription_becomes_one_record() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/talk.mp3");
            then.status(200).body("fake audio bytes");
        })
        .await;
    let media_url = Url::parse(&server.url("/talk.mp3")).unwrap();

    let pipeline = IngestionPipeline::builder()
        .embedder(Arc::new(MockEmbeddingProvider::new()))
        .transcriber(Arc::new(MockTranscriptionProvider::new(
            "The talk covered memory safety.",
        )))
        .build();

    let (corpus, report) = pipeline
        .ingest(IngestRequest {
            media_url: Some(media_url.clone()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(report.sources_processed, 1);
    assert_eq!(report.records, 1);
    let hits = corpus
        .search("memory safety", 5, SearchMode::Hybrid)
        .await
        .unwrap();
    assert_eq!(hits[0].source_id, media_url.as_str());
}

#[tokio::test]
async fn embedding_determinism_holds_across_builds() {
    let chunker = TextChunker::new(ChunkingConfig::default()).unwrap();
    let records = vec![RawRecord::new("doc://a", "Deterministic embedding input.")];
    let chunks = chunker.split_records(&records);

    let build = |chunks: Vec<Chunk>| async {
        CorpusIndex::build(
            chunks,
            Arc::new(MockEmbeddingProvider::new()),
            None,
            RetrievalConfig::default(),
        )
        .await
        .unwrap()
    };

    let first = build(chunks.clone()).await;
    let second = build(chunks).await;

    let query = "Deterministic embedding input.";
    let a = first.search(query, 1, SearchMode::Vector).await.unwrap();
    let b = second.search(query, 1, SearchMode::Vector).await.unwrap();
    assert_eq!(a[0].text, b[0].text);
}

#[tokio::test]
async fn conversation_flows_end_to_end_over_an_ingested_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_temp_file(
        &dir,
        "facts.txt",
        "The sky is blue. Alpacas hum when they are content.",
    )
    .await;

    let pipeline = mock_pipeline();
    let (corpus, _) = pipeline
        .ingest(IngestRequest {
            files: vec![file],
            ..Default::default()
        })
        .await
        .unwrap();

    let mut session = SessionContext::new();
    session.install_corpus(corpus);

    let chat = Arc::new(MockChatProvider::new("fallback").with_responses(vec![
        "The sky is blue.".to_string(),
        // Second turn: one rewrite call, then the answer.
        "alpaca sounds".to_string(),
        "They hum.".to_string(),
    ]));
    let orchestrator = RetrievalOrchestrator::new(chat);

    let first = orchestrator
        .answer(&mut session, "What color is the sky?")
        .await;
    assert_eq!(first, "The sky is blue.");

    let second = orchestrator
        .answer(&mut session, "And what sound do they make?")
        .await;
    assert_eq!(second, "They hum.");
    assert_eq!(session.history().len(), 4);
}
