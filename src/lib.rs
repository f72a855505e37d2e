//! ```text
//! Seed URL ──► crawl::Crawler ──► discovered URLs ──┐
//!                                                   ├─► sources::web
//! Uploaded files ───────────────────────────────────┼─► sources::files
//! Media URL ──► providers (transcription) ──────────┴─► sources::audio
//!                                                        │
//!                                    RawRecords ◄────────┘
//!                                        │
//!                          chunking::TextChunker ──► Chunks
//!                                        │
//!            providers (embeddings) ──► index::CorpusIndex
//!                                        │   (stores::SqliteCorpusStore:
//!                                        │    vec0 + FTS5 + rank fusion)
//!                                        ▼
//!     session::RetrievalOrchestrator ──► context ──► providers (chat)
//!                                                        │
//!                                              answer ◄──┘
//! ```
//!
pub mod chunking;
pub mod config;
pub mod crawl;
pub mod index;
pub mod ingest;
pub mod providers;
pub mod scratch;
pub mod session;
pub mod sources;
pub mod stores;
pub mod types;

pub use chunking::{Chunk, TextChunker};
pub use config::{ChunkingConfig, CrawlConfig, PipelineConfig, RetrievalConfig};
pub use crawl::Crawler;
pub use index::{CorpusIndex, SearchMode};
pub use ingest::{IngestReport, IngestRequest, IngestionPipeline};
pub use scratch::ScratchWorkspace;
pub use session::{RetrievalOrchestrator, SessionContext};
pub use sources::RawRecord;
pub use types::{ChatRole, ChatTurn, RagError};
