//! SQLite-backed corpus store with `sqlite-vec` and FTS5 indexes.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Once;

use tokio_rusqlite::{Connection, ffi, rusqlite};

use super::{ChunkRow, ScoredChunk};
use crate::types::RagError;

/// One session corpus: chunk rows, a vec0 embedding table, and an FTS5
/// table, all keyed by the same rowid.
///
/// A store is created empty for every ingestion run (typically in memory or
/// under scratch storage) and is only read after the build completes.
#[derive(Clone)]
pub struct SqliteCorpusStore {
    conn: Connection,
    dims: usize,
}

impl SqliteCorpusStore {
    /// Opens a file-backed store, creating the schema for `dims`-wide vectors.
    pub async fn open(path: impl AsRef<Path>, dims: usize) -> Result<Self, RagError> {
        Self::register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Self::init(conn, dims).await
    }

    /// Opens an in-memory store; the corpus vanishes with the connection.
    pub async fn open_in_memory(dims: usize) -> Result<Self, RagError> {
        Self::register_sqlite_vec()?;
        let conn = Connection::open_in_memory()
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Self::init(conn, dims).await
    }

    async fn init(conn: Connection, dims: usize) -> Result<Self, RagError> {
        if dims == 0 {
            return Err(RagError::Storage(
                "embedding dimensionality must be nonzero".to_string(),
            ));
        }

        // Fail fast if the vec extension did not register.
        conn.call(|conn| {
            conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS chunks (
                     id TEXT PRIMARY KEY,
                     source_id TEXT NOT NULL,
                     chunk_index INTEGER NOT NULL,
                     content TEXT NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id);
                 CREATE VIRTUAL TABLE IF NOT EXISTS chunk_embeddings
                     USING vec0(embedding float[{dims}]);
                 CREATE VIRTUAL TABLE IF NOT EXISTS chunk_fts USING fts5(content);"
            ))?;
            Ok::<_, rusqlite::Error>(())
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;

        Ok(Self { conn, dims })
    }

    /// Vector width this store was created with.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Inserts chunks with their embeddings in one transaction.
    ///
    /// Rowids are assigned in input order; the same rowid keys the vec0 and
    /// FTS5 rows, so every index resolves back to the same chunk.
    pub async fn insert_chunks(&self, rows: Vec<(ChunkRow, Vec<f32>)>) -> Result<(), RagError> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut prepared = Vec::with_capacity(rows.len());
        for (row, embedding) in rows {
            if embedding.len() != self.dims {
                return Err(RagError::Storage(format!(
                    "embedding for chunk {} has {} dimensions, store expects {}",
                    row.id,
                    embedding.len(),
                    self.dims
                )));
            }
            let vector_json = serde_json::to_string(&embedding)
                .map_err(|err| RagError::Storage(err.to_string()))?;
            prepared.push((row, vector_json));
        }

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for (row, vector_json) in &prepared {
                    tx.execute(
                        "INSERT INTO chunks (id, source_id, chunk_index, content)
                         VALUES (?1, ?2, ?3, ?4)",
                        (
                            &row.id,
                            &row.source_id,
                            row.chunk_index as i64,
                            &row.content,
                        ),
                    )?;
                    let rowid = tx.last_insert_rowid();
                    tx.execute(
                        "INSERT INTO chunk_embeddings (rowid, embedding) VALUES (?1, vec_f32(?2))",
                        (rowid, vector_json),
                    )?;
                    tx.execute(
                        "INSERT INTO chunk_fts (rowid, content) VALUES (?1, ?2)",
                        (rowid, &row.content),
                    )?;
                }
                tx.commit()?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    /// Cosine nearest neighbors for a query embedding, best first.
    ///
    /// Scores are `1 - cosine_distance`; ties resolve in insertion order.
    pub async fn search_vector(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let vector_json = serde_json::to_string(query_embedding)
            .map_err(|err| RagError::Storage(err.to_string()))?;

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT c.rowid, c.id, c.source_id, c.chunk_index, c.content,
                            vec_distance_cosine(e.embedding, vec_f32(?1)) AS distance
                     FROM chunk_embeddings e
                     JOIN chunks c ON c.rowid = e.rowid
                     ORDER BY distance ASC, c.rowid ASC
                     LIMIT ?2",
                )?;
                let rows = stmt.query_map((&vector_json, top_k as i64), |row| {
                    let distance: f32 = row.get(5)?;
                    Ok(ScoredChunk {
                        row: ChunkRow {
                            rowid: row.get(0)?,
                            id: row.get(1)?,
                            source_id: row.get(2)?,
                            chunk_index: row.get::<_, i64>(3)? as usize,
                            content: row.get(4)?,
                        },
                        score: 1.0 - distance,
                    })
                })?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row?);
                }
                Ok::<_, rusqlite::Error>(results)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    /// BM25-ranked full-text matches, best first.
    ///
    /// The query is reduced to an OR of its alphanumeric tokens so raw user
    /// text can never trip FTS5 query syntax. Scores are negated BM25 values
    /// (higher is better).
    pub async fn search_lexical(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let Some(match_expr) = fts_query(query) else {
            return Ok(Vec::new());
        };

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT c.rowid, c.id, c.source_id, c.chunk_index, c.content,
                            bm25(chunk_fts) AS rank
                     FROM chunk_fts
                     JOIN chunks c ON c.rowid = chunk_fts.rowid
                     WHERE chunk_fts MATCH ?1
                     ORDER BY rank ASC, c.rowid ASC
                     LIMIT ?2",
                )?;
                let rows = stmt.query_map((&match_expr, top_k as i64), |row| {
                    let rank: f64 = row.get(5)?;
                    Ok(ScoredChunk {
                        row: ChunkRow {
                            rowid: row.get(0)?,
                            id: row.get(1)?,
                            source_id: row.get(2)?,
                            chunk_index: row.get::<_, i64>(3)? as usize,
                            content: row.get(4)?,
                        },
                        score: -rank as f32,
                    })
                })?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row?);
                }
                Ok::<_, rusqlite::Error>(results)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    pub async fn count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
                Ok::<_, rusqlite::Error>(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    fn register_sqlite_vec() -> Result<(), RagError> {
        use std::sync::Mutex;

        static INIT: Once = Once::new();
        static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

        INIT.call_once(|| {
            let result = unsafe {
                type SqliteExtensionInit = unsafe extern "C" fn(
                    *mut ffi::sqlite3,
                    *mut *mut c_char,
                    *const ffi::sqlite3_api_routines,
                ) -> i32;

                let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
                let init_fn: SqliteExtensionInit =
                    transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
                let rc = ffi::sqlite3_auto_extension(Some(init_fn));
                if rc != 0 {
                    Err(format!(
                        "failed to register sqlite-vec extension (code {rc})"
                    ))
                } else {
                    Ok(())
                }
            };
            *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
        });

        INIT_RESULT
            .lock()
            .expect("init result mutex poisoned")
            .clone()
            .expect("init was called but result not set")
            .map_err(RagError::Storage)
    }
}

/// Builds a defensive FTS5 MATCH expression, or `None` for token-free input.
fn fts_query(query: &str) -> Option<String> {
    let tokens: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| format!("\"{}\"", token.to_lowercase()))
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" OR "))
    }
}
