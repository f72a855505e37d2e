//! Fixed-size chunking of raw records.
//!
//! Each record is split independently into windows of at most
//! `chunk_size` extended grapheme clusters, adjacent windows sharing
//! `overlap` clusters. Chunk boundaries never cross records, so every chunk
//! stays attributable to exactly one source. For a record of length `L ≥
//! chunk_size` the window count is `ceil((L - overlap) / (chunk_size -
//! overlap))`; shorter records yield a single chunk and empty records none.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::sources::RawRecord;
use crate::types::RagError;

/// A bounded segment of one record's text, tagged with its provenance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_id: String,
    /// Position of this chunk within its record, starting at 0.
    pub sequence_index: usize,
}

/// Splits records into overlapping fixed-size windows.
#[derive(Clone, Debug)]
pub struct TextChunker {
    config: ChunkingConfig,
}

impl TextChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self, RagError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Splits every record, concatenating the per-record chunk sequences.
    pub fn split_records(&self, records: &[RawRecord]) -> Vec<Chunk> {
        records
            .iter()
            .flat_map(|record| self.split_record(record))
            .collect()
    }

    /// Splits a single record into windows.
    pub fn split_record(&self, record: &RawRecord) -> Vec<Chunk> {
        if record.text.is_empty() {
            return Vec::new();
        }

        // Byte offsets of every grapheme boundary, including the end of the
        // text, so windows slice on glyph boundaries.
        let mut boundaries: Vec<usize> = record
            .text
            .grapheme_indices(true)
            .map(|(offset, _)| offset)
            .collect();
        boundaries.push(record.text.len());

        let length = boundaries.len() - 1;
        let chunk_size = self.config.chunk_size;
        let stride = chunk_size - self.config.overlap;

        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + chunk_size).min(length);
            chunks.push(Chunk {
                text: record.text[boundaries[start]..boundaries[end]].to_string(),
                source_id: record.source_id.clone(),
                sequence_index: chunks.len(),
            });
            if end == length {
                break;
            }
            start += stride;
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str) -> RawRecord {
        RawRecord {
            source_id: "test://record".to_string(),
            text: text.to_string(),
        }
    }

    fn chunker(chunk_size: usize, overlap: usize) -> TextChunker {
        TextChunker::new(
            ChunkingConfig::default()
                .with_chunk_size(chunk_size)
                .with_overlap(overlap),
        )
        .unwrap()
    }

    fn expected_count(length: usize, chunk_size: usize, overlap: usize) -> usize {
        if length == 0 {
            0
        } else if length <= chunk_size {
            1
        } else {
            (length - overlap).div_ceil(chunk_size - overlap)
        }
    }

    #[test]
    fn empty_record_yields_no_chunks() {
        assert!(chunker(10, 0).split_record(&record("")).is_empty());
    }

    #[test]
    fn short_record_yields_single_whole_chunk() {
        let chunks = chunker(100, 10).split_record(&record("short text"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "short text");
        assert_eq!(chunks[0].sequence_index, 0);
    }

    #[test]
    fn chunk_count_matches_window_formula() {
        let text: String = "abcdefghij".repeat(10);
        for &(chunk_size, overlap) in &[(10, 0), (10, 3), (7, 1), (33, 10), (100, 0), (101, 50)] {
            let chunks = chunker(chunk_size, overlap).split_record(&record(&text));
            assert_eq!(
                chunks.len(),
                expected_count(text.len(), chunk_size, overlap),
                "chunk_size={chunk_size} overlap={overlap}"
            );
            for chunk in &chunks {
                assert!(chunk.text.chars().count() <= chunk_size);
            }
        }
    }

    #[test]
    fn zero_overlap_concatenation_reconstructs_text() {
        let text = "The quick brown fox jumps over the lazy dog";
        let chunks = chunker(8, 0).split_record(&record(text));
        let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn overlapping_chunks_share_the_configured_region() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunker(10, 4).split_record(&record(text));
        for pair in chunks.windows(2) {
            let tail: String = pair[0].text.chars().skip(pair[0].text.chars().count() - 4).collect();
            let head: String = pair[1].text.chars().take(4).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn sequence_indexes_restart_per_record() {
        let chunker = chunker(5, 0);
        let records = vec![record("aaaaaaaaaa"), record("bbbbbbbbbb")];
        let chunks = chunker.split_records(&records);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].sequence_index, 0);
        assert_eq!(chunks[1].sequence_index, 1);
        assert_eq!(chunks[2].sequence_index, 0);
        assert_eq!(chunks[3].sequence_index, 1);
    }

    #[test]
    fn multibyte_text_splits_on_grapheme_boundaries() {
        let text = "héllo wörld 👋 grüße";
        let chunks = chunker(4, 1).split_record(&record(text));
        let rebuilt_len: usize = chunks
            .iter()
            .map(|c| c.text.graphemes(true).count())
            .sum::<usize>();
        // Overlap duplicates one grapheme per adjacent pair.
        let original_len = text.graphemes(true).count();
        assert_eq!(rebuilt_len, original_len + (chunks.len() - 1));
    }
}
