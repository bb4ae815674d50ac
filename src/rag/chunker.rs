//! Text chunker
//!
//! Splits extracted document text into overlapping windows that prefer to
//! end on a sentence boundary. Offsets are character positions into the
//! source text, so they stay valid for non-ASCII documents.

use serde::{Deserialize, Serialize};

use crate::cli::config::ChunkingConfig;
use crate::errors::Result;

/// Sentence terminators tried in priority order when snapping a window end
const BOUNDARY_MARKERS: [[char; 2]; 7] = [
    ['.', ' '],
    ['.', '\n'],
    ['!', ' '],
    ['!', '\n'],
    ['?', ' '],
    ['?', '\n'],
    ['\n', '\n'],
];

/// A boundary is only accepted past this fraction of the window
const MIN_BOUNDARY_FRACTION: f64 = 0.7;

/// One window of source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Trimmed window text
    pub content: String,
    /// Start offset (inclusive, in characters)
    pub start: usize,
    /// End offset (exclusive, in characters)
    pub end: usize,
}

/// Deterministic overlapping text splitter
#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkingConfig,
}

impl TextChunker {
    /// Create a chunker, rejecting unusable window parameters
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Split `text` into ordered, overlapping chunks
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chunk_size = self.config.chunk_size;
        let overlap = self.config.overlap;
        let chars: Vec<char> = text.chars().collect();
        let text_len = chars.len();

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < text_len {
            let mut end = (start + chunk_size).min(text_len);

            if end < text_len {
                let threshold = start as f64 + chunk_size as f64 * MIN_BOUNDARY_FRACTION;
                for marker in BOUNDARY_MARKERS.iter() {
                    if let Some(pos) = rfind_marker(&chars, marker, start, end) {
                        if pos as f64 > threshold {
                            end = pos + marker.len();
                            break;
                        }
                    }
                }
            }

            let content: String = chars[start..end].iter().collect::<String>().trim().to_string();
            if !content.is_empty() {
                chunks.push(TextChunk { content, start, end });
            }

            let stepped = end.saturating_sub(overlap);
            // Once the tail is reached, a forced one-character step would only
            // re-emit suffixes of the window just produced.
            if end == text_len && stepped <= start {
                break;
            }
            start = stepped.max(start + 1);
        }

        chunks
    }

    /// Current window configuration
    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }
}

/// Split text with explicit window parameters
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<TextChunk>> {
    let chunker = TextChunker::new(ChunkingConfig { chunk_size, overlap })?;
    Ok(chunker.chunk(text))
}

/// Last position `i` in `[start, end)` where `marker` fits entirely before `end`
fn rfind_marker(chars: &[char], marker: &[char; 2], start: usize, end: usize) -> Option<usize> {
    if end < start + marker.len() {
        return None;
    }
    (start..=end - marker.len())
        .rev()
        .find(|&i| chars[i] == marker[0] && chars[i + 1] == marker[1])
}
