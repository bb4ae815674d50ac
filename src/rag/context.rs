// Context builder: labelled excerpts handed to the language model
use serde::{Deserialize, Serialize};

use crate::rag::reranking::RankedChunk;

/// Visible separator between excerpts
pub const EXCERPT_SEPARATOR: &str = "\n\n---\n\n";

/// Context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Character budget for the joined excerpts (None = unbounded).
    /// The first excerpt is always kept.
    pub max_context_chars: Option<usize>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_chars: None,
        }
    }
}

/// Assembled context for the synthesis prompt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    /// Excerpts joined in ranked order
    pub text: String,
    /// Chunk IDs included, in the same order
    pub chunk_ids: Vec<i64>,
    /// Distinct owning documents, first-seen order
    pub document_ids: Vec<i64>,
}

impl AssembledContext {
    /// Number of excerpts in the context
    pub fn chunk_count(&self) -> usize {
        self.chunk_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_ids.is_empty()
    }
}

/// Context builder for assembling excerpt blocks
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    /// Create new context builder with default config
    pub fn new() -> Self {
        Self {
            config: ContextConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Build context from ranked chunks, keeping their order
    pub fn build(&self, ranked: &[RankedChunk]) -> AssembledContext {
        let mut parts: Vec<String> = Vec::new();
        let mut chunk_ids = Vec::new();
        let mut document_ids = Vec::new();
        let mut total_chars = 0;

        for item in ranked {
            let excerpt = Self::format_excerpt(item);
            let excerpt_chars = excerpt.chars().count();
            let separator_chars = if parts.is_empty() { 0 } else { EXCERPT_SEPARATOR.len() };

            if let Some(budget) = self.config.max_context_chars {
                if !parts.is_empty() && total_chars + separator_chars + excerpt_chars > budget {
                    break;
                }
            }

            total_chars += separator_chars + excerpt_chars;
            parts.push(excerpt);
            chunk_ids.push(item.chunk.id);
            if !document_ids.contains(&item.chunk.document_id) {
                document_ids.push(item.chunk.document_id);
            }
        }

        AssembledContext {
            text: parts.join(EXCERPT_SEPARATOR),
            chunk_ids,
            document_ids,
        }
    }

    /// `[From <file>, Chunk <n>]` header followed by the chunk text
    fn format_excerpt(item: &RankedChunk) -> String {
        format!(
            "[From {}, Chunk {}]\n{}",
            item.chunk.document_name,
            item.chunk.chunk_index + 1,
            item.chunk.content
        )
    }

    /// Get current configuration
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Update configuration
    pub fn set_config(&mut self, config: ContextConfig) {
        self.config = config;
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
