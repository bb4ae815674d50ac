// Answer pipeline: rank -> build context -> synthesize
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{DocError, Result};
use crate::rag::context::{ContextBuilder, ContextConfig};
use crate::rag::reranking::{RankedChunk, ReRankConfig, ReRanker};
use crate::store::models::Chunk;
use crate::synthesis::{
    build_user_prompt, SynthesisError, SynthesisRequest, Synthesizer, SYSTEM_PROMPT,
};

/// Answer returned when there is nothing to rank
pub const NO_CONTENT_ANSWER: &str = "No relevant document content found to answer the question.";

/// Default number of chunks sent as context
pub const DEFAULT_CONTEXT_LIMIT: usize = 10;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RAGConfig {
    /// Maximum chunks handed to the synthesizer
    pub limit: usize,
    /// Re-ranking configuration
    pub rerank: ReRankConfig,
    /// Context assembly configuration
    pub context: ContextConfig,
}

impl Default for RAGConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_CONTEXT_LIMIT,
            rerank: ReRankConfig::default(),
            context: ContextConfig::default(),
        }
    }
}

/// Outcome of answering one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RAGResult {
    /// Synthesized answer, sentinel, or readable generation error
    pub answer: String,
    /// Every chunk sent as context, in ranked order
    pub chunk_ids: Vec<i64>,
    /// Distinct documents owning those chunks
    pub document_ids: Vec<i64>,
    /// Working set with scores
    pub ranked: Vec<RankedChunk>,
    /// True when the answer text describes a failed generation call
    pub generation_failed: bool,
}

impl RAGResult {
    fn sentinel() -> Self {
        Self {
            answer: NO_CONTENT_ANSWER.to_string(),
            chunk_ids: Vec::new(),
            document_ids: Vec::new(),
            ranked: Vec::new(),
            generation_failed: false,
        }
    }
}

/// End-to-end answer pipeline
pub struct RAGPipeline {
    reranker: ReRanker,
    context_builder: ContextBuilder,
    config: RAGConfig,
}

impl RAGPipeline {
    /// Create new pipeline with default configuration
    pub fn new() -> Self {
        Self::with_config(RAGConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(config: RAGConfig) -> Self {
        Self {
            reranker: ReRanker::with_config(config.rerank.clone()),
            context_builder: ContextBuilder::with_config(config.context.clone()),
            config,
        }
    }

    /// Answer `question` from `candidates` using `synthesizer`
    ///
    /// An empty working set yields [`NO_CONTENT_ANSWER`] without calling the
    /// synthesizer. A per-call generation failure becomes the answer text and
    /// keeps the chunk ids; an unavailable synthesizer is an error.
    pub async fn answer(
        &self,
        question: &str,
        candidates: &[Chunk],
        synthesizer: &dyn Synthesizer,
    ) -> Result<RAGResult> {
        let ranked = self.reranker.rank(question, candidates, self.config.limit);
        if ranked.is_empty() {
            debug!("empty working set, skipping synthesis");
            return Ok(RAGResult::sentinel());
        }

        let context = self.context_builder.build(&ranked);
        debug!(
            candidates = candidates.len(),
            selected = context.chunk_count(),
            top_score = ranked[0].score,
            "assembled context"
        );

        let request = SynthesisRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: build_user_prompt(question, &context.text),
        };

        let (answer, generation_failed) = match synthesizer.synthesize(&request).await {
            Ok(answer) => (answer, false),
            Err(SynthesisError::Generation(message)) => {
                warn!(synthesizer = synthesizer.name(), error = %message, "generation failed");
                (message, true)
            }
            Err(SynthesisError::Unavailable(reason)) => {
                return Err(DocError::SynthesizerUnavailable(reason));
            }
        };

        info!(
            synthesizer = synthesizer.name(),
            chunks = context.chunk_count(),
            documents = context.document_ids.len(),
            "answered question"
        );

        Ok(RAGResult {
            answer,
            chunk_ids: context.chunk_ids,
            document_ids: context.document_ids,
            ranked,
            generation_failed,
        })
    }

    /// Get current configuration
    pub fn config(&self) -> &RAGConfig {
        &self.config
    }

    /// Update configuration
    pub fn set_config(&mut self, config: RAGConfig) {
        self.reranker.set_config(config.rerank.clone());
        self.context_builder.set_config(config.context.clone());
        self.config = config;
    }
}

impl Default for RAGPipeline {
    fn default() -> Self {
        Self::new()
    }
}
