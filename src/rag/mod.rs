// Retrieval core: chunking, lexical ranking, context assembly and
// orchestration of the synthesizer call.
//
// Components:
// - Chunker: overlapping, sentence-aware text windows
// - Retrieval Engine: candidate pool selection from storage
// - Re-ranking: keyword relevance scoring with fallback
// - Context Builder: labelled excerpts in ranked order
// - Pipeline: rank -> context -> synthesize, with provenance

pub mod chunker;
pub mod context;
pub mod pipeline;
pub mod reranking;
pub mod retrieval;

// Re-export key types
pub use chunker::{chunk_text, TextChunk, TextChunker};
pub use context::{AssembledContext, ContextBuilder};
pub use pipeline::{RAGConfig, RAGPipeline, RAGResult, NO_CONTENT_ANSWER};
pub use reranking::{RankedChunk, ReRanker};
pub use retrieval::RetrievalEngine;
