// Relevance ranking of candidate chunks
pub mod scorer;

pub use scorer::{RankedChunk, ReRankConfig, ReRanker, STOP_WORDS};
