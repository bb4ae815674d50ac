// Keyword relevance scorer for candidate chunks
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::store::models::Chunk;

/// Function words that never count as significant terms
pub const STOP_WORDS: [&str; 45] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "is", "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did",
    "will", "would", "should", "could", "may", "might", "can", "this", "that", "these",
    "those", "what", "which", "who", "whom", "where", "when", "why", "how",
];

/// Scoring weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReRankConfig {
    /// Added once per significant term present in the chunk
    pub term_presence_weight: f64,
    /// Added when the whole lowercased question appears verbatim
    pub phrase_bonus: f64,
    /// Added per occurrence of every significant term
    pub occurrence_weight: f64,
    /// Tokens this short or shorter are ignored
    pub min_term_len: usize,
}

impl Default for ReRankConfig {
    fn default() -> Self {
        Self {
            term_presence_weight: 1.0,
            phrase_bonus: 5.0,
            occurrence_weight: 0.5,
            min_term_len: 2,
        }
    }
}

/// Chunk with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedChunk {
    pub chunk: Chunk,
    /// Zero when the chunk was picked by the fallback
    pub score: f64,
}

/// Lexical relevance ranker
pub struct ReRanker {
    config: ReRankConfig,
}

impl ReRanker {
    /// Create new re-ranker with default config
    pub fn new() -> Self {
        Self {
            config: ReRankConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(config: ReRankConfig) -> Self {
        Self { config }
    }

    /// Rank `chunks` against `question`, best first, at most `limit` results.
    ///
    /// When nothing scores above zero the first `limit` candidates are
    /// returned in their original order so the caller always has context.
    pub fn rank(&self, question: &str, chunks: &[Chunk], limit: usize) -> Vec<RankedChunk> {
        if chunks.is_empty() {
            return Vec::new();
        }

        let question_lower = question.to_lowercase();
        let terms = self.significant_terms(&question_lower);

        let mut scored: Vec<RankedChunk> = chunks
            .iter()
            .filter(|chunk| !chunk.content.is_empty())
            .filter_map(|chunk| {
                let score = self.score_lowered(&question_lower, &terms, &chunk.content);
                (score > 0.0).then(|| RankedChunk {
                    chunk: chunk.clone(),
                    score,
                })
            })
            .collect();

        // sort_by is stable: ties keep candidate order
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        if scored.is_empty() {
            return chunks
                .iter()
                .take(limit)
                .map(|chunk| RankedChunk {
                    chunk: chunk.clone(),
                    score: 0.0,
                })
                .collect();
        }

        scored
    }

    /// Relevance of a single chunk text for a question
    pub fn score(&self, question: &str, content: &str) -> f64 {
        let question_lower = question.to_lowercase();
        let terms = self.significant_terms(&question_lower);
        self.score_lowered(&question_lower, &terms, content)
    }

    /// Whitespace tokens of an already-lowercased question that carry meaning
    pub fn significant_terms(&self, question_lower: &str) -> HashSet<String> {
        question_lower
            .split_whitespace()
            .filter(|word| word.chars().count() > self.config.min_term_len)
            .filter(|word| !STOP_WORDS.contains(word))
            .map(str::to_string)
            .collect()
    }

    fn score_lowered(&self, question_lower: &str, terms: &HashSet<String>, content: &str) -> f64 {
        if content.is_empty() {
            return 0.0;
        }
        let content_lower = content.to_lowercase();

        let present = terms
            .iter()
            .filter(|term| content_lower.contains(term.as_str()))
            .count();
        let mut score = present as f64 * self.config.term_presence_weight;

        if content_lower.contains(question_lower) {
            score += self.config.phrase_bonus;
        }

        // Counts every occurrence, including the one already credited above
        for term in terms {
            score += content_lower.matches(term.as_str()).count() as f64
                * self.config.occurrence_weight;
        }

        score
    }

    /// Get current configuration
    pub fn config(&self) -> &ReRankConfig {
        &self.config
    }

    /// Update configuration
    pub fn set_config(&mut self, config: ReRankConfig) {
        self.config = config;
    }
}

impl Default for ReRanker {
    fn default() -> Self {
        Self::new()
    }
}
