// Candidate pool selection for a question
use std::sync::Arc;
use tracing::debug;

use crate::errors::{DocError, Result};
use crate::store::models::Chunk;
use crate::store::{CandidateScope, Database};

/// Loads the chunks a question may be answered from
pub struct RetrievalEngine {
    database: Arc<Database>,
}

impl RetrievalEngine {
    /// Create new retrieval engine over a database
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Candidate pool for the given document ids (empty = every document)
    pub fn candidates(&self, document_ids: &[i64]) -> Result<Vec<Chunk>> {
        let scope = CandidateScope::from_ids(document_ids.to_vec());
        self.retrieve(&scope)
    }

    /// Candidate pool for an explicit scope
    pub fn retrieve(&self, scope: &CandidateScope) -> Result<Vec<Chunk>> {
        self.database.candidate_chunks(scope)
    }

    /// Like [`retrieve`](Self::retrieve) but an empty pool is an error
    ///
    /// Blank chunks still count: a document whose only chunk is whitespace
    /// has content for this check even though it can never be scored.
    pub fn require_candidates(&self, scope: &CandidateScope) -> Result<Vec<Chunk>> {
        let pool = self.retrieve(scope)?;
        if pool.is_empty() {
            debug!(scope = ?scope, "no candidate chunks");
            return Err(DocError::NoChunksAvailable);
        }
        Ok(pool)
    }
}
