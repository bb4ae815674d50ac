// Retrieval: candidate pool loading
pub mod engine;

pub use engine::RetrievalEngine;
