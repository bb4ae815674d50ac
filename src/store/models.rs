//! Persistent record types
//!
//! Documents own chunks; conversations own question/answer entries; an
//! answer records which documents and chunks it was built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extract::FileType;

/// Length of the chunk preview shown in answers and listings
pub const PREVIEW_CHARS: usize = 200;

/// An uploaded document and its extracted text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub filename: String,
    pub file_type: FileType,
    /// Where the uploaded bytes live on disk
    pub file_path: String,
    /// Extracted text, or an error marker when parsing failed
    pub parsed_content: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Listing row: document metadata without its body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: i64,
    pub filename: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub chunk_count: i64,
}

/// A document about to be inserted
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub file_type: FileType,
    pub file_path: String,
    pub parsed_content: String,
    pub file_size: i64,
}

/// One retrieval unit of a document's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: i64,
    pub document_id: i64,
    /// Filename of the owning document, used to label excerpts
    pub document_name: String,
    /// Zero-based position within the document
    pub chunk_index: i64,
    pub content: String,
    pub start_char: i64,
    pub end_char: i64,
}

impl Chunk {
    /// First [`PREVIEW_CHARS`] characters, with an ellipsis when cut
    pub fn preview(&self) -> String {
        preview(&self.content)
    }
}

/// A question/answer session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row for conversations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub question_count: i64,
    /// Most recent question, if any
    pub last_question: Option<String>,
}

/// One answered question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub id: i64,
    pub conversation_id: i64,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
    /// Documents that contributed chunks to the answer
    pub source_document_ids: Vec<i64>,
    /// Chunks that were sent as context, still resolvable
    pub source_chunks: Vec<Chunk>,
}

/// Chunk reference as shown to API and CLI users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceChunk {
    pub id: i64,
    pub document_name: String,
    pub chunk_index: i64,
    pub content: String,
    pub preview: String,
}

impl From<&Chunk> for SourceChunk {
    fn from(chunk: &Chunk) -> Self {
        Self {
            id: chunk.id,
            document_name: chunk.document_name.clone(),
            chunk_index: chunk.chunk_index,
            content: chunk.content.clone(),
            preview: chunk.preview(),
        }
    }
}

/// Truncate text to a display preview
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
