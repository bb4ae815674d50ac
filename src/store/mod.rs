//! SQLite persistence for documents, chunks and conversations
//!
//! One connection behind a mutex. Every multi-row write (a document with its
//! chunks, an answer with its provenance) runs inside a single transaction.

pub mod files;
pub mod models;

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::errors::{DocError, Result};
use crate::extract::FileType;
use crate::rag::chunker::TextChunk;

pub use files::FileStore;
pub use models::{
    Chunk, Conversation, ConversationSummary, Document, DocumentSummary, NewDocument,
    QuestionAnswer, SourceChunk,
};

const SCHEMA: &str = "
PRAGMA journal_mode=WAL;
PRAGMA foreign_keys=ON;

CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL UNIQUE,
    file_type TEXT NOT NULL,
    file_path TEXT NOT NULL,
    parsed_content TEXT NOT NULL DEFAULT '',
    file_size INTEGER NOT NULL DEFAULT 0,
    uploaded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    start_char INTEGER NOT NULL,
    end_char INTEGER NOT NULL,
    UNIQUE (document_id, chunk_index),
    FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS conversations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS question_answers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id INTEGER NOT NULL,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS qa_source_documents (
    qa_id INTEGER NOT NULL,
    document_id INTEGER NOT NULL,
    PRIMARY KEY (qa_id, document_id),
    FOREIGN KEY (qa_id) REFERENCES question_answers(id) ON DELETE CASCADE,
    FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS qa_source_chunks (
    qa_id INTEGER NOT NULL,
    chunk_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (qa_id, chunk_id),
    FOREIGN KEY (qa_id) REFERENCES question_answers(id) ON DELETE CASCADE,
    FOREIGN KEY (chunk_id) REFERENCES chunks(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id);
CREATE INDEX IF NOT EXISTS idx_qa_conversation ON question_answers(conversation_id);
";

const DOCUMENT_COLUMNS: &str =
    "id, filename, file_type, file_path, parsed_content, file_size, uploaded_at";

const CHUNK_COLUMNS: &str = "c.id, c.document_id, d.filename, c.chunk_index, c.content, c.start_char, c.end_char";

/// Which documents a question may draw chunks from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CandidateScope {
    /// Every stored chunk
    #[default]
    All,
    /// Only chunks owned by these documents
    Documents(Vec<i64>),
}

impl CandidateScope {
    /// An empty id list means no restriction
    pub fn from_ids(ids: Vec<i64>) -> Self {
        if ids.is_empty() {
            CandidateScope::All
        } else {
            CandidateScope::Documents(ids)
        }
    }
}

/// Result of inserting a document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInsert {
    pub document: Document,
    /// False when a document with the same filename already existed
    pub created: bool,
    pub chunk_count: usize,
}

/// Answer to persist with its provenance
#[derive(Debug, Clone)]
pub struct NewAnswer<'a> {
    /// Existing conversation, or None to start one in the same transaction
    pub conversation_id: Option<i64>,
    pub question: &'a str,
    pub answer: &'a str,
    /// Chunks sent as context, in ranked order
    pub chunk_ids: &'a [i64],
    pub document_ids: &'a [i64],
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (creating if needed) the database file and apply the schema
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        info!(path = %path.display(), "database ready");
        Ok(db)
    }

    /// Private in-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DocError::Storage("database lock poisoned".to_string()))
    }

    // ── Documents ──

    /// Insert a document and all of its chunks atomically
    ///
    /// If the filename is already taken the existing document is returned
    /// untouched and `created` is false.
    pub fn insert_document_with_chunks(
        &self,
        document: &NewDocument,
        chunks: &[TextChunk],
    ) -> Result<DocumentInsert> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO documents (filename, file_type, file_path, parsed_content, file_size, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(filename) DO NOTHING",
            params![
                document.filename,
                document.file_type.as_str(),
                document.file_path,
                document.parsed_content,
                document.file_size,
                Utc::now(),
            ],
        )?;

        if inserted == 0 {
            let existing = query_document_by_filename(&tx, &document.filename)?.ok_or_else(|| {
                DocError::Storage(format!("document '{}' vanished during insert", document.filename))
            })?;
            let chunk_count = count_chunks(&tx, existing.id)?;
            tx.commit()?;
            debug!(document_id = existing.id, filename = %existing.filename, "duplicate filename, keeping existing document");
            return Ok(DocumentInsert {
                document: existing,
                created: false,
                chunk_count,
            });
        }

        let document_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks (document_id, chunk_index, content, start_char, end_char)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (index, chunk) in chunks.iter().enumerate() {
                stmt.execute(params![
                    document_id,
                    index as i64,
                    chunk.content,
                    chunk.start as i64,
                    chunk.end as i64,
                ])?;
            }
        }

        let stored = query_document(&tx, document_id)?
            .ok_or(DocError::NotFound { entity: "Document", id: document_id })?;
        tx.commit()?;

        info!(document_id, filename = %stored.filename, chunks = chunks.len(), "stored document");
        Ok(DocumentInsert {
            document: stored,
            created: true,
            chunk_count: chunks.len(),
        })
    }

    pub fn find_document_by_filename(&self, filename: &str) -> Result<Option<Document>> {
        let conn = self.conn()?;
        query_document_by_filename(&conn, filename)
    }

    pub fn get_document(&self, id: i64) -> Result<Document> {
        let conn = self.conn()?;
        query_document(&conn, id)?.ok_or(DocError::NotFound { entity: "Document", id })
    }

    /// All documents, newest first
    pub fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT d.id, d.filename, d.file_type, d.file_size, d.uploaded_at,
                    (SELECT COUNT(*) FROM chunks c WHERE c.document_id = d.id)
             FROM documents d
             ORDER BY d.uploaded_at DESC, d.id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DocumentSummary {
                id: row.get(0)?,
                filename: row.get(1)?,
                file_type: file_type_column(row, 2)?,
                file_size: row.get(3)?,
                uploaded_at: row.get(4)?,
                chunk_count: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Chunks of one document in index order
    pub fn document_chunks(&self, document_id: i64) -> Result<Vec<Chunk>> {
        let conn = self.conn()?;
        if query_document(&conn, document_id)?.is_none() {
            return Err(DocError::NotFound { entity: "Document", id: document_id });
        }
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM chunks c JOIN documents d ON d.id = c.document_id
             WHERE c.document_id = ?1 ORDER BY c.chunk_index",
            CHUNK_COLUMNS
        ))?;
        let rows = stmt.query_map(params![document_id], chunk_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Delete a document; chunks and provenance rows cascade
    ///
    /// Returns the deleted record so the caller can remove its file.
    pub fn delete_document(&self, id: i64) -> Result<Document> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let document = query_document(&tx, id)?.ok_or(DocError::NotFound { entity: "Document", id })?;
        tx.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        tx.commit()?;
        info!(document_id = id, filename = %document.filename, "deleted document");
        Ok(document)
    }

    /// Candidate pool for a question, ordered by document then chunk index
    pub fn candidate_chunks(&self, scope: &CandidateScope) -> Result<Vec<Chunk>> {
        let conn = self.conn()?;
        let chunks = match scope {
            CandidateScope::All => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM chunks c JOIN documents d ON d.id = c.document_id
                     ORDER BY c.document_id, c.chunk_index",
                    CHUNK_COLUMNS
                ))?;
                let rows = stmt.query_map([], chunk_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            CandidateScope::Documents(ids) => {
                let placeholders = vec!["?"; ids.len()].join(", ");
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM chunks c JOIN documents d ON d.id = c.document_id
                     WHERE c.document_id IN ({})
                     ORDER BY c.document_id, c.chunk_index",
                    CHUNK_COLUMNS, placeholders
                ))?;
                let rows = stmt.query_map(params_from_iter(ids.iter()), chunk_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        debug!(scope = ?scope, candidates = chunks.len(), "loaded candidate chunks");
        Ok(chunks)
    }

    // ── Conversations ──

    pub fn create_conversation(&self) -> Result<Conversation> {
        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO conversations (created_at, updated_at) VALUES (?1, ?2)",
            params![now, now],
        )?;
        let id = conn.last_insert_rowid();
        debug!(conversation_id = id, "created conversation");
        Ok(Conversation {
            id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_conversation(&self, id: i64) -> Result<Conversation> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, created_at, updated_at FROM conversations WHERE id = ?1",
            params![id],
            |row| {
                Ok(Conversation {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    updated_at: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or(DocError::NotFound { entity: "Conversation", id })
    }

    /// All conversations, most recently active first
    pub fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT v.id, v.created_at, v.updated_at,
                    (SELECT COUNT(*) FROM question_answers q WHERE q.conversation_id = v.id),
                    (SELECT q.question FROM question_answers q WHERE q.conversation_id = v.id
                     ORDER BY q.created_at DESC, q.id DESC LIMIT 1)
             FROM conversations v
             ORDER BY v.updated_at DESC, v.id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ConversationSummary {
                id: row.get(0)?,
                created_at: row.get(1)?,
                updated_at: row.get(2)?,
                question_count: row.get(3)?,
                last_question: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Persist an answer and its provenance; touches the conversation
    ///
    /// With no conversation id a new conversation is created in the same
    /// transaction, so a failed write leaves nothing behind.
    pub fn record_answer(&self, answer: &NewAnswer<'_>) -> Result<QuestionAnswer> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let conversation_id = match answer.conversation_id {
            Some(id) => {
                let touched = tx.execute(
                    "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                    params![now, id],
                )?;
                if touched == 0 {
                    return Err(DocError::NotFound { entity: "Conversation", id });
                }
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO conversations (created_at, updated_at) VALUES (?1, ?2)",
                    params![now, now],
                )?;
                tx.last_insert_rowid()
            }
        };

        tx.execute(
            "INSERT INTO question_answers (conversation_id, question, answer, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![conversation_id, answer.question, answer.answer, now],
        )?;
        let qa_id = tx.last_insert_rowid();

        // Sources deleted while the answer was generated are skipped; the
        // answer itself is still recorded.
        let mut dropped = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO qa_source_documents (qa_id, document_id)
                 SELECT ?1, id FROM documents WHERE id = ?2",
            )?;
            for document_id in answer.document_ids {
                if stmt.execute(params![qa_id, document_id])? == 0 {
                    dropped += 1;
                }
            }

            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO qa_source_chunks (qa_id, chunk_id, position)
                 SELECT ?1, id, ?3 FROM chunks WHERE id = ?2",
            )?;
            for (position, chunk_id) in answer.chunk_ids.iter().enumerate() {
                if stmt.execute(params![qa_id, chunk_id, position as i64])? == 0 {
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            warn!(qa_id, dropped, "sources deleted before the answer was recorded");
        }

        let source_chunks = query_source_chunks(&tx, qa_id)?;
        let source_document_ids = query_source_documents(&tx, qa_id)?;
        tx.commit()?;

        info!(
            qa_id,
            conversation_id,
            chunks = answer.chunk_ids.len(),
            "recorded answer"
        );

        Ok(QuestionAnswer {
            id: qa_id,
            conversation_id,
            question: answer.question.to_string(),
            answer: answer.answer.to_string(),
            created_at: now,
            source_document_ids,
            source_chunks,
        })
    }

    /// Answers of a conversation, newest first, with surviving sources
    pub fn conversation_history(&self, conversation_id: i64) -> Result<Vec<QuestionAnswer>> {
        let conn = self.conn()?;
        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM conversations WHERE id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(DocError::NotFound {
                entity: "Conversation",
                id: conversation_id,
            });
        }

        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, question, answer, created_at
             FROM question_answers WHERE conversation_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![conversation_id], |row| {
            Ok(QuestionAnswer {
                id: row.get(0)?,
                conversation_id: row.get(1)?,
                question: row.get(2)?,
                answer: row.get(3)?,
                created_at: row.get(4)?,
                source_document_ids: Vec::new(),
                source_chunks: Vec::new(),
            })
        })?;
        let mut history = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        for qa in &mut history {
            qa.source_chunks = query_source_chunks(&conn, qa.id)?;
            qa.source_document_ids = query_source_documents(&conn, qa.id)?;
        }
        Ok(history)
    }
}

fn file_type_column(row: &Row<'_>, index: usize) -> rusqlite::Result<FileType> {
    let tag: String = row.get(index)?;
    Ok(tag.parse().unwrap_or(FileType::Other))
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        filename: row.get(1)?,
        file_type: file_type_column(row, 2)?,
        file_path: row.get(3)?,
        parsed_content: row.get(4)?,
        file_size: row.get(5)?,
        uploaded_at: row.get(6)?,
    })
}

fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<Chunk> {
    Ok(Chunk {
        id: row.get(0)?,
        document_id: row.get(1)?,
        document_name: row.get(2)?,
        chunk_index: row.get(3)?,
        content: row.get(4)?,
        start_char: row.get(5)?,
        end_char: row.get(6)?,
    })
}

fn query_document(conn: &Connection, id: i64) -> Result<Option<Document>> {
    let doc = conn
        .query_row(
            &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
            params![id],
            document_from_row,
        )
        .optional()?;
    Ok(doc)
}

fn query_document_by_filename(conn: &Connection, filename: &str) -> Result<Option<Document>> {
    let doc = conn
        .query_row(
            &format!("SELECT {} FROM documents WHERE filename = ?1", DOCUMENT_COLUMNS),
            params![filename],
            document_from_row,
        )
        .optional()?;
    Ok(doc)
}

fn count_chunks(conn: &Connection, document_id: i64) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM chunks WHERE document_id = ?1",
        params![document_id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

fn query_source_chunks(conn: &Connection, qa_id: i64) -> Result<Vec<Chunk>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM qa_source_chunks s
         JOIN chunks c ON c.id = s.chunk_id
         JOIN documents d ON d.id = c.document_id
         WHERE s.qa_id = ?1 ORDER BY s.position",
        CHUNK_COLUMNS
    ))?;
    let rows = stmt.query_map(params![qa_id], chunk_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn query_source_documents(conn: &Connection, qa_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT document_id FROM qa_source_documents WHERE qa_id = ?1 ORDER BY document_id",
    )?;
    let rows = stmt.query_map(params![qa_id], |row| row.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<i64>>>()?)
}
