//! Document analyzer service
//!
//! Composes extraction, chunking, storage, retrieval and synthesis into the
//! operations exposed by the HTTP server and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cli::config::{ChunkingConfig, Config};
use crate::errors::{DocError, Result};
use crate::extract::{extract_text, Extraction, FileType};
use crate::rag::chunker::{TextChunk, TextChunker};
use crate::rag::context::ContextConfig;
use crate::rag::pipeline::{RAGConfig, RAGPipeline};
use crate::rag::retrieval::RetrievalEngine;
use crate::store::models::{
    Chunk, Conversation, ConversationSummary, Document, DocumentSummary, NewDocument, SourceChunk,
};
use crate::store::{CandidateScope, Database, FileStore, NewAnswer};
use crate::synthesis::{OllamaSynthesizer, SynthesisError, SynthesizerHandle};

/// Result of an upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub document: Document,
    /// False when a document with this filename already existed
    pub created: bool,
    pub chunk_count: usize,
    /// True when the file could not be parsed
    pub parse_failed: bool,
}

/// A question from a client
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub question: String,
    #[serde(default)]
    pub conversation_id: Option<i64>,
    /// Restrict the candidate pool; empty or null means every document
    #[serde(default, deserialize_with = "null_as_default")]
    pub document_ids: Vec<i64>,
}

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }
}

/// Answer plus provenance
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub conversation_id: i64,
    pub qa_id: i64,
    pub source_chunks: Vec<SourceChunk>,
}

/// One document with its chunks
#[derive(Debug, Clone, Serialize)]
pub struct DocumentDetail {
    pub document: Document,
    pub chunks: Vec<Chunk>,
}

/// One entry of a conversation history
#[derive(Debug, Clone, Serialize)]
pub struct QaView {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
    pub source_document_ids: Vec<i64>,
    pub source_chunks: Vec<SourceChunk>,
}

/// A conversation with its answers, newest first
#[derive(Debug, Clone, Serialize)]
pub struct ConversationDetail {
    pub conversation: Conversation,
    pub qa_pairs: Vec<QaView>,
}

/// Application service over one database and one file store
pub struct DocumentAnalyzer {
    database: Arc<Database>,
    files: FileStore,
    chunking: ChunkingConfig,
    retrieval: RetrievalEngine,
    pipeline: RAGPipeline,
    synthesizer: SynthesizerHandle,
}

impl DocumentAnalyzer {
    /// Assemble the service from already-open parts
    pub fn new(
        database: Arc<Database>,
        files: FileStore,
        config: &Config,
        synthesizer: SynthesizerHandle,
    ) -> Result<Self> {
        config.chunking.validate()?;
        let pipeline = RAGPipeline::with_config(RAGConfig {
            limit: config.retrieval.limit,
            context: ContextConfig {
                max_context_chars: config.retrieval.max_context_chars,
            },
            ..RAGConfig::default()
        });

        Ok(Self {
            retrieval: RetrievalEngine::new(Arc::clone(&database)),
            database,
            files,
            chunking: config.chunking,
            pipeline,
            synthesizer,
        })
    }

    /// Open storage from the configured paths and connect to Ollama once
    pub async fn from_config(config: &Config) -> Result<Self> {
        let database = Arc::new(Database::open(&config.database_path())?);
        let files = FileStore::new(config.documents_dir());
        let synthesizer = connect_synthesizer(config).await;
        Self::new(database, files, config, synthesizer)
    }

    pub fn synthesizer(&self) -> &SynthesizerHandle {
        &self.synthesizer
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// Store, parse and chunk one uploaded file
    ///
    /// A filename that already exists returns the existing document without
    /// writing or parsing anything.
    pub async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadOutcome> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(DocError::MissingFile);
        }
        let file_type = FileType::from_filename(filename)?;

        if let Some(existing) = self.database.find_document_by_filename(filename)? {
            info!(document_id = existing.id, filename, "file already exists");
            let chunk_count = self.database.document_chunks(existing.id)?.len();
            return Ok(UploadOutcome {
                document: existing,
                created: false,
                chunk_count,
                parse_failed: false,
            });
        }

        let file_size = bytes.len() as i64;
        let path = self.files.save(filename, &bytes).await?;
        drop(bytes);

        let (extraction, chunks) = match self.parse(path.clone(), file_type).await {
            Ok(parsed) => parsed,
            Err(e) => {
                self.discard(&path).await;
                return Err(e);
            }
        };

        let new_document = NewDocument {
            filename: filename.to_string(),
            file_type,
            file_path: path.to_string_lossy().into_owned(),
            parsed_content: extraction.content().to_string(),
            file_size,
        };

        let inserted = match self.database.insert_document_with_chunks(&new_document, &chunks) {
            Ok(inserted) => inserted,
            Err(e) => {
                self.discard(&path).await;
                return Err(e);
            }
        };
        if !inserted.created {
            // lost a race with a concurrent upload of the same name
            self.discard(&path).await;
        }

        info!(
            document_id = inserted.document.id,
            filename,
            file_type = %file_type,
            chunks = inserted.chunk_count,
            parse_failed = extraction.is_failed(),
            "upload complete"
        );

        Ok(UploadOutcome {
            document: inserted.document,
            created: inserted.created,
            chunk_count: inserted.chunk_count,
            parse_failed: extraction.is_failed(),
        })
    }

    /// Extraction and chunking off the async runtime
    async fn parse(&self, path: PathBuf, file_type: FileType) -> Result<(Extraction, Vec<TextChunk>)> {
        let chunker = TextChunker::new(self.chunking)?;
        tokio::task::spawn_blocking(move || {
            let extraction = extract_text(&path, file_type);
            let chunks = match &extraction {
                Extraction::Text(text) => chunker.chunk(text),
                Extraction::Failed(_) => Vec::new(),
            };
            (extraction, chunks)
        })
        .await
        .map_err(|e| DocError::Storage(format!("parse task failed: {}", e)))
    }

    async fn discard(&self, path: &std::path::Path) {
        if let Err(e) = self.files.remove(path).await {
            warn!(path = %path.display(), error = %e, "failed to remove stored file");
        }
    }

    /// Answer a question and record it in a conversation
    ///
    /// Validation, lookup and availability checks all happen before anything
    /// is written.
    pub async fn ask(&self, request: AskRequest) -> Result<AskResponse> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(DocError::EmptyQuestion);
        }

        if let Some(id) = request.conversation_id {
            self.database.get_conversation(id)?;
        }

        let scope = CandidateScope::from_ids(request.document_ids.clone());
        let pool = self.retrieval.require_candidates(&scope)?;

        let synthesizer = match &self.synthesizer {
            SynthesizerHandle::Ready(synthesizer) => Arc::clone(synthesizer),
            SynthesizerHandle::Unavailable(reason) => {
                return Err(DocError::SynthesizerUnavailable(reason.clone()))
            }
        };

        let result = self
            .pipeline
            .answer(question, &pool, synthesizer.as_ref())
            .await?;

        let qa = self.database.record_answer(&NewAnswer {
            conversation_id: request.conversation_id,
            question,
            answer: &result.answer,
            chunk_ids: &result.chunk_ids,
            document_ids: &result.document_ids,
        })?;

        Ok(AskResponse {
            answer: qa.answer,
            conversation_id: qa.conversation_id,
            qa_id: qa.id,
            source_chunks: qa.source_chunks.iter().map(SourceChunk::from).collect(),
        })
    }

    pub fn documents(&self) -> Result<Vec<DocumentSummary>> {
        self.database.list_documents()
    }

    pub fn document(&self, id: i64) -> Result<DocumentDetail> {
        let document = self.database.get_document(id)?;
        let chunks = self.database.document_chunks(id)?;
        Ok(DocumentDetail { document, chunks })
    }

    /// Delete a document, its chunks and its stored file
    ///
    /// The database row goes first; a file that cannot be removed afterwards
    /// is logged and left behind.
    pub async fn delete_document(&self, id: i64) -> Result<Document> {
        let document = self.database.delete_document(id)?;
        self.discard(std::path::Path::new(&document.file_path)).await;
        info!(document_id = id, filename = %document.filename, "deleted document");
        Ok(document)
    }

    pub fn conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.database.list_conversations()
    }

    pub fn conversation(&self, id: i64) -> Result<ConversationDetail> {
        let conversation = self.database.get_conversation(id)?;
        let qa_pairs = self
            .database
            .conversation_history(id)?
            .into_iter()
            .map(|qa| QaView {
                id: qa.id,
                question: qa.question,
                answer: qa.answer,
                created_at: qa.created_at,
                source_document_ids: qa.source_document_ids,
                source_chunks: qa.source_chunks.iter().map(SourceChunk::from).collect(),
            })
            .collect();
        Ok(ConversationDetail {
            conversation,
            qa_pairs,
        })
    }
}

/// Connect to Ollama once; failure yields an unavailable handle
pub async fn connect_synthesizer(config: &Config) -> SynthesizerHandle {
    match OllamaSynthesizer::connect(&config.ollama_url(), &config.ollama).await {
        Ok(synthesizer) => SynthesizerHandle::ready(synthesizer),
        Err(SynthesisError::Unavailable(reason)) | Err(SynthesisError::Generation(reason)) => {
            warn!(url = %config.ollama_url(), %reason, "Ollama unavailable; questions will be rejected");
            SynthesizerHandle::Unavailable(reason)
        }
    }
}
