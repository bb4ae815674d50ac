//! Service integration tests
//!
//! Drives upload -> ask -> history through the document service with an
//! in-memory database and a scripted language model. No Ollama required.

use async_trait::async_trait;
use docbuddy::{
    cli::Config,
    extract::FileType,
    rag::NO_CONTENT_ANSWER,
    service::{AskRequest, DocumentAnalyzer},
    store::{Database, FileStore, NewDocument},
    synthesis::{SynthesisError, SynthesisRequest, Synthesizer, SynthesizerHandle},
    DocError,
};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Returns a fixed reply and remembers every prompt it saw
struct Scripted {
    reply: Result<String, SynthesisError>,
    seen: Arc<Mutex<Vec<SynthesisRequest>>>,
}

#[async_trait]
impl Synthesizer for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, SynthesisError> {
        self.seen.lock().unwrap().push(request.clone());
        self.reply.clone()
    }
}

struct Harness {
    analyzer: DocumentAnalyzer,
    seen: Arc<Mutex<Vec<SynthesisRequest>>>,
    dir: TempDir,
}

fn harness(reply: Result<String, SynthesisError>) -> Harness {
    let dir = TempDir::new().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let synthesizer = SynthesizerHandle::ready(Scripted {
        reply,
        seen: Arc::clone(&seen),
    });
    let analyzer = DocumentAnalyzer::new(
        Arc::new(Database::open_in_memory().unwrap()),
        FileStore::new(dir.path().join("documents")),
        &Config::default(),
        synthesizer,
    )
    .unwrap();
    Harness { analyzer, seen, dir }
}

fn email(subject: &str, body: &str) -> Vec<u8> {
    format!(
        "From: Alice Kim <alice@example.com>\r\n\
         To: team@example.com\r\n\
         Subject: {}\r\n\
         Date: Mon, 3 Mar 2025 09:15:00 +0000\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         {}\r\n",
        subject, body
    )
    .into_bytes()
}

fn stored_files(dir: &TempDir) -> usize {
    fn walk(path: &std::path::Path) -> usize {
        match std::fs::read_dir(path) {
            Ok(entries) => entries
                .flatten()
                .map(|e| {
                    let p = e.path();
                    if p.is_dir() {
                        walk(&p)
                    } else {
                        1
                    }
                })
                .sum(),
            Err(_) => 0,
        }
    }
    walk(&dir.path().join("documents"))
}

#[tokio::test]
async fn test_upload_then_ask_records_provenance() {
    let h = harness(Ok("Revenue grew 12%.".to_string()));

    let budget = h
        .analyzer
        .upload("budget.eml", email("Budget", "Revenue grew 12% in the first quarter."))
        .await
        .unwrap();
    assert!(budget.created);
    assert!(!budget.parse_failed);
    assert_eq!(budget.chunk_count, 1);

    let response = h
        .analyzer
        .ask(AskRequest::new("How much did revenue grow?"))
        .await
        .unwrap();

    assert_eq!(response.answer, "Revenue grew 12%.");
    assert_eq!(response.source_chunks.len(), 1);
    assert_eq!(response.source_chunks[0].document_name, "budget.eml");

    let prompts = h.seen.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].user.contains("How much did revenue grow?"));
    assert!(prompts[0].user.contains("Revenue grew 12% in the first quarter."));
    assert!(prompts[0].user.contains("[From budget.eml, Chunk 1]"));
    drop(prompts);

    let conversation = h.analyzer.conversation(response.conversation_id).unwrap();
    assert_eq!(conversation.qa_pairs.len(), 1);
    assert_eq!(conversation.qa_pairs[0].source_document_ids, vec![budget.document.id]);
}

#[tokio::test]
async fn test_duplicate_filename_returns_existing_document() {
    let h = harness(Ok("ok".to_string()));

    let first = h
        .analyzer
        .upload("memo.eml", email("Memo", "Office closes at noon on Friday."))
        .await
        .unwrap();
    let second = h
        .analyzer
        .upload("memo.eml", email("Other", "Completely different bytes."))
        .await
        .unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(second.document.id, first.document.id);
    assert_eq!(second.document.parsed_content, first.document.parsed_content);
    assert_eq!(h.analyzer.documents().unwrap().len(), 1);
    assert_eq!(stored_files(&h.dir), 1);
}

#[tokio::test]
async fn test_ask_without_documents_has_no_side_effects() {
    let h = harness(Ok("should not be called".to_string()));

    let err = h.analyzer.ask(AskRequest::new("Anything?")).await.unwrap_err();
    assert!(matches!(err, DocError::NoChunksAvailable));
    assert!(h.analyzer.conversations().unwrap().is_empty());
    assert!(h.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_generation_failure_is_persisted_as_answer() {
    let failure = "Error: Model 'llama3.2' not found. Please pull the model first: ollama pull llama3.2";
    let h = harness(Err(SynthesisError::Generation(failure.to_string())));

    h.analyzer
        .upload("notes.eml", email("Notes", "The launch date is April 4."))
        .await
        .unwrap();

    let response = h
        .analyzer
        .ask(AskRequest::new("When is the launch date?"))
        .await
        .unwrap();

    assert_eq!(response.answer, failure);
    assert_eq!(response.source_chunks.len(), 1);

    let history = h.analyzer.conversation(response.conversation_id).unwrap();
    assert_eq!(history.qa_pairs[0].answer, failure);
    assert_eq!(history.qa_pairs[0].source_chunks.len(), 1);
}

#[tokio::test]
async fn test_unavailable_synthesizer_rejects_before_writing() {
    let dir = TempDir::new().unwrap();
    let analyzer = DocumentAnalyzer::new(
        Arc::new(Database::open_in_memory().unwrap()),
        FileStore::new(dir.path().join("documents")),
        &Config::default(),
        SynthesizerHandle::Unavailable("connection refused".to_string()),
    )
    .unwrap();

    analyzer
        .upload("a.eml", email("A", "Some content here."))
        .await
        .unwrap();

    let err = analyzer.ask(AskRequest::new("What content?")).await.unwrap_err();
    assert!(matches!(err, DocError::SynthesizerUnavailable(ref r) if r == "connection refused"));
    assert!(analyzer.conversations().unwrap().is_empty());
}

#[tokio::test]
async fn test_conversation_continuation_and_history_order() {
    let h = harness(Ok("answer".to_string()));
    h.analyzer
        .upload("plan.eml", email("Plan", "Phase one ends in June. Phase two starts in July."))
        .await
        .unwrap();

    let first = h.analyzer.ask(AskRequest::new("When does phase one end?")).await.unwrap();
    let second = h
        .analyzer
        .ask(AskRequest {
            question: "When does phase two start?".to_string(),
            conversation_id: Some(first.conversation_id),
            document_ids: vec![],
        })
        .await
        .unwrap();

    assert_eq!(second.conversation_id, first.conversation_id);
    assert_eq!(h.analyzer.conversations().unwrap().len(), 1);

    let history = h.analyzer.conversation(first.conversation_id).unwrap();
    let questions: Vec<&str> = history.qa_pairs.iter().map(|qa| qa.question.as_str()).collect();
    assert_eq!(
        questions,
        vec!["When does phase two start?", "When does phase one end?"]
    );

    let missing = h
        .analyzer
        .ask(AskRequest {
            question: "Anything else?".to_string(),
            conversation_id: Some(first.conversation_id + 100),
            document_ids: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(missing, DocError::NotFound { entity: "Conversation", .. }));
}

#[tokio::test]
async fn test_document_scope_limits_candidates() {
    let h = harness(Ok("scoped".to_string()));
    let hr = h
        .analyzer
        .upload("hr.eml", email("HR", "Vacation policy allows 25 days."))
        .await
        .unwrap();
    h.analyzer
        .upload("it.eml", email("IT", "Vacation requests go through the portal."))
        .await
        .unwrap();

    let response = h
        .analyzer
        .ask(AskRequest {
            question: "vacation".to_string(),
            conversation_id: None,
            document_ids: vec![hr.document.id],
        })
        .await
        .unwrap();

    assert!(response
        .source_chunks
        .iter()
        .all(|c| c.document_name == "hr.eml"));

    let nowhere = h
        .analyzer
        .ask(AskRequest {
            question: "vacation".to_string(),
            conversation_id: None,
            document_ids: vec![hr.document.id + 1000],
        })
        .await
        .unwrap_err();
    assert!(matches!(nowhere, DocError::NoChunksAvailable));
}

#[tokio::test]
async fn test_delete_cascades_and_keeps_history() {
    let h = harness(Ok("kept".to_string()));
    let doc = h
        .analyzer
        .upload("old.eml", email("Old", "Legacy system retires in 2026."))
        .await
        .unwrap();
    let response = h.analyzer.ask(AskRequest::new("When does the legacy system retire?")).await.unwrap();
    assert_eq!(stored_files(&h.dir), 1);

    let deleted = h.analyzer.delete_document(doc.document.id).await.unwrap();
    assert_eq!(deleted.filename, "old.eml");
    assert_eq!(stored_files(&h.dir), 0);
    assert!(h.analyzer.documents().unwrap().is_empty());
    assert!(matches!(
        h.analyzer.document(doc.document.id),
        Err(DocError::NotFound { entity: "Document", .. })
    ));

    let history = h.analyzer.conversation(response.conversation_id).unwrap();
    assert_eq!(history.qa_pairs.len(), 1);
    assert_eq!(history.qa_pairs[0].answer, "kept");
    assert!(history.qa_pairs[0].source_chunks.is_empty());

    assert!(matches!(
        h.analyzer.delete_document(doc.document.id).await,
        Err(DocError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_unrelated_question_falls_back_to_leading_chunks() {
    let h = harness(Ok("fallback".to_string()));
    h.analyzer
        .upload("menu.eml", email("Menu", "Soup of the day is tomato."))
        .await
        .unwrap();

    let response = h.analyzer.ask(AskRequest::new("xyz qqq")).await.unwrap();
    assert_eq!(response.answer, "fallback");
    assert_eq!(response.source_chunks.len(), 1);
    assert_ne!(response.answer, NO_CONTENT_ANSWER);
}

/// Deletes a document while the answer is being generated
struct DeletingSynthesizer {
    database: Arc<Database>,
    target: Mutex<Option<i64>>,
}

#[async_trait]
impl Synthesizer for DeletingSynthesizer {
    fn name(&self) -> &str {
        "deleting"
    }

    async fn synthesize(&self, _request: &SynthesisRequest) -> Result<String, SynthesisError> {
        if let Some(id) = self.target.lock().unwrap().take() {
            self.database.delete_document(id).unwrap();
        }
        Ok("Budget approved in March.".to_string())
    }
}

#[tokio::test]
async fn test_document_deleted_during_ask_keeps_answer() {
    let dir = TempDir::new().unwrap();
    let database = Arc::new(Database::open_in_memory().unwrap());
    let synthesizer = Arc::new(DeletingSynthesizer {
        database: Arc::clone(&database),
        target: Mutex::new(None),
    });
    let analyzer = DocumentAnalyzer::new(
        Arc::clone(&database),
        FileStore::new(dir.path().join("documents")),
        &Config::default(),
        SynthesizerHandle::Ready(synthesizer.clone()),
    )
    .unwrap();

    let budget = analyzer
        .upload("budget.eml", email("Budget", "The budget was approved in March."))
        .await
        .unwrap();
    let memo = analyzer
        .upload("memo.eml", email("Memo", "The budget memo lists every line item."))
        .await
        .unwrap();
    *synthesizer.target.lock().unwrap() = Some(budget.document.id);

    let response = analyzer.ask(AskRequest::new("budget")).await.unwrap();

    assert_eq!(response.answer, "Budget approved in March.");
    assert!(response
        .source_chunks
        .iter()
        .all(|c| c.document_name == "memo.eml"));

    let conversations = analyzer.conversations().unwrap();
    assert_eq!(conversations.len(), 1);
    let history = analyzer.conversation(response.conversation_id).unwrap();
    assert_eq!(history.qa_pairs[0].answer, "Budget approved in March.");
    assert_eq!(history.qa_pairs[0].source_document_ids, vec![memo.document.id]);
}

#[tokio::test]
async fn test_delete_succeeds_when_stored_file_cannot_be_removed() {
    let h = harness(Ok("unused".to_string()));
    // a directory where the file should be makes remove_file fail
    let blocker = h.dir.path().join("not-a-file");
    std::fs::create_dir_all(&blocker).unwrap();

    let inserted = h
        .analyzer
        .database()
        .insert_document_with_chunks(
            &NewDocument {
                filename: "stuck.pdf".to_string(),
                file_type: FileType::Pdf,
                file_path: blocker.to_string_lossy().into_owned(),
                parsed_content: "stuck".to_string(),
                file_size: 5,
            },
            &[],
        )
        .unwrap();

    let deleted = h
        .analyzer
        .delete_document(inserted.document.id)
        .await
        .unwrap();
    assert_eq!(deleted.filename, "stuck.pdf");
    assert!(h.analyzer.documents().unwrap().is_empty());
    assert!(blocker.is_dir());
}
