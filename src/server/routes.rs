//! API route handlers

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::errors::DocError;
use crate::service::{AskRequest, AskResponse, ConversationDetail, DocumentDetail};

/// Multipart field carrying the upload
const FILE_FIELD: &str = "file";

fn path_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|rejection| ApiError(DocError::InvalidRequest(rejection.body_text())))
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let synthesizer = state.analyzer.synthesizer();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "synthesizer_ready": synthesizer.is_ready(),
        "synthesizer": synthesizer.status(),
        "uptime_secs": state.started.elapsed().as_secs(),
    }))
}

/// POST /api/upload
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;

        let outcome = state.analyzer.upload(&filename, bytes.to_vec()).await?;
        let message = if !outcome.created {
            "File already exists"
        } else if outcome.parse_failed {
            "File uploaded but could not be parsed"
        } else {
            "File uploaded and parsed successfully"
        };

        return Ok(Json(json!({
            "success": true,
            "message": message,
            "created": outcome.created,
            "document_id": outcome.document.id,
            "filename": outcome.document.filename,
            "file_type": outcome.document.file_type,
            "chunk_count": outcome.chunk_count,
        })));
    }

    Err(DocError::MissingFile.into())
}

/// POST /api/ask
pub async fn ask(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> ApiResult<Json<AskResponse>> {
    let Json(request) = payload?;
    let response = state.analyzer.ask(request).await?;
    Ok(Json(response))
}

/// GET /api/documents
pub async fn list_documents(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let documents = state.analyzer.documents()?;
    Ok(Json(json!({ "documents": documents })))
}

/// GET /api/documents/{id}
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<DocumentDetail>> {
    let id = path_id(path)?;
    Ok(Json(state.analyzer.document(id)?))
}

/// DELETE /api/documents/{id}
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let id = path_id(path)?;
    let document = state.analyzer.delete_document(id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Document deleted",
        "document_id": document.id,
        "filename": document.filename,
    })))
}

/// GET /api/conversations
pub async fn list_conversations(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let conversations = state.analyzer.conversations()?;
    Ok(Json(json!({ "conversations": conversations })))
}

/// GET /api/conversations/{id}
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ConversationDetail>> {
    let id = path_id(path)?;
    Ok(Json(state.analyzer.conversation(id)?))
}
