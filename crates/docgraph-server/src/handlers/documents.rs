use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use docgraph_core::mutation;
use docgraph_shared::{
    api::{CreateDocumentRequest, UpdateDocumentRequest},
    Document,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::routes::AppState;

/// Trim segments and drop empty ones so `["", "a ", "b"]` becomes `a/b`.
fn clean_folder_path(segments: Vec<String>) -> Vec<String> {
    segments
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// GET /api/v1/workspaces/:id/documents
pub async fn list_documents(
    State(state): State<AppState>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<Vec<Document>>, AppError> {
    let workspaces = state.workspaces.read().await;

    let mut documents: Vec<Document> = workspaces
        .get(&workspace_id)
        .map(|store| store.all())
        .unwrap_or_default();
    documents.sort_by(|a, b| {
        a.folder_path
            .cmp(&b.folder_path)
            .then(a.title.cmp(&b.title))
            .then(a.version_number.cmp(&b.version_number))
    });

    Ok(Json(documents))
}

/// POST /api/v1/workspaces/:id/documents
pub async fn create_document(
    State(state): State<AppState>,
    Path(workspace_id): Path<Uuid>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<Document>), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("Document title is required".to_string()));
    }

    let mut doc = Document::new(workspace_id, req.title.trim());
    if let Some(id) = req.id {
        doc.id = id;
        doc.version_group_id = id;
    }
    doc.folder_path = clean_folder_path(req.folder_path);
    doc.content_hash = req.content_hash;

    let mut workspaces = state.workspaces.write().await;
    let store = workspaces.entry(workspace_id).or_default();

    if store.contains(doc.id) {
        return Err(AppError::Conflict(
            "A document with this id already exists".to_string(),
        ));
    }

    let id = doc.id;
    match req.version_of {
        Some(base_id) => {
            mutation::link_as_new_version(store, base_id, doc)?;
            tracing::info!(%workspace_id, %id, %base_id, "document created as new version");
        }
        None => {
            store.upsert(doc);
            tracing::info!(%workspace_id, %id, "document created");
        }
    }

    let created = store.get(id)?.clone();
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/workspaces/:id/documents/:doc_id
pub async fn get_document(
    State(state): State<AppState>,
    Path((workspace_id, doc_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Document>, AppError> {
    let workspaces = state.workspaces.read().await;
    let store = workspaces.get(&workspace_id).ok_or(AppError::NotFound)?;

    Ok(Json(store.get(doc_id)?.clone()))
}

/// PATCH /api/v1/workspaces/:id/documents/:doc_id
pub async fn update_document(
    State(state): State<AppState>,
    Path((workspace_id, doc_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateDocumentRequest>,
) -> Result<Json<Document>, AppError> {
    if let Some(ref title) = req.title {
        if title.trim().is_empty() {
            return Err(AppError::Validation("Document title is required".to_string()));
        }
    }

    let mut workspaces = state.workspaces.write().await;
    let store = workspaces.get_mut(&workspace_id).ok_or(AppError::NotFound)?;

    // Plain attributes first; version fields only move through the mutation API.
    let mut doc = store.get(doc_id)?.clone();
    let before = doc.clone();
    if let Some(title) = req.title {
        doc.title = title.trim().to_string();
    }
    if let Some(folder_path) = req.folder_path {
        doc.folder_path = clean_folder_path(folder_path);
    }
    if let Some(content_hash) = req.content_hash {
        doc.content_hash = Some(content_hash);
    }
    if doc != before {
        doc.updated_at = Utc::now();
        store.upsert(doc);
    }

    if req.detach_from_version_group == Some(true) {
        mutation::unlink_from_version_group(store, doc_id)?;
        tracing::info!(%workspace_id, %doc_id, "document detached from version group");
    }

    Ok(Json(store.get(doc_id)?.clone()))
}

/// DELETE /api/v1/workspaces/:id/documents/:doc_id
pub async fn delete_document(
    State(state): State<AppState>,
    Path((workspace_id, doc_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let mut workspaces = state.workspaces.write().await;
    let store = workspaces.get_mut(&workspace_id).ok_or(AppError::NotFound)?;

    mutation::delete_document(store, doc_id)?;
    tracing::info!(%workspace_id, %doc_id, "document deleted");

    Ok(StatusCode::NO_CONTENT)
}
