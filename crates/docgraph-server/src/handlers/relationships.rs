use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use docgraph_core::{mutation, resolver};
use docgraph_shared::{
    api::{LinkDocumentRequest, MoveVersionRequest},
    Document, Relationships, DEFAULT_LINK_TYPE,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::routes::AppState;

fn group_of(store: &docgraph_core::RelationshipStore, doc_id: Uuid) -> Result<Vec<Document>, AppError> {
    let doc = store.get(doc_id)?;
    Ok(resolver::versions_of(store, doc).into_iter().cloned().collect())
}

/// GET /api/v1/workspaces/:id/documents/:doc_id/relationships
pub async fn get_relationships(
    State(state): State<AppState>,
    Path((workspace_id, doc_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Relationships>, AppError> {
    let workspaces = state.workspaces.read().await;
    let store = workspaces.get(&workspace_id).ok_or(AppError::NotFound)?;

    Ok(Json(resolver::relationships_of(store, doc_id)?))
}

/// POST /api/v1/workspaces/:id/documents/:doc_id/link
pub async fn add_link(
    State(state): State<AppState>,
    Path((workspace_id, doc_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<LinkDocumentRequest>,
) -> Result<Json<Document>, AppError> {
    let link_type = match req.link_type.trim() {
        "" => DEFAULT_LINK_TYPE,
        t => t,
    };

    let mut workspaces = state.workspaces.write().await;
    let store = workspaces.get_mut(&workspace_id).ok_or(AppError::NotFound)?;

    // Unlike the client store, the backend holds the whole workspace, so a
    // link to an unknown document is refused here.
    if !store.contains(req.linked_id) {
        return Err(AppError::Validation(
            "Linked document not found in this workspace".to_string(),
        ));
    }

    mutation::add_link(store, doc_id, req.linked_id, link_type)?;
    tracing::info!(%workspace_id, %doc_id, linked_id = %req.linked_id, link_type, "link added");

    Ok(Json(store.get(doc_id)?.clone()))
}

/// DELETE /api/v1/workspaces/:id/documents/:doc_id/link/:target_id
pub async fn remove_link(
    State(state): State<AppState>,
    Path((workspace_id, doc_id, target_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let mut workspaces = state.workspaces.write().await;
    let store = workspaces.get_mut(&workspace_id).ok_or(AppError::NotFound)?;

    mutation::remove_link(store, doc_id, target_id)?;
    tracing::info!(%workspace_id, %doc_id, %target_id, "link removed");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/workspaces/:id/documents/:doc_id/set-current
pub async fn set_current_version(
    State(state): State<AppState>,
    Path((workspace_id, doc_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<Document>>, AppError> {
    let mut workspaces = state.workspaces.write().await;
    let store = workspaces.get_mut(&workspace_id).ok_or(AppError::NotFound)?;

    mutation::set_current_version(store, doc_id)?;
    tracing::info!(%workspace_id, %doc_id, "current version set");

    Ok(Json(group_of(store, doc_id)?))
}

/// POST /api/v1/workspaces/:id/documents/:doc_id/move-version
pub async fn move_version(
    State(state): State<AppState>,
    Path((workspace_id, doc_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<MoveVersionRequest>,
) -> Result<Json<Vec<Document>>, AppError> {
    let mut workspaces = state.workspaces.write().await;
    let store = workspaces.get_mut(&workspace_id).ok_or(AppError::NotFound)?;

    // The client computed the swap from its own view of the group.
    let current_number = store.get(doc_id)?.version_number;
    if current_number != req.from_version {
        return Err(AppError::Conflict(format!(
            "Document is at version {}, not {}",
            current_number, req.from_version
        )));
    }

    mutation::move_version(store, doc_id, req.to_version)?;
    tracing::info!(
        %workspace_id,
        %doc_id,
        from = req.from_version,
        to = req.to_version,
        "version moved"
    );

    Ok(Json(group_of(store, doc_id)?))
}
