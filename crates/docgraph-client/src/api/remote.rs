use docgraph_core::{GraphError, Mutation, RelationshipStore};
use docgraph_shared::{
    api::{CreateDocumentRequest, UpdateDocumentRequest},
    Document,
};
use uuid::Uuid;

use super::{ApiClient, ApiError};

/// The backend request that persists one relationship mutation.
///
/// Built from the store as it was *before* the mutation ran, because some
/// endpoints want the prior state (a move names the version it moves from).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    CreateVersion { base_id: Uuid, document: Document },
    SetCurrent { id: Uuid },
    Detach { id: Uuid },
    MoveVersion { id: Uuid, from_version: u32, to_version: u32 },
    AddLink { from_id: Uuid, to_id: Uuid, link_type: String },
    RemoveLink { from_id: Uuid, to_id: Uuid },
    Delete { id: Uuid },
}

impl RemoteCall {
    pub fn for_mutation(mutation: &Mutation, store: &RelationshipStore) -> Result<Self, GraphError> {
        Ok(match mutation {
            Mutation::LinkAsNewVersion { base_id, document } => RemoteCall::CreateVersion {
                base_id: *base_id,
                document: document.clone(),
            },
            Mutation::SetCurrentVersion { id } => RemoteCall::SetCurrent { id: *id },
            Mutation::UnlinkFromVersionGroup { id } => RemoteCall::Detach { id: *id },
            Mutation::MoveVersion {
                id,
                target_version_number,
            } => RemoteCall::MoveVersion {
                id: *id,
                from_version: store.get(*id)?.version_number,
                to_version: *target_version_number,
            },
            Mutation::AddLink {
                from_id,
                to_id,
                link_type,
            } => RemoteCall::AddLink {
                from_id: *from_id,
                to_id: *to_id,
                link_type: link_type.clone(),
            },
            Mutation::RemoveLink { from_id, to_id } => RemoteCall::RemoveLink {
                from_id: *from_id,
                to_id: *to_id,
            },
            Mutation::DeleteDocument { id } => RemoteCall::Delete { id: *id },
        })
    }

    pub async fn send(&self, api: &ApiClient, workspace_id: Uuid) -> Result<(), ApiError> {
        match self {
            RemoteCall::CreateVersion { base_id, document } => {
                let req = CreateDocumentRequest {
                    id: Some(document.id),
                    title: document.title.clone(),
                    folder_path: document.folder_path.clone(),
                    content_hash: document.content_hash.clone(),
                    version_of: Some(*base_id),
                };
                api.create_document(workspace_id, &req).await?;
            }
            RemoteCall::SetCurrent { id } => {
                api.set_current_version(workspace_id, *id).await?;
            }
            RemoteCall::Detach { id } => {
                let req = UpdateDocumentRequest {
                    detach_from_version_group: Some(true),
                    ..Default::default()
                };
                api.update_document(workspace_id, *id, &req).await?;
            }
            RemoteCall::MoveVersion {
                id,
                from_version,
                to_version,
            } => {
                api.move_version(workspace_id, *id, *from_version, *to_version)
                    .await?;
            }
            RemoteCall::AddLink {
                from_id,
                to_id,
                link_type,
            } => {
                api.add_link(workspace_id, *from_id, *to_id, link_type).await?;
            }
            RemoteCall::RemoveLink { from_id, to_id } => {
                api.remove_link(workspace_id, *from_id, *to_id).await?;
            }
            RemoteCall::Delete { id } => {
                api.delete_document(workspace_id, *id).await?;
            }
        }
        Ok(())
    }
}
