//! Optimistic sync: mutations apply locally first, then the backend confirms.
//!
//! A refused or timed-out confirmation runs the mutation's compensation, so
//! the documents it touched go back to what they were when it was staged,
//! and listeners hear a `RolledBack` event. Mutations staged after it stay
//! applied; the version groups involved are repaired around them.

mod backend;

use std::time::Duration;

use docgraph_core::{ChangeEvent, ChangeKind, DocumentGraph, GraphError, Mutation, MutationOutcome};
use docgraph_shared::{Document, Relationships};
use uuid::Uuid;

use crate::api::RemoteCall;

pub use backend::{DocumentBackend, WorkspaceApi};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("Change was rolled back ({kind:?}): {reason}")]
    ConflictOnSync {
        kind: ChangeKind,
        document_ids: Vec<Uuid>,
        reason: String,
    },
    #[error("Could not load from the backend: {0}")]
    Fetch(String),
}

/// A mutation applied locally and waiting for the backend.
#[derive(Debug)]
#[must_use = "a staged mutation stays unconfirmed until passed to `confirm`"]
pub struct PendingSync {
    call: RemoteCall,
    outcome: MutationOutcome,
}

impl PendingSync {
    pub fn event(&self) -> &ChangeEvent {
        &self.outcome.event
    }

    pub fn changed(&self) -> &[Document] {
        &self.outcome.changed
    }

    pub fn call(&self) -> &RemoteCall {
        &self.call
    }
}

pub struct SyncedGraph<B> {
    graph: DocumentGraph,
    backend: B,
    timeout: Duration,
}

impl<B: DocumentBackend> SyncedGraph<B> {
    pub fn new(backend: B, timeout: Duration) -> Self {
        Self::with_graph(DocumentGraph::new(), backend, timeout)
    }

    pub fn with_graph(graph: DocumentGraph, backend: B, timeout: Duration) -> Self {
        Self {
            graph,
            backend,
            timeout,
        }
    }

    pub fn graph(&self) -> &DocumentGraph {
        &self.graph
    }

    /// For subscribing listeners; mutations should go through [`Self::execute`].
    pub fn graph_mut(&mut self) -> &mut DocumentGraph {
        &mut self.graph
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Apply locally and publish. Nothing is sent yet.
    pub fn stage(&mut self, mutation: Mutation) -> Result<PendingSync, SyncError> {
        let call = RemoteCall::for_mutation(&mutation, self.graph.store())?;
        let outcome = self.graph.apply(&mutation)?;
        tracing::debug!(kind = ?outcome.event.kind, subject = %mutation.subject(), "mutation staged");
        Ok(PendingSync { call, outcome })
    }

    /// Send a staged mutation. On refusal or timeout it is compensated.
    pub async fn confirm(&mut self, pending: PendingSync) -> Result<Vec<Document>, SyncError> {
        let PendingSync { call, outcome } = pending;

        let reason = match tokio::time::timeout(self.timeout, self.backend.send(&call)).await {
            Ok(Ok(())) => {
                tracing::debug!(kind = ?outcome.event.kind, "mutation confirmed");
                return Ok(outcome.changed);
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("no response within {}ms", self.timeout.as_millis()),
        };

        let kind = outcome.event.kind;
        let document_ids = outcome.event.document_ids.clone();
        tracing::warn!(?kind, %reason, "backend did not confirm mutation, rolling back");
        self.graph
            .compensate(outcome.compensation, outcome.event.document_ids);

        Err(SyncError::ConflictOnSync {
            kind,
            document_ids,
            reason,
        })
    }

    pub async fn execute(&mut self, mutation: Mutation) -> Result<Vec<Document>, SyncError> {
        let pending = self.stage(mutation)?;
        self.confirm(pending).await
    }

    /// Pull a document's neighbourhood and merge it into the local graph.
    pub async fn refresh(&mut self, id: Uuid) -> Result<Relationships, SyncError> {
        let (document, relationships) =
            match tokio::time::timeout(self.timeout, self.backend.fetch(id)).await {
                Ok(Ok(fetched)) => fetched,
                Ok(Err(e)) => return Err(SyncError::Fetch(e.to_string())),
                Err(_) => {
                    return Err(SyncError::Fetch(format!(
                        "no response within {}ms",
                        self.timeout.as_millis()
                    )))
                }
            };
        self.graph.hydrate(document, relationships);
        Ok(self.graph.relationships_of(id)?)
    }

    /// Pull every document of the backend's workspace.
    pub async fn load_all(&mut self) -> Result<usize, SyncError> {
        let documents = match tokio::time::timeout(self.timeout, self.backend.fetch_all()).await {
            Ok(Ok(documents)) => documents,
            Ok(Err(e)) => return Err(SyncError::Fetch(e.to_string())),
            Err(_) => {
                return Err(SyncError::Fetch(format!(
                    "no response within {}ms",
                    self.timeout.as_millis()
                )))
            }
        };
        let count = documents.len();
        self.graph.load_all(documents);
        tracing::info!(count, "workspace loaded");
        Ok(count)
    }

    // ============ Mutations ============

    pub async fn link_as_new_version(
        &mut self,
        base_id: Uuid,
        document: Document,
    ) -> Result<Vec<Document>, SyncError> {
        self.execute(Mutation::LinkAsNewVersion { base_id, document })
            .await
    }

    pub async fn set_current_version(&mut self, id: Uuid) -> Result<Vec<Document>, SyncError> {
        self.execute(Mutation::SetCurrentVersion { id }).await
    }

    pub async fn unlink_from_version_group(
        &mut self,
        id: Uuid,
    ) -> Result<Vec<Document>, SyncError> {
        self.execute(Mutation::UnlinkFromVersionGroup { id }).await
    }

    pub async fn move_version(
        &mut self,
        id: Uuid,
        target_version_number: u32,
    ) -> Result<Vec<Document>, SyncError> {
        self.execute(Mutation::MoveVersion {
            id,
            target_version_number,
        })
        .await
    }

    pub async fn add_link(
        &mut self,
        from_id: Uuid,
        to_id: Uuid,
        link_type: &str,
    ) -> Result<Vec<Document>, SyncError> {
        self.execute(Mutation::AddLink {
            from_id,
            to_id,
            link_type: link_type.to_string(),
        })
        .await
    }

    pub async fn remove_link(&mut self, from_id: Uuid, to_id: Uuid) -> Result<Vec<Document>, SyncError> {
        self.execute(Mutation::RemoveLink { from_id, to_id }).await
    }

    pub async fn delete_document(&mut self, id: Uuid) -> Result<Vec<Document>, SyncError> {
        self.execute(Mutation::DeleteDocument { id }).await
    }
}
