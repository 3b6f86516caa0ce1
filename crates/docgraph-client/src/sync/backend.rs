use std::future::Future;

use docgraph_shared::{Document, Relationships};
use uuid::Uuid;

use crate::api::{ApiClient, ApiError, RemoteCall};

/// Where confirmed relationship changes are persisted and fresh state is read.
pub trait DocumentBackend {
    fn send(&self, call: &RemoteCall) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// A document plus its resolved neighbourhood.
    fn fetch(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<(Document, Relationships), ApiError>> + Send;

    fn fetch_all(&self) -> impl Future<Output = Result<Vec<Document>, ApiError>> + Send;
}

/// The HTTP backend, bound to one workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceApi {
    api: ApiClient,
    workspace_id: Uuid,
}

impl WorkspaceApi {
    pub fn new(api: ApiClient, workspace_id: Uuid) -> Self {
        Self { api, workspace_id }
    }

    pub fn workspace_id(&self) -> Uuid {
        self.workspace_id
    }
}

impl DocumentBackend for WorkspaceApi {
    async fn send(&self, call: &RemoteCall) -> Result<(), ApiError> {
        call.send(&self.api, self.workspace_id).await
    }

    async fn fetch(&self, id: Uuid) -> Result<(Document, Relationships), ApiError> {
        let document = self.api.get_document(self.workspace_id, id).await?;
        let relationships = self.api.get_relationships(self.workspace_id, id).await?;
        Ok((document, relationships))
    }

    async fn fetch_all(&self) -> Result<Vec<Document>, ApiError> {
        self.api.list_documents(self.workspace_id).await
    }
}
