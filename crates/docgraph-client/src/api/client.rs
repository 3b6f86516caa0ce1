use reqwest::{Client, Method, RequestBuilder, StatusCode};
use docgraph_shared::{
    api::{
        CreateDocumentRequest, DocumentPayload, LinkDocumentRequest, MoveVersionRequest,
        RelationshipsPayload, UpdateDocumentRequest,
    },
    Document, Relationships,
};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthorized,
    #[error("Access forbidden")]
    Forbidden,
    #[error("Resource not found")]
    NotFound,
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Error bodies are `{"error": "..."}`; anything else is passed through as text.
async fn error_message(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(text)
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Build URL for a document endpoint
    fn url(&self, workspace_id: Uuid, path: &str) -> String {
        format!(
            "{}/api/v1/workspaces/{}/documents{}",
            self.base_url, workspace_id, path
        )
    }

    /// Start a request, with the bearer token when one is configured
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        match status {
            StatusCode::OK | StatusCode::CREATED => {
                response.json().await.map_err(ApiError::Network)
            }
            _ => Err(Self::error_for(status, response).await),
        }
    }

    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();

        match status {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(()),
            _ => Err(Self::error_for(status, response).await),
        }
    }

    async fn error_for(status: StatusCode, response: reqwest::Response) -> ApiError {
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden,
            StatusCode::NOT_FOUND => ApiError::NotFound,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::Validation(error_message(response).await)
            }
            StatusCode::CONFLICT => ApiError::Conflict(error_message(response).await),
            _ => ApiError::Server(format!("{}: {}", status, error_message(response).await)),
        }
    }

    // ============ Documents ============

    pub async fn list_documents(&self, workspace_id: Uuid) -> Result<Vec<Document>, ApiError> {
        let response = self
            .request(Method::GET, &self.url(workspace_id, ""))
            .send()
            .await?;
        let payloads: Vec<DocumentPayload> = self.handle_response(response).await?;
        Ok(payloads.into_iter().map(DocumentPayload::normalize).collect())
    }

    pub async fn get_document(&self, workspace_id: Uuid, id: Uuid) -> Result<Document, ApiError> {
        let response = self
            .request(Method::GET, &self.url(workspace_id, &format!("/{}", id)))
            .send()
            .await?;
        let payload: DocumentPayload = self.handle_response(response).await?;
        Ok(payload.normalize())
    }

    pub async fn create_document(
        &self,
        workspace_id: Uuid,
        req: &CreateDocumentRequest,
    ) -> Result<Document, ApiError> {
        let response = self
            .request(Method::POST, &self.url(workspace_id, ""))
            .json(req)
            .send()
            .await?;
        let payload: DocumentPayload = self.handle_response(response).await?;
        Ok(payload.normalize())
    }

    pub async fn update_document(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        req: &UpdateDocumentRequest,
    ) -> Result<Document, ApiError> {
        let response = self
            .request(Method::PATCH, &self.url(workspace_id, &format!("/{}", id)))
            .json(req)
            .send()
            .await?;
        let payload: DocumentPayload = self.handle_response(response).await?;
        Ok(payload.normalize())
    }

    pub async fn delete_document(&self, workspace_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &self.url(workspace_id, &format!("/{}", id)))
            .send()
            .await?;
        self.handle_empty_response(response).await
    }

    // ============ Relationships ============

    /// Accepts both the structured and the legacy `{ linked }` shape.
    pub async fn get_relationships(
        &self,
        workspace_id: Uuid,
        id: Uuid,
    ) -> Result<Relationships, ApiError> {
        let response = self
            .request(
                Method::GET,
                &self.url(workspace_id, &format!("/{}/relationships", id)),
            )
            .send()
            .await?;
        let payload: RelationshipsPayload = self.handle_response(response).await?;
        Ok(payload.normalize())
    }

    pub async fn add_link(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        linked_id: Uuid,
        link_type: &str,
    ) -> Result<Document, ApiError> {
        let req = LinkDocumentRequest {
            linked_id,
            link_type: link_type.to_string(),
        };
        let response = self
            .request(Method::POST, &self.url(workspace_id, &format!("/{}/link", id)))
            .json(&req)
            .send()
            .await?;
        let payload: DocumentPayload = self.handle_response(response).await?;
        Ok(payload.normalize())
    }

    pub async fn remove_link(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        target_id: Uuid,
    ) -> Result<(), ApiError> {
        let response = self
            .request(
                Method::DELETE,
                &self.url(workspace_id, &format!("/{}/link/{}", id, target_id)),
            )
            .send()
            .await?;
        self.handle_empty_response(response).await
    }

    /// Returns the whole version group after the change.
    pub async fn set_current_version(
        &self,
        workspace_id: Uuid,
        id: Uuid,
    ) -> Result<Vec<Document>, ApiError> {
        let response = self
            .request(
                Method::POST,
                &self.url(workspace_id, &format!("/{}/set-current", id)),
            )
            .send()
            .await?;
        let payloads: Vec<DocumentPayload> = self.handle_response(response).await?;
        Ok(payloads.into_iter().map(DocumentPayload::normalize).collect())
    }

    /// `from_version` lets the backend refuse a move made against stale data.
    pub async fn move_version(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        from_version: u32,
        to_version: u32,
    ) -> Result<Vec<Document>, ApiError> {
        let req = MoveVersionRequest {
            from_version,
            to_version,
        };
        let response = self
            .request(
                Method::POST,
                &self.url(workspace_id, &format!("/{}/move-version", id)),
            )
            .json(&req)
            .send()
            .await?;
        let payloads: Vec<DocumentPayload> = self.handle_response(response).await?;
        Ok(payloads.into_iter().map(DocumentPayload::normalize).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_scoped_to_workspace_documents() {
        let client = ApiClient::new("http://localhost:3000/");
        let ws = Uuid::nil();
        assert_eq!(
            client.url(ws, "/abc/link"),
            format!("http://localhost:3000/api/v1/workspaces/{}/documents/abc/link", ws)
        );
    }

    #[test]
    fn empty_token_is_ignored() {
        assert!(!ApiClient::new("http://x").with_token(Some(String::new())).is_authenticated());
        assert!(ApiClient::new("http://x").with_token(Some("t".into())).is_authenticated());
    }
}
