use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateDocumentRequest {
    /// Client-assigned id, so an optimistic local insert and the stored
    /// document agree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub folder_path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Create the document as the next version of this base document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_of: Option<Uuid>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateDocumentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detach_from_version_group: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkDocumentRequest {
    pub linked_id: Uuid,
    pub link_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MoveVersionRequest {
    pub from_version: u32,
    pub to_version: u32,
}
