use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Link label used when nothing more specific is known.
pub const DEFAULT_LINK_TYPE: &str = "related";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLink {
    pub target_id: Uuid,
    pub link_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub title: String,
    pub version_group_id: Uuid,
    pub version_number: u32,
    pub is_current_version: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supersedes_id: Option<Uuid>,
    pub links: Vec<DocumentLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub folder_path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// A fresh, ungrouped document: its own singleton version group at v1.
    pub fn new(workspace_id: Uuid, title: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        Self {
            id,
            workspace_id,
            title: title.into(),
            version_group_id: id,
            version_number: 1,
            is_current_version: true,
            supersedes_id: None,
            links: Vec::new(),
            folder_path: Vec::new(),
            content_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }

    pub fn with_folder_path<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.folder_path = segments.into_iter().map(Into::into).collect();
        self
    }

    /// True when the document is alone in a group keyed by its own id.
    pub fn is_ungrouped(&self) -> bool {
        self.version_group_id == self.id
    }

    pub fn link_to(&self, target_id: Uuid) -> Option<&DocumentLink> {
        self.links.iter().find(|l| l.target_id == target_id)
    }

    pub fn links_to(&self, target_id: Uuid) -> bool {
        self.link_to(target_id).is_some()
    }

    /// Folder path rendered as `a/b/c`, `/` for root.
    pub fn folder_display(&self) -> String {
        if self.folder_path.is_empty() {
            "/".to_string()
        } else {
            self.folder_path.join("/")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_is_its_own_current_group() {
        let doc = Document::new(Uuid::new_v4(), "Quarterly report");
        assert_eq!(doc.version_group_id, doc.id);
        assert_eq!(doc.version_number, 1);
        assert!(doc.is_current_version);
        assert!(doc.is_ungrouped());
    }

    #[test]
    fn folder_display_joins_segments() {
        let doc = Document::new(Uuid::new_v4(), "Invoice").with_folder_path(["finance", "2024"]);
        assert_eq!(doc.folder_display(), "finance/2024");

        let root = Document::new(Uuid::new_v4(), "Readme");
        assert_eq!(root.folder_display(), "/");
    }
}
