use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Document, DocumentLink, Relationships, DEFAULT_LINK_TYPE};

/// Document shape used before version groups and typed links existed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyDocument {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub version_group_id: Option<Uuid>,
    #[serde(default)]
    pub version_number: Option<u32>,
    #[serde(default)]
    pub is_current_version: Option<bool>,
    #[serde(default)]
    pub supersedes_id: Option<Uuid>,
    #[serde(default)]
    pub linked_document_ids: Vec<Uuid>,
    #[serde(default)]
    pub folder_path: Vec<String>,
    #[serde(default)]
    pub content_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<LegacyDocument> for Document {
    fn from(legacy: LegacyDocument) -> Self {
        let mut links: Vec<DocumentLink> = Vec::with_capacity(legacy.linked_document_ids.len());
        for target_id in legacy.linked_document_ids {
            if target_id == legacy.id || links.iter().any(|l| l.target_id == target_id) {
                continue;
            }
            links.push(DocumentLink {
                target_id,
                link_type: DEFAULT_LINK_TYPE.to_string(),
            });
        }

        Document {
            id: legacy.id,
            workspace_id: legacy.workspace_id,
            title: legacy.title,
            version_group_id: legacy.version_group_id.unwrap_or(legacy.id),
            version_number: legacy.version_number.filter(|n| *n > 0).unwrap_or(1),
            is_current_version: legacy.is_current_version.unwrap_or(true),
            supersedes_id: legacy.supersedes_id,
            links,
            folder_path: legacy.folder_path,
            content_hash: legacy.content_hash,
            created_at: legacy.created_at,
            updated_at: legacy.updated_at.unwrap_or(legacy.created_at),
        }
    }
}

/// A document as it may arrive from the backend, in either shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentPayload {
    Current(Document),
    Legacy(LegacyDocument),
}

impl DocumentPayload {
    pub fn normalize(self) -> Document {
        match self {
            DocumentPayload::Current(doc) => doc,
            DocumentPayload::Legacy(legacy) => legacy.into(),
        }
    }
}

impl From<DocumentPayload> for Document {
    fn from(payload: DocumentPayload) -> Self {
        payload.normalize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredRelationships {
    pub linked: Vec<DocumentPayload>,
    pub versions: Vec<DocumentPayload>,
    pub incoming: Vec<DocumentPayload>,
    pub outgoing: Vec<DocumentPayload>,
    #[serde(default)]
    pub broken: Vec<Uuid>,
}

/// Flat list of linked documents, as older backends return it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyRelationships {
    pub linked: Vec<DocumentPayload>,
}

/// Relationship fetch result in either wire shape. Normalise before the
/// result touches a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipsPayload {
    Structured(StructuredRelationships),
    Legacy(LegacyRelationships),
}

fn normalize_all(payloads: Vec<DocumentPayload>) -> Vec<Document> {
    payloads.into_iter().map(DocumentPayload::normalize).collect()
}

impl RelationshipsPayload {
    pub fn normalize(self) -> Relationships {
        match self {
            RelationshipsPayload::Structured(s) => Relationships {
                linked: normalize_all(s.linked),
                versions: normalize_all(s.versions),
                incoming: normalize_all(s.incoming),
                outgoing: normalize_all(s.outgoing),
                broken: s.broken,
            },
            // The flat list is the focus document's own link set.
            RelationshipsPayload::Legacy(l) => {
                let outgoing = normalize_all(l.linked);
                Relationships {
                    linked: outgoing.clone(),
                    versions: Vec::new(),
                    incoming: Vec::new(),
                    outgoing,
                    broken: Vec::new(),
                }
            }
        }
    }
}

impl From<RelationshipsPayload> for Relationships {
    fn from(payload: RelationshipsPayload) -> Self {
        payload.normalize()
    }
}
