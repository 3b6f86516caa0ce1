use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Document;

/// A document's neighbourhood, classified at query time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationships {
    /// Outgoing and incoming, deduplicated.
    pub linked: Vec<Document>,
    /// Other members of the version group, ascending by version number.
    pub versions: Vec<Document>,
    pub incoming: Vec<Document>,
    pub outgoing: Vec<Document>,
    /// Outgoing link targets that no longer resolve.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub broken: Vec<Uuid>,
}

impl Relationships {
    pub fn is_empty(&self) -> bool {
        self.linked.is_empty() && self.versions.is_empty() && self.broken.is_empty()
    }

    /// Every document carried by the neighbourhood, each id at most once.
    pub fn documents(&self) -> Vec<&Document> {
        let mut seen = std::collections::HashSet::new();
        self.versions
            .iter()
            .chain(self.outgoing.iter())
            .chain(self.incoming.iter())
            .chain(self.linked.iter())
            .filter(|d| seen.insert(d.id))
            .collect()
    }
}
