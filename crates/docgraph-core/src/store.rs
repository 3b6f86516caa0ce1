use std::collections::{HashMap, HashSet};

use docgraph_shared::{Document, Relationships};
use uuid::Uuid;

use crate::error::{GraphError, Result};

/// In-memory set of documents for one workspace session.
///
/// Besides the documents themselves the store keeps two indexes so that
/// adjacency questions do not need a full scan: version group id to member
/// ids, and link target id to the ids of the documents linking to it.
/// Upserts do not check cross-document invariants; that is the job of
/// [`crate::mutation`].
#[derive(Debug, Clone, Default)]
pub struct RelationshipStore {
    documents: HashMap<Uuid, Document>,
    groups: HashMap<Uuid, HashSet<Uuid>>,
    backlinks: HashMap<Uuid, HashSet<Uuid>>,
}

impl RelationshipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(docs: impl IntoIterator<Item = Document>) -> Self {
        let mut store = Self::new();
        for doc in docs {
            store.upsert(doc);
        }
        store
    }

    pub fn get(&self, id: Uuid) -> Result<&Document> {
        self.documents.get(&id).ok_or(GraphError::NotFound(id))
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.documents.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Snapshot of every document, in no particular order.
    pub fn all(&self) -> Vec<Document> {
        self.documents.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Insert or replace by id. Returns the replaced document, if any.
    pub fn upsert(&mut self, doc: Document) -> Option<Document> {
        let previous = self.documents.remove(&doc.id);
        if let Some(ref old) = previous {
            self.unindex(old);
        }
        self.index(&doc);
        self.documents.insert(doc.id, doc);
        previous
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        self.take(id).is_some()
    }

    /// Like [`remove`](Self::remove) but hands the removed document back.
    pub fn take(&mut self, id: Uuid) -> Option<Document> {
        let doc = self.documents.remove(&id)?;
        self.unindex(&doc);
        Some(doc)
    }

    /// Members of a version group, unordered.
    pub fn group_members(&self, group_id: Uuid) -> Vec<&Document> {
        self.groups
            .get(&group_id)
            .map(|ids| ids.iter().filter_map(|id| self.documents.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn group_size(&self, group_id: Uuid) -> usize {
        self.groups.get(&group_id).map_or(0, HashSet::len)
    }

    /// Documents whose link set references `id`.
    pub fn linking_to(&self, id: Uuid) -> Vec<&Document> {
        self.backlinks
            .get(&id)
            .map(|ids| ids.iter().filter_map(|src| self.documents.get(src)).collect())
            .unwrap_or_default()
    }

    pub fn with_content_hash<'a, 'h>(&'a self, hash: &'h str) -> impl Iterator<Item = &'a Document> + 'h
    where
        'a: 'h,
    {
        self.documents
            .values()
            .filter(move |d| d.content_hash.as_deref() == Some(hash))
    }

    /// Load a fetched neighbourhood. Returns the ids that were written.
    pub fn hydrate(&mut self, focus: Document, relationships: Relationships) -> Vec<Uuid> {
        let mut written = vec![focus.id];
        self.upsert(focus);

        let Relationships {
            linked,
            versions,
            incoming,
            outgoing,
            ..
        } = relationships;

        for doc in versions.into_iter().chain(outgoing).chain(incoming).chain(linked) {
            if written.contains(&doc.id) {
                continue;
            }
            written.push(doc.id);
            self.upsert(doc);
        }

        tracing::debug!(count = written.len(), "hydrated document neighbourhood");
        written
    }

    fn index(&mut self, doc: &Document) {
        self.groups
            .entry(doc.version_group_id)
            .or_default()
            .insert(doc.id);
        for link in &doc.links {
            self.backlinks
                .entry(link.target_id)
                .or_default()
                .insert(doc.id);
        }
    }

    fn unindex(&mut self, doc: &Document) {
        if let Some(members) = self.groups.get_mut(&doc.version_group_id) {
            members.remove(&doc.id);
            if members.is_empty() {
                self.groups.remove(&doc.version_group_id);
            }
        }
        for link in &doc.links {
            if let Some(sources) = self.backlinks.get_mut(&link.target_id) {
                sources.remove(&doc.id);
                if sources.is_empty() {
                    self.backlinks.remove(&link.target_id);
                }
            }
        }
    }
}
