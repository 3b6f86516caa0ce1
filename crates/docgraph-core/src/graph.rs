use docgraph_shared::{Document, Relationships};
use uuid::Uuid;

use crate::error::Result;
use crate::mutation::{self, Compensation, Mutation, MutationOutcome};
use crate::notifier::{ChangeEvent, ChangeKind, ChangeNotifier, ListenerId};
use crate::resolver::{self, CurrentVersion};
use crate::store::RelationshipStore;

/// A store plus the notifier that announces its changes.
///
/// Every mutation goes through here, so every successful one is published.
#[derive(Debug, Default)]
pub struct DocumentGraph {
    store: RelationshipStore,
    notifier: ChangeNotifier,
}

impl DocumentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_store(store: RelationshipStore) -> Self {
        Self {
            store,
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn store(&self) -> &RelationshipStore {
        &self.store
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ChangeEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.notifier.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    // ============ Queries ============

    pub fn get(&self, id: Uuid) -> Result<&Document> {
        self.store.get(id)
    }

    pub fn versions_of(&self, id: Uuid) -> Result<Vec<&Document>> {
        let doc = self.store.get(id)?;
        Ok(resolver::versions_of(&self.store, doc))
    }

    pub fn current_of(&self, group_id: Uuid) -> Option<CurrentVersion<'_>> {
        resolver::current_of(&self.store, group_id)
    }

    pub fn relationships_of(&self, id: Uuid) -> Result<Relationships> {
        resolver::relationships_of(&self.store, id)
    }

    pub fn duplicates_of(&self, id: Uuid) -> Result<Vec<&Document>> {
        let doc = self.store.get(id)?;
        Ok(resolver::duplicates_of(&self.store, doc))
    }

    pub fn version_candidates(&self, id: Uuid) -> Result<Vec<&Document>> {
        let doc = self.store.get(id)?;
        Ok(resolver::version_candidates(&self.store, doc))
    }

    // ============ Mutations ============

    pub fn apply(&mut self, mutation: &Mutation) -> Result<MutationOutcome> {
        let outcome = mutation::apply(&mut self.store, mutation)?;
        self.notifier.notify(&outcome.event);
        Ok(outcome)
    }

    pub fn link_as_new_version(&mut self, base_id: Uuid, document: Document) -> Result<MutationOutcome> {
        self.apply(&Mutation::LinkAsNewVersion { base_id, document })
    }

    pub fn set_current_version(&mut self, id: Uuid) -> Result<MutationOutcome> {
        self.apply(&Mutation::SetCurrentVersion { id })
    }

    pub fn unlink_from_version_group(&mut self, id: Uuid) -> Result<MutationOutcome> {
        self.apply(&Mutation::UnlinkFromVersionGroup { id })
    }

    pub fn move_version(&mut self, id: Uuid, target_version_number: u32) -> Result<MutationOutcome> {
        self.apply(&Mutation::MoveVersion {
            id,
            target_version_number,
        })
    }

    pub fn add_link(&mut self, from_id: Uuid, to_id: Uuid, link_type: &str) -> Result<MutationOutcome> {
        self.apply(&Mutation::AddLink {
            from_id,
            to_id,
            link_type: link_type.to_string(),
        })
    }

    pub fn remove_link(&mut self, from_id: Uuid, to_id: Uuid) -> Result<MutationOutcome> {
        self.apply(&Mutation::RemoveLink { from_id, to_id })
    }

    pub fn delete_document(&mut self, id: Uuid) -> Result<MutationOutcome> {
        self.apply(&Mutation::DeleteDocument { id })
    }

    /// Undo a previously applied mutation and announce the rollback.
    ///
    /// The event lists `document_ids` plus any document the group repair
    /// rewrote.
    pub fn compensate(&mut self, compensation: Compensation, mut document_ids: Vec<Uuid>) {
        for id in compensation.apply(&mut self.store) {
            if !document_ids.contains(&id) {
                document_ids.push(id);
            }
        }
        self.notifier
            .notify(&ChangeEvent::new(ChangeKind::RolledBack, document_ids));
    }

    /// Insert a document without relationship checks, e.g. a fresh upload.
    pub fn insert(&mut self, document: Document) -> Option<Document> {
        self.store.upsert(document)
    }

    /// Load a fetched neighbourhood and announce it.
    pub fn hydrate(&mut self, focus: Document, relationships: Relationships) {
        let written = self.store.hydrate(focus, relationships);
        self.notifier
            .notify(&ChangeEvent::new(ChangeKind::Hydrated, written));
    }

    /// Load a full listing, e.g. a whole workspace, and announce it once.
    pub fn load_all(&mut self, documents: Vec<Document>) {
        let written: Vec<Uuid> = documents.iter().map(|d| d.id).collect();
        for doc in documents {
            self.store.upsert(doc);
        }
        self.notifier
            .notify(&ChangeEvent::new(ChangeKind::Hydrated, written));
    }
}
