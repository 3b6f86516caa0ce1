//! The only code allowed to change relationship fields.
//!
//! Every operation runs inside a [`Transaction`] that journals the prior
//! state of each document it touches. A failed operation is rolled back
//! before the error is returned, so callers never observe a half-applied
//! mutation. A successful one hands back a [`Compensation`] that undoes it,
//! which is what optimistic sync uses when the backend refuses a change.

use std::collections::HashMap;

use chrono::Utc;
use docgraph_shared::{Document, DocumentLink};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GraphError, Result};
use crate::notifier::{ChangeEvent, ChangeKind};
use crate::resolver;
use crate::store::RelationshipStore;

/// A relationship change, as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    LinkAsNewVersion { base_id: Uuid, document: Document },
    SetCurrentVersion { id: Uuid },
    UnlinkFromVersionGroup { id: Uuid },
    MoveVersion { id: Uuid, target_version_number: u32 },
    AddLink { from_id: Uuid, to_id: Uuid, link_type: String },
    RemoveLink { from_id: Uuid, to_id: Uuid },
    DeleteDocument { id: Uuid },
}

impl Mutation {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Mutation::LinkAsNewVersion { .. } => ChangeKind::LinkedAsNewVersion,
            Mutation::SetCurrentVersion { .. } => ChangeKind::CurrentVersionSet,
            Mutation::UnlinkFromVersionGroup { .. } => ChangeKind::UnlinkedFromGroup,
            Mutation::MoveVersion { .. } => ChangeKind::VersionMoved,
            Mutation::AddLink { .. } => ChangeKind::LinkAdded,
            Mutation::RemoveLink { .. } => ChangeKind::LinkRemoved,
            Mutation::DeleteDocument { .. } => ChangeKind::DocumentDeleted,
        }
    }

    /// The document the mutation is addressed to.
    pub fn subject(&self) -> Uuid {
        match self {
            Mutation::LinkAsNewVersion { document, .. } => document.id,
            Mutation::SetCurrentVersion { id }
            | Mutation::UnlinkFromVersionGroup { id }
            | Mutation::MoveVersion { id, .. }
            | Mutation::DeleteDocument { id } => *id,
            Mutation::AddLink { from_id, .. } | Mutation::RemoveLink { from_id, .. } => *from_id,
        }
    }
}

/// One journaled document: its state before and after the mutation.
#[derive(Debug, Clone)]
struct JournalEntry {
    id: Uuid,
    prior: Option<Document>,
    applied: Option<Document>,
}

/// Restores the documents a mutation touched to their prior state.
///
/// Other mutations may have been applied on top since, so after restoring
/// the touched version groups are repaired: one current member, strictly
/// increasing version numbers and no `supersedes_id` pointing at a document
/// the compensation removed. A document deleted by a later mutation stays
/// deleted.
#[derive(Debug)]
pub struct Compensation {
    entries: Vec<JournalEntry>,
}

impl Compensation {
    /// Undo the mutation. Returns every document id it wrote, including
    /// members renumbered or re-flagged by the group repair.
    pub fn apply(self, store: &mut RelationshipStore) -> Vec<Uuid> {
        let mut written = Vec::new();
        let mut groups = Vec::new();
        let mut removed = HashMap::new();

        for entry in self.entries.into_iter().rev() {
            let present = store.get(entry.id).ok().map(|d| d.version_group_id);
            if present.is_none() && entry.applied.is_some() {
                tracing::debug!(id = %entry.id, "document deleted since, not restored");
                continue;
            }
            groups.extend(present);
            match entry.prior {
                Some(doc) => {
                    groups.push(doc.version_group_id);
                    store.upsert(doc);
                }
                None => {
                    if let Some(doc) = store.take(entry.id) {
                        removed.insert(doc.id, doc.supersedes_id);
                    }
                }
            }
            written.push(entry.id);
        }

        for id in splice_supersedes(store, &removed) {
            if !written.contains(&id) {
                written.push(id);
            }
        }

        groups.sort();
        groups.dedup();
        for group_id in groups {
            for id in repair_group(store, group_id) {
                if !written.contains(&id) {
                    written.push(id);
                }
            }
        }
        written
    }
}

/// Point successors of removed documents at the nearest surviving
/// predecessor.
fn splice_supersedes(store: &mut RelationshipStore, removed: &HashMap<Uuid, Option<Uuid>>) -> Vec<Uuid> {
    if removed.is_empty() {
        return Vec::new();
    }
    let dangling: Vec<Document> = store
        .iter()
        .filter(|d| d.supersedes_id.is_some_and(|s| removed.contains_key(&s)))
        .cloned()
        .collect();

    let mut written = Vec::new();
    for mut doc in dangling {
        let mut target = doc.supersedes_id;
        while let Some(prev) = target.and_then(|s| removed.get(&s)) {
            target = *prev;
        }
        doc.supersedes_id = target;
        written.push(doc.id);
        store.upsert(doc);
    }
    written
}

/// Re-establish a group's invariants without touching `updated_at`: keep the
/// highest flagged member current (or elect the highest version) and bump
/// colliding version numbers upwards in version order.
fn repair_group(store: &mut RelationshipStore, group_id: Uuid) -> Vec<Uuid> {
    let members: Vec<Document> = resolver::group_versions(store, group_id)
        .into_iter()
        .cloned()
        .collect();
    let Some(keep) = members
        .iter()
        .rev()
        .find(|d| d.is_current_version)
        .or(members.last())
        .map(|d| d.id)
    else {
        return Vec::new();
    };

    let mut written = Vec::new();
    let mut floor = 0u32;
    for mut doc in members {
        let before = (doc.is_current_version, doc.version_number);
        doc.is_current_version = doc.id == keep;
        if doc.version_number <= floor {
            doc.version_number = floor.saturating_add(1);
        }
        floor = doc.version_number;
        if (doc.is_current_version, doc.version_number) != before {
            written.push(doc.id);
            store.upsert(doc);
        }
    }
    if !written.is_empty() {
        tracing::warn!(%group_id, repaired = written.len(), "version group repaired after rollback");
    }
    written
}

/// Result of a successful mutation.
#[derive(Debug)]
pub struct MutationOutcome {
    pub event: ChangeEvent,
    /// Post-mutation state of every touched document that still exists.
    pub changed: Vec<Document>,
    pub compensation: Compensation,
}

struct Transaction<'s> {
    store: &'s mut RelationshipStore,
    journal: Vec<(Uuid, Option<Document>)>,
}

impl<'s> Transaction<'s> {
    fn new(store: &'s mut RelationshipStore) -> Self {
        Self {
            store,
            journal: Vec::new(),
        }
    }

    fn store(&self) -> &RelationshipStore {
        &*self.store
    }

    fn get(&self, id: Uuid) -> Result<Document> {
        self.store.get(id).cloned()
    }

    fn record(&mut self, id: Uuid) {
        if self.journal.iter().all(|(seen, _)| *seen != id) {
            let prior = self.store.get(id).ok().cloned();
            self.journal.push((id, prior));
        }
    }

    /// Apply `f` to a copy of the document and write it back if it changed.
    fn update(&mut self, id: Uuid, f: impl FnOnce(&mut Document)) -> Result<()> {
        let mut doc = self.get(id)?;
        let before = doc.clone();
        f(&mut doc);
        if doc != before {
            self.record(id);
            doc.updated_at = Utc::now();
            self.store.upsert(doc);
        }
        Ok(())
    }

    fn insert(&mut self, doc: Document) {
        self.record(doc.id);
        self.store.upsert(doc);
    }

    fn delete(&mut self, id: Uuid) -> bool {
        if !self.store.contains(id) {
            return false;
        }
        self.record(id);
        self.store.remove(id)
    }

    fn touched(&self) -> Vec<Uuid> {
        self.journal.iter().map(|(id, _)| *id).collect()
    }

    fn rollback(self) {
        for (id, prior) in self.journal.into_iter().rev() {
            match prior {
                Some(doc) => {
                    self.store.upsert(doc);
                }
                None => {
                    self.store.remove(id);
                }
            }
        }
    }

    fn commit(self, kind: ChangeKind, subject: Uuid) -> MutationOutcome {
        let mut document_ids = vec![subject];
        for id in self.touched() {
            if !document_ids.contains(&id) {
                document_ids.push(id);
            }
        }
        let entries: Vec<JournalEntry> = self
            .journal
            .into_iter()
            .map(|(id, prior)| JournalEntry {
                id,
                prior,
                applied: self.store.get(id).ok().cloned(),
            })
            .collect();
        let changed = entries.iter().filter_map(|e| e.applied.clone()).collect();

        MutationOutcome {
            event: ChangeEvent::new(kind, document_ids),
            changed,
            compensation: Compensation { entries },
        }
    }
}

fn run<F>(store: &mut RelationshipStore, kind: ChangeKind, subject: Uuid, body: F) -> Result<MutationOutcome>
where
    F: FnOnce(&mut Transaction<'_>) -> Result<()>,
{
    let mut tx = Transaction::new(store);
    match body(&mut tx) {
        Ok(()) => {
            let outcome = tx.commit(kind, subject);
            tracing::debug!(?kind, %subject, changed = outcome.changed.len(), "mutation applied");
            Ok(outcome)
        }
        Err(e) => {
            tx.rollback();
            tracing::debug!(?kind, %subject, error = %e, "mutation rejected");
            Err(e)
        }
    }
}

/// Make sure a group has exactly one current member, electing the highest
/// version when it has none and keeping only the highest flagged member when
/// it has several.
fn reconcile_current(tx: &mut Transaction<'_>, group_id: Uuid) -> Result<()> {
    let members = resolver::group_versions(tx.store(), group_id);
    let Some(last) = members.last() else {
        return Ok(());
    };
    let keep = members
        .iter()
        .rev()
        .find(|d| d.is_current_version)
        .unwrap_or(last)
        .id;
    let ids: Vec<Uuid> = members.iter().map(|d| d.id).collect();

    for id in ids {
        tx.update(id, |d| d.is_current_version = id == keep)?;
    }
    Ok(())
}

pub fn apply(store: &mut RelationshipStore, mutation: &Mutation) -> Result<MutationOutcome> {
    match mutation {
        Mutation::LinkAsNewVersion { base_id, document } => {
            link_as_new_version(store, *base_id, document.clone())
        }
        Mutation::SetCurrentVersion { id } => set_current_version(store, *id),
        Mutation::UnlinkFromVersionGroup { id } => unlink_from_version_group(store, *id),
        Mutation::MoveVersion {
            id,
            target_version_number,
        } => move_version(store, *id, *target_version_number),
        Mutation::AddLink {
            from_id,
            to_id,
            link_type,
        } => add_link(store, *from_id, *to_id, link_type),
        Mutation::RemoveLink { from_id, to_id } => remove_link(store, *from_id, *to_id),
        Mutation::DeleteDocument { id } => delete_document(store, *id),
    }
}

/// Insert `new_doc` as the next, current version of `base_id`'s group.
pub fn link_as_new_version(
    store: &mut RelationshipStore,
    base_id: Uuid,
    mut new_doc: Document,
) -> Result<MutationOutcome> {
    let subject = new_doc.id;
    run(store, ChangeKind::LinkedAsNewVersion, subject, |tx| {
        let base = tx.get(base_id)?;
        if tx.store().contains(new_doc.id) {
            return Err(GraphError::InvalidArgument(format!(
                "document {} already exists",
                new_doc.id
            )));
        }

        let group_id = base.version_group_id;
        let previous = resolver::current_of(tx.store(), group_id).map(|c| c.document.id);
        let flagged: Vec<Uuid> = tx
            .store()
            .group_members(group_id)
            .into_iter()
            .filter(|d| d.is_current_version)
            .map(|d| d.id)
            .collect();

        new_doc.version_group_id = group_id;
        new_doc.version_number = resolver::next_version_number(tx.store(), group_id).ok_or_else(|| {
            GraphError::InvalidArgument(format!("version numbers exhausted in group {}", group_id))
        })?;
        new_doc.is_current_version = true;
        new_doc.supersedes_id = previous;

        for id in flagged {
            tx.update(id, |d| d.is_current_version = false)?;
        }
        tx.insert(new_doc);
        Ok(())
    })
}

/// Make `id` the current version of its group. Idempotent.
pub fn set_current_version(store: &mut RelationshipStore, id: Uuid) -> Result<MutationOutcome> {
    run(store, ChangeKind::CurrentVersionSet, id, |tx| {
        let doc = tx.get(id)?;
        let members: Vec<Uuid> = tx
            .store()
            .group_members(doc.version_group_id)
            .into_iter()
            .map(|d| d.id)
            .collect();
        for member in members {
            tx.update(member, |d| d.is_current_version = member == id)?;
        }
        Ok(())
    })
}

/// Move `id` into its own singleton group.
///
/// Remaining members keep their numbers. If `id` was current, the remaining
/// member with the highest version takes over. When the old group was keyed
/// by `id` itself, the remaining members are re-keyed to the id of their
/// lowest version so the two groups stay distinct.
pub fn unlink_from_version_group(store: &mut RelationshipStore, id: Uuid) -> Result<MutationOutcome> {
    run(store, ChangeKind::UnlinkedFromGroup, id, |tx| {
        let doc = tx.get(id)?;
        let old_group = doc.version_group_id;

        let remaining: Vec<Uuid> = resolver::group_versions(tx.store(), old_group)
            .into_iter()
            .filter(|d| d.id != id)
            .map(|d| d.id)
            .collect();

        let remaining_group = match remaining.first() {
            Some(&root) if old_group == id => {
                for member in &remaining {
                    tx.update(*member, |d| d.version_group_id = root)?;
                }
                Some(root)
            }
            Some(_) => Some(old_group),
            None => None,
        };

        tx.update(id, |d| {
            d.version_group_id = id;
            d.version_number = 1;
            d.is_current_version = true;
            d.supersedes_id = None;
        })?;

        if let Some(group_id) = remaining_group {
            reconcile_current(tx, group_id)?;
        }
        Ok(())
    })
}

/// Swap version numbers between `id` and the sibling holding
/// `target_version_number`. Current flags do not move.
pub fn move_version(
    store: &mut RelationshipStore,
    id: Uuid,
    target_version_number: u32,
) -> Result<MutationOutcome> {
    run(store, ChangeKind::VersionMoved, id, |tx| {
        let doc = tx.get(id)?;
        if doc.version_number == target_version_number {
            return Ok(());
        }

        let holder = tx
            .store()
            .group_members(doc.version_group_id)
            .into_iter()
            .find(|d| d.version_number == target_version_number)
            .map(|d| d.id)
            .ok_or_else(|| {
                GraphError::InvalidArgument(format!(
                    "no version {} in group {}",
                    target_version_number, doc.version_group_id
                ))
            })?;

        let from = doc.version_number;
        tx.update(id, |d| d.version_number = target_version_number)?;
        tx.update(holder, |d| d.version_number = from)?;
        Ok(())
    })
}

/// Add or relabel the link `from_id -> to_id`.
pub fn add_link(
    store: &mut RelationshipStore,
    from_id: Uuid,
    to_id: Uuid,
    link_type: &str,
) -> Result<MutationOutcome> {
    run(store, ChangeKind::LinkAdded, from_id, |tx| {
        if from_id == to_id {
            return Err(GraphError::InvalidArgument(
                "a document cannot link to itself".to_string(),
            ));
        }
        tx.update(from_id, |d| {
            match d.links.iter_mut().find(|l| l.target_id == to_id) {
                Some(existing) => {
                    if existing.link_type != link_type {
                        existing.link_type = link_type.to_string();
                    }
                }
                None => d.links.push(DocumentLink {
                    target_id: to_id,
                    link_type: link_type.to_string(),
                }),
            }
        })
    })
}

/// Remove the link `from_id -> to_id`. Removing a missing link is a no-op.
pub fn remove_link(store: &mut RelationshipStore, from_id: Uuid, to_id: Uuid) -> Result<MutationOutcome> {
    run(store, ChangeKind::LinkRemoved, from_id, |tx| {
        tx.update(from_id, |d| d.links.retain(|l| l.target_id != to_id))
    })
}

/// Permanently delete a document. Links pointing at it become broken links.
pub fn delete_document(store: &mut RelationshipStore, id: Uuid) -> Result<MutationOutcome> {
    run(store, ChangeKind::DocumentDeleted, id, |tx| {
        let doc = tx.get(id)?;
        tx.delete(id);
        reconcile_current(tx, doc.version_group_id)
    })
}
