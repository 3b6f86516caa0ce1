//! Read-only queries over a [`RelationshipStore`].

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use docgraph_shared::{Document, Relationships};
use uuid::Uuid;

use crate::error::Result;
use crate::store::RelationshipStore;

/// A version group that does not have exactly one current member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityWarning {
    NoCurrentVersion { group_id: Uuid },
    MultipleCurrentVersions { group_id: Uuid, current_ids: Vec<Uuid> },
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityWarning::NoCurrentVersion { group_id } => {
                write!(f, "version group {} has no current version", group_id)
            }
            IntegrityWarning::MultipleCurrentVersions {
                group_id,
                current_ids,
            } => write!(
                f,
                "version group {} has {} current versions",
                group_id,
                current_ids.len()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentVersion<'a> {
    pub document: &'a Document,
    /// Set when the group was inconsistent and `document` was picked by the
    /// highest-version fallback.
    pub warning: Option<IntegrityWarning>,
}

fn version_order(a: &Document, b: &Document) -> Ordering {
    a.version_number
        .cmp(&b.version_number)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

/// Members of a version group, ascending by version number.
pub fn group_versions(store: &RelationshipStore, group_id: Uuid) -> Vec<&Document> {
    let mut members = store.group_members(group_id);
    members.sort_by(|a, b| version_order(a, b));
    members
}

/// All versions in `doc`'s group, `doc` included, ascending by version number.
pub fn versions_of<'a>(store: &'a RelationshipStore, doc: &Document) -> Vec<&'a Document> {
    group_versions(store, doc.version_group_id)
}

/// The current version of a group.
///
/// A group with zero or several flagged members is recovered by picking the
/// highest version number (among the flagged members when there are
/// several) and reporting an [`IntegrityWarning`].
pub fn current_of(store: &RelationshipStore, group_id: Uuid) -> Option<CurrentVersion<'_>> {
    let members = group_versions(store, group_id);
    let flagged: Vec<&Document> = members
        .iter()
        .copied()
        .filter(|d| d.is_current_version)
        .collect();

    let current = match flagged.as_slice() {
        [only] => CurrentVersion {
            document: *only,
            warning: None,
        },
        [] => CurrentVersion {
            document: members.last().copied()?,
            warning: Some(IntegrityWarning::NoCurrentVersion { group_id }),
        },
        many => CurrentVersion {
            document: many[many.len() - 1],
            warning: Some(IntegrityWarning::MultipleCurrentVersions {
                group_id,
                current_ids: many.iter().map(|d| d.id).collect(),
            }),
        },
    };

    if let Some(ref warning) = current.warning {
        tracing::warn!(
            %group_id,
            chosen = %current.document.id,
            "integrity warning: {}",
            warning
        );
    }

    Some(current)
}

/// One past the highest number in the group, `1` for an empty group, or
/// `None` once the numbering is exhausted.
pub fn next_version_number(store: &RelationshipStore, group_id: Uuid) -> Option<u32> {
    store
        .group_members(group_id)
        .iter()
        .map(|d| d.version_number)
        .max()
        .map_or(Some(1), |max| max.checked_add(1))
}

/// Classify everything around `id`: version siblings, outgoing and incoming
/// links, and outgoing links whose target is not in the store.
pub fn relationships_of(store: &RelationshipStore, id: Uuid) -> Result<Relationships> {
    let doc = store.get(id)?;

    let versions: Vec<Document> = versions_of(store, doc)
        .into_iter()
        .filter(|d| d.id != id)
        .cloned()
        .collect();

    let mut outgoing = Vec::new();
    let mut broken = Vec::new();
    for link in &doc.links {
        match store.get(link.target_id) {
            Ok(target) => outgoing.push(target.clone()),
            Err(_) => broken.push(link.target_id),
        }
    }

    let mut incoming: Vec<Document> = store.linking_to(id).into_iter().cloned().collect();
    incoming.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let mut seen = HashSet::new();
    let linked = outgoing
        .iter()
        .chain(incoming.iter())
        .filter(|d| seen.insert(d.id))
        .cloned()
        .collect();

    Ok(Relationships {
        linked,
        versions,
        incoming,
        outgoing,
        broken,
    })
}

/// Other documents with the same content hash as `doc`.
pub fn duplicates_of<'a>(store: &'a RelationshipStore, doc: &Document) -> Vec<&'a Document> {
    let Some(hash) = doc.content_hash.as_deref() else {
        return Vec::new();
    };
    let mut dupes: Vec<&Document> = store.with_content_hash(hash).filter(|d| d.id != doc.id).collect();
    dupes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    dupes
}

fn normalized_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Current versions of other groups that look like earlier revisions of
/// `doc`: a member shares its content hash or its title.
pub fn version_candidates<'a>(store: &'a RelationshipStore, doc: &Document) -> Vec<&'a Document> {
    let title = normalized_title(&doc.title);
    let mut groups = HashSet::new();

    for other in store.iter() {
        if other.version_group_id == doc.version_group_id {
            continue;
        }
        let same_hash = doc.content_hash.is_some() && other.content_hash == doc.content_hash;
        if same_hash || (!title.is_empty() && normalized_title(&other.title) == title) {
            groups.insert(other.version_group_id);
        }
    }

    let mut candidates: Vec<&Document> = groups
        .into_iter()
        .filter_map(|group_id| current_of(store, group_id).map(|c| c.document))
        .collect();
    candidates.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use docgraph_shared::DocumentLink;

    fn member(group: Uuid, number: u32, current: bool) -> Document {
        let mut doc = Document::new(Uuid::nil(), format!("v{}", number));
        doc.version_group_id = group;
        doc.version_number = number;
        doc.is_current_version = current;
        doc
    }

    #[test]
    fn versions_sorted_by_number_then_upload_time() {
        let group = Uuid::new_v4();
        let v3 = member(group, 3, true);
        let v1 = member(group, 1, false);
        let mut late_dup = member(group, 2, false);
        let mut early_dup = member(group, 2, false);
        early_dup.created_at = Utc::now() - Duration::hours(1);
        late_dup.created_at = Utc::now();

        let store = RelationshipStore::from_documents([
            v3.clone(),
            late_dup.clone(),
            v1.clone(),
            early_dup.clone(),
        ]);
        let ids: Vec<Uuid> = versions_of(&store, &v1).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![v1.id, early_dup.id, late_dup.id, v3.id]);
    }

    #[test]
    fn current_of_single_flag_has_no_warning() {
        let group = Uuid::new_v4();
        let current = member(group, 1, true);
        let store = RelationshipStore::from_documents([current.clone(), member(group, 2, false)]);
        let found = current_of(&store, group).unwrap();
        assert_eq!(found.document.id, current.id);
        assert_eq!(found.warning, None);
    }

    #[test]
    fn current_of_without_flag_falls_back_to_highest_version() {
        let group = Uuid::new_v4();
        let v2 = member(group, 2, false);
        let store = RelationshipStore::from_documents([member(group, 1, false), v2.clone()]);
        let found = current_of(&store, group).unwrap();
        assert_eq!(found.document.id, v2.id);
        assert_eq!(found.warning, Some(IntegrityWarning::NoCurrentVersion { group_id: group }));
    }

    #[test]
    fn current_of_with_several_flags_picks_highest_flagged() {
        let group = Uuid::new_v4();
        let v1 = member(group, 1, true);
        let v2 = member(group, 2, true);
        let store = RelationshipStore::from_documents([v1.clone(), v2.clone(), member(group, 3, false)]);
        let found = current_of(&store, group).unwrap();
        assert_eq!(found.document.id, v2.id);
        assert!(matches!(
            found.warning,
            Some(IntegrityWarning::MultipleCurrentVersions { ref current_ids, .. }) if current_ids.len() == 2
        ));
    }

    #[test]
    fn current_of_empty_group_is_none() {
        let store = RelationshipStore::new();
        assert!(current_of(&store, Uuid::new_v4()).is_none());
    }

    #[test]
    fn next_version_number_skips_gaps() {
        let group = Uuid::new_v4();
        let store = RelationshipStore::from_documents([member(group, 1, false), member(group, 4, true)]);
        assert_eq!(next_version_number(&store, group), Some(5));
        assert_eq!(next_version_number(&store, Uuid::new_v4()), Some(1));
    }

    #[test]
    fn next_version_number_is_none_when_exhausted() {
        let group = Uuid::new_v4();
        let store = RelationshipStore::from_documents([member(group, u32::MAX, true)]);
        assert_eq!(next_version_number(&store, group), None);
    }

    #[test]
    fn relationships_classify_links_and_report_broken_targets() {
        let mut focus = Document::new(Uuid::nil(), "focus");
        let target = Document::new(Uuid::nil(), "target");
        let mut referrer = Document::new(Uuid::nil(), "referrer");
        let missing = Uuid::new_v4();
        focus.links = vec![
            DocumentLink { target_id: target.id, link_type: "related".into() },
            DocumentLink { target_id: missing, link_type: "related".into() },
        ];
        referrer.links = vec![DocumentLink { target_id: focus.id, link_type: "cites".into() }];

        let store = RelationshipStore::from_documents([focus.clone(), target.clone(), referrer.clone()]);
        let rels = relationships_of(&store, focus.id).unwrap();

        assert_eq!(rels.outgoing.iter().map(|d| d.id).collect::<Vec<_>>(), vec![target.id]);
        assert_eq!(rels.incoming.iter().map(|d| d.id).collect::<Vec<_>>(), vec![referrer.id]);
        assert_eq!(rels.linked.len(), 2);
        assert_eq!(rels.broken, vec![missing]);
        assert!(rels.versions.is_empty());
    }

    #[test]
    fn mutual_links_appear_once_in_linked() {
        let mut a = Document::new(Uuid::nil(), "a");
        let mut b = Document::new(Uuid::nil(), "b");
        a.links = vec![DocumentLink { target_id: b.id, link_type: "related".into() }];
        b.links = vec![DocumentLink { target_id: a.id, link_type: "related".into() }];
        let store = RelationshipStore::from_documents([a.clone(), b.clone()]);

        let rels = relationships_of(&store, a.id).unwrap();
        assert_eq!(rels.linked.len(), 1);
        assert_eq!(rels.linked[0].id, b.id);
    }

    #[test]
    fn duplicates_and_candidates_use_content_hash() {
        let upload = Document::new(Uuid::nil(), "Budget 2024").with_content_hash("abc");
        let older = Document::new(Uuid::nil(), "budget").with_content_hash("abc");
        let same_title = Document::new(Uuid::nil(), " budget 2024 ");
        let unrelated = Document::new(Uuid::nil(), "Roadmap").with_content_hash("zzz");
        let store = RelationshipStore::from_documents([
            upload.clone(),
            older.clone(),
            same_title.clone(),
            unrelated,
        ]);

        let dupes: Vec<Uuid> = duplicates_of(&store, &upload).iter().map(|d| d.id).collect();
        assert_eq!(dupes, vec![older.id]);

        let mut candidates: Vec<Uuid> = version_candidates(&store, &upload).iter().map(|d| d.id).collect();
        candidates.sort();
        let mut expected = vec![older.id, same_title.id];
        expected.sort();
        assert_eq!(candidates, expected);
    }
}
