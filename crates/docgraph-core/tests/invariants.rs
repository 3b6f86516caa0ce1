//! Property tests: arbitrary mutation sequences keep version groups sound.

use std::collections::{HashMap, HashSet};

use docgraph_core::{Compensation, DocumentGraph, GraphError, Mutation, RelationshipStore};
use docgraph_shared::Document;
use proptest::prelude::*;
use uuid::Uuid;

#[derive(Debug, Clone)]
enum Op {
    Upload,
    NewVersion(usize),
    SetCurrent(usize),
    Unlink(usize),
    Move(usize, u32),
    AddLink(usize, usize),
    RemoveLink(usize, usize),
    Delete(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => Just(Op::Upload),
        3 => any::<usize>().prop_map(Op::NewVersion),
        2 => any::<usize>().prop_map(Op::SetCurrent),
        2 => any::<usize>().prop_map(Op::Unlink),
        2 => (any::<usize>(), 0u32..6).prop_map(|(i, n)| Op::Move(i, n)),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::AddLink(a, b)),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::RemoveLink(a, b)),
        1 => any::<usize>().prop_map(Op::Delete),
    ]
}

fn snapshot(store: &RelationshipStore) -> HashMap<Uuid, Document> {
    store.all().into_iter().map(|d| (d.id, d)).collect()
}

fn check_invariants(store: &RelationshipStore) -> Result<(), TestCaseError> {
    let mut groups: HashMap<Uuid, Vec<&Document>> = HashMap::new();
    for doc in store.iter() {
        groups.entry(doc.version_group_id).or_default().push(doc);
    }

    for (group_id, members) in &groups {
        let current = members.iter().filter(|d| d.is_current_version).count();
        prop_assert_eq!(current, 1, "group {} has {} current versions", group_id, current);

        let numbers: HashSet<u32> = members.iter().map(|d| d.version_number).collect();
        prop_assert_eq!(numbers.len(), members.len(), "duplicate version numbers in {}", group_id);
        prop_assert!(members.iter().all(|d| d.version_number >= 1));

        prop_assert_eq!(store.group_size(*group_id), members.len());
    }

    for doc in store.iter() {
        let targets: HashSet<Uuid> = doc.links.iter().map(|l| l.target_id).collect();
        prop_assert_eq!(targets.len(), doc.links.len(), "duplicate links on {}", doc.id);
        prop_assert!(!targets.contains(&doc.id), "self link on {}", doc.id);
        for target in targets {
            prop_assert!(store.linking_to(target).iter().any(|d| d.id == doc.id));
        }
    }
    Ok(())
}

fn pick(ids: &[Uuid], i: usize) -> Uuid {
    ids[i % ids.len()]
}

/// Turn an op into a mutation. Uploads are inserted directly and yield `None`.
fn mutation_for(op: Op, ids: &mut Vec<Uuid>, graph: &mut DocumentGraph) -> Option<Mutation> {
    let mutation = match op {
        Op::Upload => {
            let doc = Document::new(Uuid::nil(), "upload");
            ids.push(doc.id);
            graph.insert(doc);
            return None;
        }
        Op::NewVersion(i) => {
            let doc = Document::new(Uuid::nil(), "revision");
            let base_id = pick(ids, i);
            ids.push(doc.id);
            Mutation::LinkAsNewVersion { base_id, document: doc }
        }
        Op::SetCurrent(i) => Mutation::SetCurrentVersion { id: pick(ids, i) },
        Op::Unlink(i) => Mutation::UnlinkFromVersionGroup { id: pick(ids, i) },
        Op::Move(i, n) => Mutation::MoveVersion { id: pick(ids, i), target_version_number: n },
        Op::AddLink(a, b) => Mutation::AddLink {
            from_id: pick(ids, a),
            to_id: pick(ids, b),
            link_type: "related".to_string(),
        },
        Op::RemoveLink(a, b) => Mutation::RemoveLink { from_id: pick(ids, a), to_id: pick(ids, b) },
        Op::Delete(i) => Mutation::DeleteDocument { id: pick(ids, i) },
    };
    Some(mutation)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        ..ProptestConfig::default()
    })]

    #[test]
    fn mutation_sequences_preserve_invariants(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let seed: Vec<Document> = (0..3).map(|i| Document::new(Uuid::nil(), format!("doc {}", i))).collect();
        let mut ids: Vec<Uuid> = seed.iter().map(|d| d.id).collect();
        let mut graph = DocumentGraph::from_store(RelationshipStore::from_documents(seed));

        for op in ops {
            let Some(mutation) = mutation_for(op, &mut ids, &mut graph) else {
                continue;
            };

            let before = snapshot(graph.store());
            match graph.apply(&mutation) {
                Ok(_) => {}
                Err(GraphError::NotFound(_)) | Err(GraphError::InvalidArgument(_)) => {
                    prop_assert_eq!(&before, &snapshot(graph.store()), "rejected {:?} changed the store", mutation);
                }
            }
            check_invariants(graph.store())?;
        }
    }

    #[test]
    fn compensation_undoes_any_single_mutation(ops in prop::collection::vec(op_strategy(), 1..20), last in op_strategy()) {
        let seed: Vec<Document> = (0..3).map(|i| Document::new(Uuid::nil(), format!("doc {}", i))).collect();
        let mut ids: Vec<Uuid> = seed.iter().map(|d| d.id).collect();
        let mut graph = DocumentGraph::from_store(RelationshipStore::from_documents(seed));

        for op in ops.into_iter().chain(std::iter::once(last)) {
            let mutation = match op {
                Op::Upload | Op::NewVersion(_) => {
                    let doc = Document::new(Uuid::nil(), "revision");
                    let base_id = pick(&ids, ids.len());
                    ids.push(doc.id);
                    Mutation::LinkAsNewVersion { base_id, document: doc }
                }
                Op::SetCurrent(i) => Mutation::SetCurrentVersion { id: pick(&ids, i) },
                Op::Unlink(i) => Mutation::UnlinkFromVersionGroup { id: pick(&ids, i) },
                Op::Move(i, n) => Mutation::MoveVersion { id: pick(&ids, i), target_version_number: n },
                Op::AddLink(a, b) => Mutation::AddLink {
                    from_id: pick(&ids, a),
                    to_id: pick(&ids, b),
                    link_type: "related".to_string(),
                },
                Op::RemoveLink(a, b) => Mutation::RemoveLink { from_id: pick(&ids, a), to_id: pick(&ids, b) },
                Op::Delete(i) => Mutation::DeleteDocument { id: pick(&ids, i) },
            };

            let before = snapshot(graph.store());
            if let Ok(outcome) = graph.apply(&mutation) {
                let ids_touched = outcome.event.document_ids.clone();
                graph.compensate(outcome.compensation, ids_touched);
                prop_assert_eq!(&before, &snapshot(graph.store()));
                // reapply so later steps build on it
                let _ = graph.apply(&mutation);
            }
        }
    }

    #[test]
    fn out_of_order_rollbacks_preserve_invariants(
        ops in prop::collection::vec(op_strategy(), 1..30),
        order in prop::collection::vec(any::<u32>(), 30),
        confirmed in prop::collection::vec(any::<bool>(), 30),
    ) {
        let seed: Vec<Document> = (0..3).map(|i| Document::new(Uuid::nil(), format!("doc {}", i))).collect();
        let mut ids: Vec<Uuid> = seed.iter().map(|d| d.id).collect();
        let mut graph = DocumentGraph::from_store(RelationshipStore::from_documents(seed));

        // Stage everything first, as an optimistic client would.
        let mut pending: Vec<(u32, Compensation, Vec<Uuid>)> = Vec::new();
        for (i, op) in ops.into_iter().enumerate() {
            let Some(mutation) = mutation_for(op, &mut ids, &mut graph) else {
                continue;
            };
            if let Ok(outcome) = graph.apply(&mutation) {
                if !confirmed[i] {
                    pending.push((order[i], outcome.compensation, outcome.event.document_ids));
                }
            }
        }

        pending.sort_by_key(|(key, _, _)| *key);
        for (_, compensation, document_ids) in pending {
            graph.compensate(compensation, document_ids);
            check_invariants(graph.store())?;
        }
    }
}
