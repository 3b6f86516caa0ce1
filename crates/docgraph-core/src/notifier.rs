use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    LinkedAsNewVersion,
    CurrentVersionSet,
    UnlinkedFromGroup,
    VersionMoved,
    LinkAdded,
    LinkRemoved,
    DocumentDeleted,
    Hydrated,
    RolledBack,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Subject first, then every other document the change touched.
    pub document_ids: Vec<Uuid>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, document_ids: Vec<Uuid>) -> Self {
        Self { kind, document_ids }
    }

    pub fn touches(&self, id: Uuid) -> bool {
        self.document_ids.contains(&id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Box<dyn FnMut(&ChangeEvent) -> anyhow::Result<()> + Send>;

/// Synchronous fan-out of change events to registered listeners.
///
/// A listener that fails, by error or by panic, is logged and skipped; the
/// others still run.
#[derive(Default)]
pub struct ChangeNotifier {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ChangeEvent) -> anyhow::Result<()> + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `event` to every listener. Returns how many failed.
    pub fn notify(&mut self, event: &ChangeEvent) -> usize {
        let mut failures = 0;
        for (id, listener) in self.listeners.iter_mut() {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::warn!(listener = id.0, kind = ?event.kind, "change listener failed: {:#}", e);
                }
                Err(payload) => {
                    failures += 1;
                    tracing::warn!(
                        listener = id.0,
                        kind = ?event.kind,
                        "change listener panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        failures
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
