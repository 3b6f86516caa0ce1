use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use docgraph_client::{DocumentBackend, SyncError, SyncedGraph};
use docgraph_shared::{Document, Relationships, DEFAULT_LINK_TYPE};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Documents,
    Relationships,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Versions,
    Links,
}

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Tick,
}

/// One row of the links panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRow {
    Outgoing { document: Document, link_type: String },
    Incoming(Document),
    Broken(Uuid),
}

impl LinkRow {
    pub fn target(&self) -> Uuid {
        match self {
            LinkRow::Outgoing { document, .. } | LinkRow::Incoming(document) => document.id,
            LinkRow::Broken(id) => *id,
        }
    }
}

pub struct App<B> {
    pub synced: SyncedGraph<B>,
    pub workspace_id: Uuid,
    pub view: View,
    pub panel: Panel,

    pub loading: bool,
    pub loading_message: String,
    pub error_message: Option<String>,
    pub status_message: Option<String>,

    // Documents view
    pub documents: Vec<Document>,
    pub selected_document: usize,
    /// Marked with `m`; `l` links it to the selected document.
    pub link_source: Option<Uuid>,

    // Relationships view
    pub focus: Option<Uuid>,
    pub versions: Vec<Document>,
    pub link_rows: Vec<LinkRow>,
    pub candidates: Vec<Document>,
    pub integrity_warning: Option<String>,
    pub selected_version: usize,
    pub selected_link: usize,

    dirty: Arc<AtomicBool>,
}

impl<B: DocumentBackend> App<B> {
    pub fn new(mut synced: SyncedGraph<B>, workspace_id: Uuid) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&dirty);
        synced.graph_mut().subscribe(move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        Self {
            synced,
            workspace_id,
            view: View::Documents,
            panel: Panel::Versions,
            loading: false,
            loading_message: String::new(),
            error_message: None,
            status_message: None,
            documents: Vec::new(),
            selected_document: 0,
            link_source: None,
            focus: None,
            versions: Vec::new(),
            link_rows: Vec::new(),
            candidates: Vec::new(),
            integrity_warning: None,
            selected_version: 0,
            selected_link: 0,
            dirty,
        }
    }

    pub fn set_loading(&mut self, loading: bool, message: &str) {
        self.loading = loading;
        self.loading_message = message.to_string();
    }

    pub fn set_error(&mut self, message: String) {
        self.error_message = Some(message);
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    /// Rebuild view rows from the graph if anything changed since last time.
    pub fn sync_view(&mut self) {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return;
        }

        let store = self.synced.graph().store();
        let mut documents = store.all();
        documents.sort_by(|a, b| {
            a.folder_path
                .cmp(&b.folder_path)
                .then(a.title.cmp(&b.title))
                .then(a.version_number.cmp(&b.version_number))
        });
        self.documents = documents;
        self.selected_document = clamp(self.selected_document, self.documents.len());

        let Some(focus) = self.focus else {
            return;
        };
        if !store.contains(focus) {
            // Deleted or rolled back from under us.
            self.focus = None;
            self.view = View::Documents;
            return;
        }

        let graph = self.synced.graph();
        self.versions = graph
            .versions_of(focus)
            .map(|docs| docs.into_iter().cloned().collect())
            .unwrap_or_default();
        self.integrity_warning = graph
            .get(focus)
            .ok()
            .and_then(|doc| graph.current_of(doc.version_group_id))
            .and_then(|current| current.warning)
            .map(|w| w.to_string());
        self.candidates = graph
            .version_candidates(focus)
            .map(|docs| docs.into_iter().cloned().collect())
            .unwrap_or_default();
        self.link_rows = match graph.relationships_of(focus) {
            Ok(rels) => link_rows(graph.get(focus).ok(), rels),
            Err(_) => Vec::new(),
        };

        self.selected_version = clamp(self.selected_version, self.versions.len());
        self.selected_link = clamp(self.selected_link, self.link_rows.len());
    }

    pub fn selected_version_doc(&self) -> Option<&Document> {
        self.versions.get(self.selected_version)
    }

    pub fn focus_document(&self) -> Option<&Document> {
        self.focus.and_then(|id| self.synced.graph().get(id).ok())
    }

    pub async fn load_workspace(&mut self) {
        self.set_loading(true, "Loading documents...");
        if let Err(e) = self.synced.load_all().await {
            self.set_error(format!("Failed to load documents: {}", e));
        }
        self.set_loading(false, "");
        self.sync_view();
    }

    /// Handle key events, returns true if app should quit
    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        // Clear error on any key press
        if self.error_message.is_some() {
            self.clear_error();
            return Ok(false);
        }
        self.status_message = None;

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }

        let quit = match self.view {
            View::Documents => self.handle_documents_key(key).await,
            View::Relationships => self.handle_relationships_key(key).await,
        };
        self.sync_view();
        Ok(quit)
    }

    async fn handle_documents_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected_document < self.documents.len().saturating_sub(1) {
                    self.selected_document += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_document = self.selected_document.saturating_sub(1);
            }
            KeyCode::Char('r') => self.load_workspace().await,
            KeyCode::Char('m') => {
                self.link_source = self.documents.get(self.selected_document).map(|d| d.id);
                if self.link_source.is_some() {
                    self.status_message = Some("Marked as link source".to_string());
                }
            }
            KeyCode::Char('l') => {
                let target = self.documents.get(self.selected_document).map(|d| d.id);
                if let (Some(from), Some(to)) = (self.link_source, target) {
                    let result = self.synced.add_link(from, to, DEFAULT_LINK_TYPE).await;
                    self.report(result, "Linked");
                }
            }
            KeyCode::Enter => {
                if let Some(id) = self.documents.get(self.selected_document).map(|d| d.id) {
                    self.open_document(id).await;
                }
            }
            _ => {}
        }
        false
    }

    async fn handle_relationships_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Backspace | KeyCode::Esc => {
                self.focus = None;
                self.view = View::Documents;
            }
            KeyCode::Tab => {
                self.panel = match self.panel {
                    Panel::Versions => Panel::Links,
                    Panel::Links => Panel::Versions,
                };
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('r') => {
                if let Some(id) = self.focus {
                    self.open_document(id).await;
                }
            }
            KeyCode::Char('n') => {
                if let Some(base) = self.focus_document() {
                    let base_id = base.id;
                    let doc = Document::new(self.workspace_id, base.title.clone())
                        .with_folder_path(base.folder_path.clone());
                    let result = self.synced.link_as_new_version(base_id, doc).await;
                    self.report(result, "New version created");
                }
            }
            KeyCode::Enter if self.panel == Panel::Links => {
                let target = self.link_rows.get(self.selected_link).and_then(|row| match row {
                    LinkRow::Broken(_) => None,
                    other => Some(other.target()),
                });
                if let Some(id) = target {
                    self.open_document(id).await;
                }
            }
            KeyCode::Char('d') if self.panel == Panel::Links => {
                let row = self.link_rows.get(self.selected_link).cloned();
                match (self.focus, row) {
                    (Some(from), Some(LinkRow::Outgoing { document, .. })) => {
                        let result = self.synced.remove_link(from, document.id).await;
                        self.report(result, "Link removed");
                    }
                    (Some(from), Some(LinkRow::Broken(to))) => {
                        let result = self.synced.remove_link(from, to).await;
                        self.report(result, "Broken link removed");
                    }
                    _ => {
                        self.status_message =
                            Some("Only this document's own links can be removed".to_string());
                    }
                }
            }
            KeyCode::Char('c') if self.panel == Panel::Versions => {
                if let Some(id) = self.selected_version_doc().map(|d| d.id) {
                    let result = self.synced.set_current_version(id).await;
                    self.report(result, "Current version set");
                }
            }
            KeyCode::Char('u') if self.panel == Panel::Versions => {
                if let Some(id) = self.selected_version_doc().map(|d| d.id) {
                    let result = self.synced.unlink_from_version_group(id).await;
                    self.report(result, "Unlinked from version group");
                }
            }
            KeyCode::Char('J') if self.panel == Panel::Versions => self.shift_version(1).await,
            KeyCode::Char('K') if self.panel == Panel::Versions => self.shift_version(-1).await,
            KeyCode::Char('D') if self.panel == Panel::Versions => {
                if let Some(id) = self.selected_version_doc().map(|d| d.id) {
                    if Some(id) == self.focus {
                        // Fall back to a remaining version, if any.
                        self.focus = self.versions.iter().map(|d| d.id).find(|v| *v != id);
                    }
                    let result = self.synced.delete_document(id).await;
                    self.report(result, "Document deleted");
                    if self.focus.is_none() {
                        self.view = View::Documents;
                    }
                }
            }
            _ => {}
        }
        false
    }

    fn move_selection(&mut self, delta: isize) {
        let (selected, len) = match self.panel {
            Panel::Versions => (&mut self.selected_version, self.versions.len()),
            Panel::Links => (&mut self.selected_link, self.link_rows.len()),
        };
        let next = (*selected as isize + delta).clamp(0, len.saturating_sub(1) as isize);
        *selected = next as usize;
    }

    /// Swap the selected version with its neighbour in the timeline.
    async fn shift_version(&mut self, delta: isize) {
        let Some(doc) = self.selected_version_doc() else {
            return;
        };
        let neighbour = self.selected_version as isize + delta;
        if neighbour < 0 || neighbour as usize >= self.versions.len() {
            return;
        }
        let id = doc.id;
        let target = self.versions[neighbour as usize].version_number;
        let result = self.synced.move_version(id, target).await;
        if self.report(result, "Version moved") {
            self.selected_version = neighbour as usize;
        }
    }

    pub async fn open_document(&mut self, id: Uuid) {
        self.set_loading(true, "Loading relationships...");
        match self.synced.refresh(id).await {
            Ok(_) => {
                self.focus = Some(id);
                self.view = View::Relationships;
                self.selected_version = 0;
                self.selected_link = 0;
                self.dirty.store(true, Ordering::SeqCst);
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "refresh failed");
                // Fall back to what is already known locally.
                if self.synced.graph().store().contains(id) {
                    self.focus = Some(id);
                    self.view = View::Relationships;
                    self.dirty.store(true, Ordering::SeqCst);
                }
                self.set_error(format!("Could not refresh from server: {}", e));
            }
        }
        self.set_loading(false, "");
    }

    /// Surface a mutation result; a rollback shows up as an error popup.
    fn report(&mut self, result: Result<Vec<Document>, SyncError>, done: &str) -> bool {
        match result {
            Ok(_) => {
                self.status_message = Some(done.to_string());
                true
            }
            Err(e) => {
                self.set_error(e.to_string());
                false
            }
        }
    }
}

fn clamp(selected: usize, len: usize) -> usize {
    selected.min(len.saturating_sub(1))
}

fn link_rows(focus: Option<&Document>, rels: Relationships) -> Vec<LinkRow> {
    let mut rows: Vec<LinkRow> = rels
        .outgoing
        .into_iter()
        .map(|document| {
            let link_type = focus
                .and_then(|f| f.link_to(document.id))
                .map(|l| l.link_type.clone())
                .unwrap_or_else(|| DEFAULT_LINK_TYPE.to_string());
            LinkRow::Outgoing {
                document,
                link_type,
            }
        })
        .collect();
    rows.extend(rels.incoming.into_iter().map(LinkRow::Incoming));
    rows.extend(rels.broken.into_iter().map(LinkRow::Broken));
    rows
}
