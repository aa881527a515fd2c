//! In-memory Provider
//!
//! A document provider whose documents are plain lists of applied edit records.
//! Used by session scripts and as a test double for the host.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::Mutex;

use crate::core::DocumentId;
use crate::host::provider::{
    DocumentProvider, EditRecord, EditSink, EditingCapability, ResolvedDocument,
};

/// Document held entirely in memory
#[derive(Debug)]
pub struct MemoryDocument {
    id: DocumentId,
    content: Mutex<Vec<EditRecord>>,
    snapshots: Mutex<Vec<Vec<EditRecord>>>,
    save_targets: Mutex<Vec<DocumentId>>,
    sink: Mutex<Option<EditSink>>,
    fail_saves: AtomicBool,
}

impl MemoryDocument {
    pub fn new(id: DocumentId) -> Self {
        Self {
            id,
            content: Mutex::new(Vec::new()),
            snapshots: Mutex::new(Vec::new()),
            save_targets: Mutex::new(Vec::new()),
            sink: Mutex::new(None),
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// Edits currently applied, oldest first
    pub async fn content(&self) -> Vec<EditRecord> {
        self.content.lock().await.clone()
    }

    /// Content at each successful save, oldest first
    pub async fn snapshots(&self) -> Vec<Vec<EditRecord>> {
        self.snapshots.lock().await.clone()
    }

    /// Targets of successful save-as calls, oldest first
    pub async fn save_targets(&self) -> Vec<DocumentId> {
        self.save_targets.lock().await.clone()
    }

    pub async fn is_subscribed(&self) -> bool {
        self.sink.lock().await.is_some()
    }

    /// Make subsequent saves fail (or succeed again)
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Apply `edit` as if the user made it, and report it to the host
    pub async fn simulate_edit(&self, edit: EditRecord) {
        self.content.lock().await.push(edit.clone());
        let sink = self.sink.lock().await.clone();
        match sink {
            Some(sink) => sink.record(edit).await,
            None => log::debug!("{}: edit made without a subscribed host", self.id),
        }
    }

    async fn snapshot(&self) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            bail!("write to '{}' rejected", self.id);
        }
        let content = self.content.lock().await.clone();
        self.snapshots.lock().await.push(content);
        Ok(())
    }
}

#[tower_lsp::async_trait]
impl EditingCapability for MemoryDocument {
    async fn apply_edits(&self, edits: &[EditRecord]) -> Result<()> {
        self.content.lock().await.extend_from_slice(edits);
        Ok(())
    }

    async fn undo_edits(&self, edits: &[EditRecord]) -> Result<()> {
        let mut content = self.content.lock().await;
        for edit in edits {
            match content.iter().rposition(|applied| applied == edit) {
                Some(index) => {
                    content.remove(index);
                }
                None => bail!("edit {} is not applied to '{}'", edit, self.id),
            }
        }
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        self.snapshot().await
    }

    async fn save_as(&self, target: &DocumentId) -> Result<()> {
        self.snapshot().await?;
        self.save_targets.lock().await.push(target.clone());
        Ok(())
    }

    async fn on_did_edit(&self, sink: EditSink) {
        *self.sink.lock().await = Some(sink);
    }
}

/// Provider serving [`MemoryDocument`]s for one view type
#[derive(Debug)]
pub struct MemoryProvider {
    view_type: String,
    documents: Mutex<HashMap<DocumentId, Arc<MemoryDocument>>>,
    read_only: HashSet<DocumentId>,
    unresolvable: HashSet<DocumentId>,
    resolve_delay: Option<Duration>,
    resolve_calls: AtomicUsize,
}

impl MemoryProvider {
    pub fn new(view_type: impl Into<String>) -> Self {
        Self {
            view_type: view_type.into(),
            documents: Mutex::new(HashMap::new()),
            read_only: HashSet::new(),
            unresolvable: HashSet::new(),
            resolve_delay: None,
            resolve_calls: AtomicUsize::new(0),
        }
    }

    /// Resolve `id` without an editing capability
    pub fn read_only(mut self, id: DocumentId) -> Self {
        self.read_only.insert(id);
        self
    }

    /// Fail every resolution of `id`
    pub fn unresolvable(mut self, id: DocumentId) -> Self {
        self.unresolvable.insert(id);
        self
    }

    /// Delay each resolution, to let concurrent opens overlap
    pub fn with_resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = Some(delay);
        self
    }

    pub fn view_type(&self) -> &str {
        &self.view_type
    }

    /// Number of `resolve_document` calls received
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    /// Document previously resolved for `id`
    pub async fn document(&self, id: &DocumentId) -> Option<Arc<MemoryDocument>> {
        self.documents.lock().await.get(id).cloned()
    }

    /// All resolved documents, sorted by location
    pub async fn documents(&self) -> Vec<Arc<MemoryDocument>> {
        let mut documents: Vec<_> = self.documents.lock().await.values().cloned().collect();
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        documents
    }
}

#[tower_lsp::async_trait]
impl DocumentProvider for MemoryProvider {
    async fn resolve_document(&self, id: &DocumentId) -> Result<ResolvedDocument> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.resolve_delay {
            tokio::time::sleep(delay).await;
        }
        if self.unresolvable.contains(id) {
            bail!("'{}' cannot be resolved by {}", id, self.view_type);
        }

        self.documents
            .lock()
            .await
            .entry(id.clone())
            .or_insert_with(|| Arc::new(MemoryDocument::new(id.clone())));
        Ok(ResolvedDocument::new(id.clone(), self.view_type.clone()))
    }

    async fn resolve_editing_capability(
        &self,
        id: &DocumentId,
    ) -> Option<Arc<dyn EditingCapability>> {
        if self.read_only.contains(id) {
            return None;
        }
        let document = self.documents.lock().await.get(id).cloned()?;
        Some(document)
    }
}
