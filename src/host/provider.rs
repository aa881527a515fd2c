//! Provider Contracts
//!
//! The collaborators a custom editor plugs into the host: a document provider
//! that resolves documents, and the editing capability of a resolved document.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::core::{CommandLog, DocumentId};

/// Opaque unit of reversible change. The host never looks inside it.
pub type EditRecord = serde_json::Value;

/// Shared command log of a host session
pub type SharedCommandLog = Arc<Mutex<CommandLog<EditRecord>>>;

/// Resolves documents for one view type
#[tower_lsp::async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Resolve the editor/document pairing for `id`
    async fn resolve_document(&self, id: &DocumentId) -> Result<ResolvedDocument>;

    /// Editing capability of a resolved document, if it has one
    async fn resolve_editing_capability(
        &self,
        id: &DocumentId,
    ) -> Option<Arc<dyn EditingCapability>>;
}

/// Edit application and persistence of one resolved document
#[tower_lsp::async_trait]
pub trait EditingCapability: Send + Sync {
    /// Apply records, in order
    async fn apply_edits(&self, edits: &[EditRecord]) -> Result<()>;

    /// Revert records, in the order given
    async fn undo_edits(&self, edits: &[EditRecord]) -> Result<()>;

    async fn save(&self) -> Result<()>;

    async fn save_as(&self, target: &DocumentId) -> Result<()>;

    /// Subscribe the host to edits made on this document.
    ///
    /// The capability reports every user edit through `sink`. It must not report
    /// edits it performs on behalf of `apply_edits` or `undo_edits`.
    async fn on_did_edit(&self, sink: EditSink);
}

/// A resolved editor/document pairing
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDocument {
    pub id: DocumentId,
    pub view_type: String,
    /// Human readable title shown for the editor
    pub title: String,
}

impl ResolvedDocument {
    pub fn new(id: DocumentId, view_type: impl Into<String>) -> Self {
        let title = id
            .file_name()
            .map(|name| name.into_owned())
            .unwrap_or_else(|| id.as_str().to_string());
        Self {
            id,
            view_type: view_type.into(),
            title,
        }
    }
}

/// Handle through which an editing capability reports user edits.
///
/// Each reported edit is appended to the undo stack of the sink's document while
/// its editor is open. Edits reported after the editor closed are dropped.
#[derive(Clone)]
pub struct EditSink {
    id: DocumentId,
    log: SharedCommandLog,
    live: Arc<AtomicBool>,
}

impl EditSink {
    pub(crate) fn new(id: DocumentId, log: SharedCommandLog, live: Arc<AtomicBool>) -> Self {
        Self { id, log, live }
    }

    pub fn document(&self) -> &DocumentId {
        &self.id
    }

    /// Whether the editor this sink reports to is still open
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub async fn record(&self, edit: EditRecord) {
        if !self.is_live() {
            log::debug!("{}: dropping edit reported after close", self.id);
            return;
        }
        self.log.lock().await.record_edit(&self.id, edit);
    }
}

impl fmt::Debug for EditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditSink")
            .field("id", &self.id.as_str())
            .field("live", &self.is_live())
            .finish_non_exhaustive()
    }
}
