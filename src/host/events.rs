//! Editor lifecycle notifications.

use serde::Serialize;

use crate::core::DocumentId;

/// Broadcast by the host whenever an editor's lifecycle changes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EditorEvent {
    Opened {
        document: DocumentId,
        view_type: String,
    },
    Closed {
        document: DocumentId,
    },
    Saved {
        document: DocumentId,
        /// Set for save-as
        target: Option<DocumentId>,
    },
}

impl EditorEvent {
    pub fn document(&self) -> &DocumentId {
        match self {
            EditorEvent::Opened { document, .. }
            | EditorEvent::Closed { document }
            | EditorEvent::Saved { document, .. } => document,
        }
    }
}
