//! Command Log
//!
//! Per-document undo/redo history. Records are opaque: the log only stores them
//! and hands them to a caller-supplied callback when they move between stacks.

use std::collections::HashMap;

use super::document::DocumentId;

/// Undo and redo stacks of a single document
#[derive(Debug, Clone)]
struct History<R> {
    undo: Vec<R>,
    redo: Vec<R>,
}

impl<R> Default for History<R> {
    fn default() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }
}

/// Two-stack undo/redo log keyed by document identity.
///
/// A record lives in at most one of the two stacks of its document. Undo or redo
/// on an empty (or never created) stack does nothing.
#[derive(Debug, Clone)]
pub struct CommandLog<R> {
    histories: HashMap<DocumentId, History<R>>,
}

impl<R> Default for CommandLog<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> CommandLog<R> {
    pub fn new() -> Self {
        Self {
            histories: HashMap::new(),
        }
    }

    /// Append a record to the undo stack of `id`
    pub fn record_edit(&mut self, id: &DocumentId, record: R) {
        let history = self.histories.entry(id.clone()).or_default();
        history.undo.push(record);
        log::trace!("{}: recorded edit, undo depth {}", id, history.undo.len());
    }

    /// Move the most recent record of `id` from the undo stack to the redo stack,
    /// handing it to `apply` on the way.
    ///
    /// Returns `false` when there was nothing to undo.
    pub fn undo<F>(&mut self, id: &DocumentId, apply: F) -> bool
    where
        F: FnOnce(&R),
    {
        let history = self.histories.entry(id.clone()).or_default();
        let Some(record) = history.undo.pop() else {
            log::trace!("{}: nothing to undo", id);
            return false;
        };
        apply(&record);
        history.redo.push(record);
        true
    }

    /// Move the most recent record of `id` from the redo stack back to the undo
    /// stack, handing it to `apply` on the way.
    ///
    /// Returns `false` when there was nothing to redo.
    pub fn redo<F>(&mut self, id: &DocumentId, apply: F) -> bool
    where
        F: FnOnce(&R),
    {
        let history = self.histories.entry(id.clone()).or_default();
        let Some(record) = history.redo.pop() else {
            log::trace!("{}: nothing to redo", id);
            return false;
        };
        apply(&record);
        history.undo.push(record);
        true
    }

    /// Drop both stacks of `id`
    pub fn clear(&mut self, id: &DocumentId) {
        if let Some(history) = self.histories.remove(id) {
            log::trace!(
                "{}: cleared history ({} undo, {} redo)",
                id,
                history.undo.len(),
                history.redo.len()
            );
        }
    }

    pub fn undo_stack(&self, id: &DocumentId) -> &[R] {
        self.histories
            .get(id)
            .map(|h| h.undo.as_slice())
            .unwrap_or(&[])
    }

    pub fn redo_stack(&self, id: &DocumentId) -> &[R] {
        self.histories
            .get(id)
            .map(|h| h.redo.as_slice())
            .unwrap_or(&[])
    }

    pub fn can_undo(&self, id: &DocumentId) -> bool {
        !self.undo_stack(id).is_empty()
    }

    pub fn can_redo(&self, id: &DocumentId) -> bool {
        !self.redo_stack(id).is_empty()
    }

    /// Documents that currently have a history (possibly empty)
    pub fn documents(&self) -> Vec<&DocumentId> {
        self.histories.keys().collect()
    }
}
