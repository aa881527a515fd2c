//! Resolution Registry
//!
//! Memoizes document resolution so that each identity is resolved at most once.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{Mutex, OnceCell};

use super::document::DocumentId;

/// Outcome shared between every caller of one resolution
type Outcome<T> = std::result::Result<T, String>;

/// Identifies one registry entry, so a caller can tell whether the resolution it
/// awaited was forgotten in the meantime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug)]
struct Entry<T> {
    ticket: Ticket,
    cell: Arc<OnceCell<Outcome<T>>>,
}

/// Per-document resolution handles.
///
/// The first `resolve` for an identity runs the resolver; every later or
/// concurrent call for the same identity awaits that same completion and sees
/// the same outcome, failures included, until the entry is forgotten.
#[derive(Debug)]
pub struct ResolutionRegistry<T> {
    entries: Mutex<HashMap<DocumentId, Entry<T>>>,
    next_ticket: AtomicU64,
}

impl<T> Default for ResolutionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResolutionRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Resolve `id`, running `resolver` only if no resolution exists yet
    pub async fn resolve<F, Fut>(&self, id: &DocumentId, resolver: F) -> Result<T>
    where
        T: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.resolve_with_ticket(id, resolver).await.1
    }

    /// Like [`ResolutionRegistry::resolve`], also returning the ticket of the
    /// entry that was awaited. Check it with [`ResolutionRegistry::is_current`].
    pub async fn resolve_with_ticket<F, Fut>(
        &self,
        id: &DocumentId,
        resolver: F,
    ) -> (Ticket, Result<T>)
    where
        T: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // The map lock is released before awaiting so other documents are not held up.
        let (ticket, cell) = {
            let mut entries = self.entries.lock().await;
            let entry = entries.entry(id.clone()).or_insert_with(|| Entry {
                ticket: Ticket(self.next_ticket.fetch_add(1, Ordering::Relaxed)),
                cell: Arc::new(OnceCell::new()),
            });
            (entry.ticket, entry.cell.clone())
        };

        let outcome = cell
            .get_or_init(|| async {
                log::debug!("{}: resolving", id);
                resolver().await.map_err(|e| format!("{:#}", e))
            })
            .await;

        (ticket, outcome.clone().map_err(anyhow::Error::msg))
    }

    /// Whether `ticket` still names the registry entry of `id`
    pub async fn is_current(&self, id: &DocumentId, ticket: Ticket) -> bool {
        self.entries
            .lock()
            .await
            .get(id)
            .is_some_and(|entry| entry.ticket == ticket)
    }

    /// Drop the resolution entry of `id`.
    ///
    /// Callers already awaiting an in-flight resolution still receive its outcome,
    /// but their ticket is no longer current; the next `resolve` starts over.
    pub async fn forget(&self, id: &DocumentId) -> bool {
        self.entries.lock().await.remove(id).is_some()
    }

    /// Whether a resolution for `id` has been requested
    pub async fn contains(&self, id: &DocumentId) -> bool {
        self.entries.lock().await.contains_key(id)
    }

    /// Whether a resolution for `id` has completed (successfully or not)
    pub async fn is_resolved(&self, id: &DocumentId) -> bool {
        self.entries
            .lock()
            .await
            .get(id)
            .is_some_and(|entry| entry.cell.initialized())
    }
}
