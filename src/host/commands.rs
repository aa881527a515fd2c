//! Command Dispatch
//!
//! Named commands with async handlers, executed by id.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use serde_json::Value;
use tokio::sync::RwLock;

/// Command id that saves the active document
pub const SAVE_COMMAND: &str = "workbench.action.files.save";

/// Command id that saves the active document under a new location
pub const SAVE_AS_COMMAND: &str = "workbench.action.files.saveAs";

/// Handler invoked when a registered command is executed
#[tower_lsp::async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, args: &[Value]) -> Result<()>;
}

/// Registry of executable commands.
///
/// Cloning yields another handle onto the same registry.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: Arc<RwLock<HashMap<String, Arc<dyn CommandHandler>>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `id`, replacing any previous handler
    pub async fn register(&self, id: &str, handler: Arc<dyn CommandHandler>) {
        let previous = self.handlers.write().await.insert(id.to_string(), handler);
        if previous.is_some() {
            log::debug!("Replaced handler for command '{}'", id);
        }
    }

    pub async fn unregister(&self, id: &str) -> bool {
        self.handlers.write().await.remove(id).is_some()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.handlers.read().await.contains_key(id)
    }

    /// Execute the command registered under `id`.
    ///
    /// Executing an unregistered command is an error.
    pub async fn execute(&self, id: &str, args: &[Value]) -> Result<()> {
        let handler = match self.handlers.read().await.get(id) {
            Some(handler) => handler.clone(),
            None => bail!("command '{}' not found", id),
        };
        handler.execute(args).await
    }

    /// List registered command ids, sorted
    pub async fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.handlers.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
