//! Session Runner
//!
//! Replays a session script against a fresh host and reports the final state.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::core::DocumentId;
use crate::host::{
    CommandRegistry, CustomEditorService, EditRecord, EditorEvent, MemoryDocument, MemoryProvider,
};
use crate::session::script::{SessionScript, Step};

/// Final state of one document touched by a session
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocumentReport {
    pub uri: DocumentId,
    pub view_type: String,
    pub open: bool,
    /// Edits applied to the document, oldest first
    pub content: Vec<EditRecord>,
    pub undo_stack: Vec<EditRecord>,
    pub redo_stack: Vec<EditRecord>,
    pub saves: usize,
    pub save_targets: Vec<DocumentId>,
}

/// Final state of a session
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionReport {
    pub active: Option<DocumentId>,
    pub documents: Vec<DocumentReport>,
    pub events: Vec<EditorEvent>,
}

/// A host session backed by in-memory providers
pub struct SessionRunner {
    service: CustomEditorService,
    commands: CommandRegistry,
    providers: Vec<Arc<MemoryProvider>>,
    default_view_type: Option<String>,
    events: broadcast::Receiver<EditorEvent>,
}

impl SessionRunner {
    /// Set up a host with the providers declared in `script`
    pub async fn new(script: &SessionScript, default_view_type: Option<String>) -> Result<Self> {
        let service = CustomEditorService::new();
        let commands = CommandRegistry::new();
        service.register_commands(&commands).await;
        let events = service.subscribe();

        let mut providers = Vec::new();
        for def in &script.providers {
            let mut provider = MemoryProvider::new(def.view_type.clone());
            for location in &def.read_only {
                provider = provider.read_only(DocumentId::parse(location)?);
            }
            let provider = Arc::new(provider);

            match &def.pattern {
                Some(pattern) => {
                    service
                        .register_provider_with_selector(&def.view_type, pattern, provider.clone())
                        .await?
                }
                None => service.register_provider(&def.view_type, provider.clone()).await,
            }
            providers.push(provider);
        }

        Ok(Self {
            service,
            commands,
            providers,
            default_view_type,
            events,
        })
    }

    pub fn service(&self) -> &CustomEditorService {
        &self.service
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Run `steps` in order, stopping at the first failing step
    pub async fn run(&self, steps: &[Step]) -> Result<()> {
        for (index, step) in steps.iter().enumerate() {
            log::debug!("Step {}: {}", index + 1, step.action());
            self.run_step(step)
                .await
                .with_context(|| format!("step {} ({}) failed", index + 1, step.action()))?;
        }
        Ok(())
    }

    pub async fn run_step(&self, step: &Step) -> Result<()> {
        match step {
            Step::Open { uri, view_type } => {
                let id = DocumentId::parse(uri)?;
                match view_type.as_ref().or(self.default_view_type.as_ref()) {
                    Some(view_type) => self.service.open_document(&id, view_type).await?,
                    None => self.service.open_with_default(&id).await?,
                };
            }
            Step::Edit { uri, edit } => {
                let id = DocumentId::parse(uri)?;
                if !self.service.is_open(&id).await {
                    log::debug!("{}: edit on a document that is not open, skipping", id);
                    return Ok(());
                }
                match self.subscribed_document(&id).await {
                    Some(document) => document.simulate_edit(edit.clone()).await,
                    None => self.service.record_edit(&id, edit.clone()).await,
                }
            }
            Step::Undo { uri } => self.service.undo(&DocumentId::parse(uri)?).await?,
            Step::Redo { uri } => self.service.redo(&DocumentId::parse(uri)?).await?,
            Step::Save { uri } => self.service.save(&DocumentId::parse(uri)?).await?,
            Step::SaveAs { uri, target } => {
                let id = DocumentId::parse(uri)?;
                let target = DocumentId::parse(target)?;
                self.service.save_as(&id, &target).await?;
            }
            Step::Close { uri } => {
                let id = DocumentId::parse(uri)?;
                if !self.service.close_document(&id).await {
                    log::debug!("{}: close without an open editor", id);
                }
            }
            Step::Activate { uri } => {
                let id = DocumentId::parse(uri)?;
                if !self.service.set_active(&id).await {
                    return Err(anyhow!("'{}' is not open", id));
                }
            }
            Step::Command { command, args } => self.commands.execute(command, args).await?,
        }
        Ok(())
    }

    /// Document of `id` that reports its edits to the host
    async fn subscribed_document(&self, id: &DocumentId) -> Option<Arc<MemoryDocument>> {
        for provider in &self.providers {
            if let Some(document) = provider.document(id).await {
                if document.is_subscribed().await {
                    return Some(document);
                }
            }
        }
        None
    }

    /// Collect the final state, consuming the events emitted so far
    pub async fn report(&mut self) -> SessionReport {
        let mut events = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    log::warn!("Event log lost {} events", skipped);
                }
                Err(_) => break,
            }
        }

        let mut documents = Vec::new();
        for provider in &self.providers {
            for document in provider.documents().await {
                let id = document.id().clone();
                documents.push(DocumentReport {
                    open: self.service.is_open(&id).await,
                    view_type: provider.view_type().to_string(),
                    content: document.content().await,
                    undo_stack: self.service.undo_stack(&id).await,
                    redo_stack: self.service.redo_stack(&id).await,
                    saves: document.snapshots().await.len(),
                    save_targets: document.save_targets().await,
                    uri: id,
                });
            }
        }

        SessionReport {
            active: self.service.active_document().await,
            documents,
            events,
        }
    }
}
