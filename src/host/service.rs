//! Custom Editor Service
//!
//! Wires provider registrations, document resolution, the command log and the
//! save commands together. One service instance is one host session: all
//! per-document state lives here and is dropped with it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};

use crate::core::{CommandLog, DocumentId, ResolutionRegistry};
use crate::host::commands::{CommandHandler, CommandRegistry, SAVE_AS_COMMAND, SAVE_COMMAND};
use crate::host::events::EditorEvent;
use crate::host::provider::{
    DocumentProvider, EditRecord, EditSink, EditingCapability, ResolvedDocument,
    SharedCommandLog,
};
use crate::host::selector::FileSelector;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A provider registered for one view type
struct Registration {
    view_type: String,
    selector: Option<FileSelector>,
    provider: Arc<dyn DocumentProvider>,
}

/// Outcome of a successful resolution: the document and its editing capability
#[derive(Clone)]
pub struct ResolvedEditor {
    pub document: ResolvedDocument,
    pub capability: Option<Arc<dyn EditingCapability>>,
    /// Shared with the edit sink handed to the capability; cleared on close
    live: Arc<AtomicBool>,
}

impl fmt::Debug for ResolvedEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedEditor")
            .field("document", &self.document)
            .field("editable", &self.capability.is_some())
            .field("live", &self.live.load(Ordering::SeqCst))
            .finish()
    }
}

/// Registration and resolution service for custom editors.
///
/// Cloning yields another handle onto the same session state.
#[derive(Clone)]
pub struct CustomEditorService {
    registrations: Arc<Mutex<Vec<Registration>>>,
    resolutions: Arc<ResolutionRegistry<ResolvedEditor>>,
    log: SharedCommandLog,
    editors: Arc<Mutex<HashMap<DocumentId, ResolvedEditor>>>,
    active: Arc<Mutex<Option<DocumentId>>>,
    events: broadcast::Sender<EditorEvent>,
}

impl Default for CustomEditorService {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomEditorService {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            registrations: Arc::new(Mutex::new(Vec::new())),
            resolutions: Arc::new(ResolutionRegistry::new()),
            log: Arc::new(Mutex::new(CommandLog::new())),
            editors: Arc::new(Mutex::new(HashMap::new())),
            active: Arc::new(Mutex::new(None)),
            events,
        }
    }

    /// Register `provider` for `view_type`, replacing an existing registration
    pub async fn register_provider(&self, view_type: &str, provider: Arc<dyn DocumentProvider>) {
        self.insert_registration(Registration {
            view_type: view_type.to_string(),
            selector: None,
            provider,
        })
        .await;
    }

    /// Register `provider` for `view_type`, selected by default for file names
    /// matching the glob `pattern`
    pub async fn register_provider_with_selector(
        &self,
        view_type: &str,
        pattern: &str,
        provider: Arc<dyn DocumentProvider>,
    ) -> Result<()> {
        let selector = FileSelector::new(pattern)?;
        self.insert_registration(Registration {
            view_type: view_type.to_string(),
            selector: Some(selector),
            provider,
        })
        .await;
        Ok(())
    }

    async fn insert_registration(&self, registration: Registration) {
        let mut registrations = self.registrations.lock().await;
        if let Some(existing) = registrations
            .iter_mut()
            .find(|r| r.view_type == registration.view_type)
        {
            log::debug!("Replacing provider for view type '{}'", registration.view_type);
            *existing = registration;
        } else {
            log::info!("Registered provider for view type '{}'", registration.view_type);
            registrations.push(registration);
        }
    }

    pub async fn unregister_provider(&self, view_type: &str) -> bool {
        let mut registrations = self.registrations.lock().await;
        let before = registrations.len();
        registrations.retain(|r| r.view_type != view_type);
        registrations.len() != before
    }

    /// Registered view types, in registration order
    pub async fn view_types(&self) -> Vec<String> {
        self.registrations
            .lock()
            .await
            .iter()
            .map(|r| r.view_type.clone())
            .collect()
    }

    /// Register the save and save-as commands against `commands`
    pub async fn register_commands(&self, commands: &CommandRegistry) {
        commands
            .register(SAVE_COMMAND, Arc::new(SaveCommand { service: self.clone() }))
            .await;
        commands
            .register(SAVE_AS_COMMAND, Arc::new(SaveAsCommand { service: self.clone() }))
            .await;
    }

    /// Listen to editor open/close/save notifications
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: EditorEvent) {
        if self.events.send(event).is_err() {
            log::trace!("No editor event listeners");
        }
    }

    /// Open `id` with the provider registered for `view_type`.
    ///
    /// Resolution is memoized: opening an identity again, or concurrently,
    /// returns the same resolution without asking the provider twice. Opening
    /// before a provider is registered for `view_type` is an error.
    pub async fn open_document(&self, id: &DocumentId, view_type: &str) -> Result<ResolvedEditor> {
        let provider = {
            let registrations = self.registrations.lock().await;
            match registrations.iter().find(|r| r.view_type == view_type) {
                Some(registration) => registration.provider.clone(),
                None => bail!(
                    "no custom editor provider registered for view type '{}'",
                    view_type
                ),
            }
        };
        self.open_with_provider(id, provider).await
    }

    /// Open `id` with the first provider whose selector matches its file name
    pub async fn open_with_default(&self, id: &DocumentId) -> Result<ResolvedEditor> {
        let provider = {
            let registrations = self.registrations.lock().await;
            registrations
                .iter()
                .find(|r| r.selector.as_ref().is_some_and(|s| s.matches(id)))
                .map(|r| r.provider.clone())
                .ok_or_else(|| anyhow!("no custom editor provider selects '{}'", id))?
        };
        self.open_with_provider(id, provider).await
    }

    async fn open_with_provider(
        &self,
        id: &DocumentId,
        provider: Arc<dyn DocumentProvider>,
    ) -> Result<ResolvedEditor> {
        let log = self.log.clone();
        let live = Arc::new(AtomicBool::new(true));
        let (ticket, outcome) = self
            .resolutions
            .resolve_with_ticket(id, || async move {
                let document = provider
                    .resolve_document(id)
                    .await
                    .with_context(|| format!("failed to resolve '{}'", id))?;
                let capability = provider.resolve_editing_capability(id).await;
                if let Some(capability) = &capability {
                    let sink = EditSink::new(id.clone(), log, live.clone());
                    capability.on_did_edit(sink).await;
                }
                Ok::<_, anyhow::Error>(ResolvedEditor {
                    document,
                    capability,
                    live,
                })
            })
            .await;
        let editor = outcome?;

        // Checked under the editors lock, which close_document holds while forgetting.
        let newly_opened = {
            let mut editors = self.editors.lock().await;
            if !self.resolutions.is_current(id, ticket).await {
                editor.live.store(false, Ordering::SeqCst);
                bail!("'{}' was closed while it was being opened", id);
            }
            if editors.contains_key(id) {
                false
            } else {
                editors.insert(id.clone(), editor.clone());
                *self.active.lock().await = Some(id.clone());
                true
            }
        };

        if newly_opened {
            log::info!("Opened '{}' ({})", id, editor.document.view_type);
            self.emit(EditorEvent::Opened {
                document: id.clone(),
                view_type: editor.document.view_type.clone(),
            });
        }

        Ok(editor)
    }

    /// Close the editor of `id` and forget its history and resolution.
    ///
    /// An open still resolving `id` fails instead of opening the editor, and
    /// edits reported through the closed editor's sink are dropped. Returns
    /// whether an editor was open.
    pub async fn close_document(&self, id: &DocumentId) -> bool {
        let removed = {
            let mut editors = self.editors.lock().await;
            let removed = editors.remove(id);
            self.resolutions.forget(id).await;
            removed
        };
        if let Some(editor) = &removed {
            editor.live.store(false, Ordering::SeqCst);
        }
        self.log.lock().await.clear(id);

        {
            let mut active = self.active.lock().await;
            if active.as_ref() == Some(id) {
                *active = None;
            }
        }

        if removed.is_none() {
            return false;
        }
        log::info!("Closed '{}'", id);
        self.emit(EditorEvent::Closed {
            document: id.clone(),
        });
        true
    }

    pub async fn is_open(&self, id: &DocumentId) -> bool {
        self.editors.lock().await.contains_key(id)
    }

    /// Open documents, sorted by location
    pub async fn open_documents(&self) -> Vec<DocumentId> {
        let mut ids: Vec<DocumentId> = self.editors.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Make `id` the target of the save commands. Only open documents can be active.
    pub async fn set_active(&self, id: &DocumentId) -> bool {
        if !self.is_open(id).await {
            return false;
        }
        *self.active.lock().await = Some(id.clone());
        true
    }

    pub async fn active_document(&self) -> Option<DocumentId> {
        self.active.lock().await.clone()
    }

    /// Append `edit` to the undo stack of `id`
    pub async fn record_edit(&self, id: &DocumentId, edit: EditRecord) {
        self.log.lock().await.record_edit(id, edit);
    }

    pub async fn undo_stack(&self, id: &DocumentId) -> Vec<EditRecord> {
        self.log.lock().await.undo_stack(id).to_vec()
    }

    pub async fn redo_stack(&self, id: &DocumentId) -> Vec<EditRecord> {
        self.log.lock().await.redo_stack(id).to_vec()
    }

    async fn capability(&self, id: &DocumentId) -> Option<Arc<dyn EditingCapability>> {
        self.editors
            .lock()
            .await
            .get(id)
            .and_then(|editor| editor.capability.clone())
    }

    /// Revert the most recent edit of `id` through its editing capability.
    ///
    /// Does nothing when the document has no editing capability or nothing to
    /// undo. The record moves to the redo stack before the capability is asked
    /// to revert it; a failure there is returned but not rolled back.
    pub async fn undo(&self, id: &DocumentId) -> Result<()> {
        let Some(capability) = self.capability(id).await else {
            log::debug!("{}: no editing capability, skipping undo", id);
            return Ok(());
        };

        let mut undone = None;
        self.log
            .lock()
            .await
            .undo(id, |edit| undone = Some(edit.clone()));

        match undone {
            Some(edit) => capability
                .undo_edits(std::slice::from_ref(&edit))
                .await
                .with_context(|| format!("failed to undo edit on '{}'", id)),
            None => Ok(()),
        }
    }

    /// Reapply the most recently undone edit of `id` through its editing capability.
    ///
    /// Mirrors [`CustomEditorService::undo`].
    pub async fn redo(&self, id: &DocumentId) -> Result<()> {
        let Some(capability) = self.capability(id).await else {
            log::debug!("{}: no editing capability, skipping redo", id);
            return Ok(());
        };

        let mut redone = None;
        self.log
            .lock()
            .await
            .redo(id, |edit| redone = Some(edit.clone()));

        match redone {
            Some(edit) => capability
                .apply_edits(std::slice::from_ref(&edit))
                .await
                .with_context(|| format!("failed to redo edit on '{}'", id)),
            None => Ok(()),
        }
    }

    pub async fn save(&self, id: &DocumentId) -> Result<()> {
        let Some(capability) = self.capability(id).await else {
            log::debug!("{}: no editing capability, skipping save", id);
            return Ok(());
        };
        capability
            .save()
            .await
            .with_context(|| format!("failed to save '{}'", id))?;
        self.emit(EditorEvent::Saved {
            document: id.clone(),
            target: None,
        });
        Ok(())
    }

    pub async fn save_as(&self, id: &DocumentId, target: &DocumentId) -> Result<()> {
        let Some(capability) = self.capability(id).await else {
            log::debug!("{}: no editing capability, skipping save as", id);
            return Ok(());
        };
        capability
            .save_as(target)
            .await
            .with_context(|| format!("failed to save '{}' as '{}'", id, target))?;
        self.emit(EditorEvent::Saved {
            document: id.clone(),
            target: Some(target.clone()),
        });
        Ok(())
    }

    /// Save the active document, if any
    pub async fn save_active(&self) -> Result<()> {
        match self.active_document().await {
            Some(id) => self.save(&id).await,
            None => {
                log::debug!("No active document to save");
                Ok(())
            }
        }
    }

    /// Save the active document under `target`, if there is an active document
    pub async fn save_active_as(&self, target: &DocumentId) -> Result<()> {
        match self.active_document().await {
            Some(id) => self.save_as(&id, target).await,
            None => {
                log::debug!("No active document to save as '{}'", target);
                Ok(())
            }
        }
    }
}

/// Handler behind the save command.
///
/// Command execution is fire-and-forget for the caller: save failures are
/// logged here rather than returned.
struct SaveCommand {
    service: CustomEditorService,
}

#[tower_lsp::async_trait]
impl CommandHandler for SaveCommand {
    async fn execute(&self, _args: &[Value]) -> Result<()> {
        if let Err(e) = self.service.save_active().await {
            log::warn!("Save failed: {:#}", e);
        }
        Ok(())
    }
}

/// Handler behind the save-as command. Expects the target location as first argument.
struct SaveAsCommand {
    service: CustomEditorService,
}

#[tower_lsp::async_trait]
impl CommandHandler for SaveAsCommand {
    async fn execute(&self, args: &[Value]) -> Result<()> {
        let target = match args.first().and_then(Value::as_str) {
            Some(location) => DocumentId::parse(location)?,
            None => bail!("{} expects a target location argument", SAVE_AS_COMMAND),
        };
        if let Err(e) = self.service.save_active_as(&target).await {
            log::warn!("Save as '{}' failed: {:#}", target, e);
        }
        Ok(())
    }
}
