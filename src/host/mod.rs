//! Custom Editor Host
//!
//! Provider contracts, command dispatch and the service tying them to the core.

pub mod commands;
pub mod events;
pub mod memory;
pub mod provider;
pub mod selector;
pub mod service;

pub use commands::{CommandHandler, CommandRegistry, SAVE_AS_COMMAND, SAVE_COMMAND};
pub use events::EditorEvent;
pub use memory::{MemoryDocument, MemoryProvider};
pub use provider::{DocumentProvider, EditRecord, EditSink, EditingCapability, ResolvedDocument};
pub use service::{CustomEditorService, ResolvedEditor};
