//! Custom Editor Host
//!
//! A simulated host for custom editor providers, for exercising a provider
//! without a real host environment.
//!
//! This library provides:
//! - Per-document undo/redo command logs
//! - Memoized document resolution
//! - Provider registration, save/save-as commands and lifecycle events
//! - Scripted sessions driven from TOML

pub mod config;
pub mod core;
pub mod host;
pub mod session;

// Re-exports for clean public API
pub use config::Config;
pub use crate::core::{CommandLog, DocumentId, ResolutionRegistry};
pub use host::{CustomEditorService, DocumentProvider, EditRecord, EditingCapability};
