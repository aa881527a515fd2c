//! Core Business Logic
//!
//! Document identity, per-document command history and resolution memoization.

pub mod document;
pub mod history;
pub mod resolution;

pub use document::DocumentId;
pub use history::CommandLog;
pub use resolution::{ResolutionRegistry, Ticket};
