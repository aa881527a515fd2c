//! Session Script Schema
//!
//! TOML description of the providers to register and the steps to run.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// Root script structure (matches TOML)
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SessionScript {
    #[serde(default)]
    pub providers: Vec<ProviderDef>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// In-memory provider registration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProviderDef {
    pub view_type: String,
    /// Filename glob selecting this provider for `open` steps without a view type
    pub pattern: Option<String>,
    /// Documents resolved without an editing capability
    #[serde(default)]
    pub read_only: Vec<String>,
}

/// One scripted host interaction
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Open {
        uri: String,
        view_type: Option<String>,
    },
    /// User edit made in the document's editor
    Edit { uri: String, edit: Value },
    Undo { uri: String },
    Redo { uri: String },
    Save { uri: String },
    SaveAs { uri: String, target: String },
    Close { uri: String },
    Activate { uri: String },
    Command {
        command: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::Open { .. } => "open",
            Step::Edit { .. } => "edit",
            Step::Undo { .. } => "undo",
            Step::Redo { .. } => "redo",
            Step::Save { .. } => "save",
            Step::SaveAs { .. } => "save_as",
            Step::Close { .. } => "close",
            Step::Activate { .. } => "activate",
            Step::Command { .. } => "command",
        }
    }
}

impl SessionScript {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid session script")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read session script {:?}", path))?;
        Self::from_toml_str(&content).with_context(|| format!("in {:?}", path))
    }
}
