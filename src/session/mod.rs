//! Scripted Host Sessions
//!
//! Drive a host from a TOML script and print the resulting state as JSON.

pub mod runner;
pub mod script;

pub use runner::{DocumentReport, SessionReport, SessionRunner};
pub use script::{ProviderDef, SessionScript, Step};

use anyhow::Result;

use crate::Config;

/// Run the session script named by `config` and print its report to stdout
pub async fn run(config: &Config) -> Result<()> {
    let script = SessionScript::load(&config.script).await?;
    log::info!(
        "Running {:?}: {} providers, {} steps",
        config.script,
        script.providers.len(),
        script.steps.len()
    );

    let mut runner = SessionRunner::new(&script, config.default_view_type.clone()).await?;
    runner.run(&script.steps).await?;
    let report = runner.report().await;

    let output = if config.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", output);

    Ok(())
}
