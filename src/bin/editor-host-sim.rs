use anyhow::Result;
use custom_editor_host::{session, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::from_args_and_env()?;

    env_logger::Builder::new()
        .parse_filters(&config.log_level)
        .parse_default_env()
        .init();

    session::run(&config).await
}
