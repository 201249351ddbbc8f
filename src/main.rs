use std::error::Error;
use std::io;
use std::process;
use std::sync::Arc;

use escrow_market::{run, Config, FileStorage};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run_app().await {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

async fn run_app() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = Config::from_env()?;
    let storage = FileStorage::open(&config.data_dir)?;
    tracing::info!(data_dir = %config.data_dir.display(), "using file storage");

    run(Arc::new(storage), &config, io::stdout()).await?;
    Ok(())
}
