use clap::Parser;
use relaykit_config::ConfigLoader;
use std::path::PathBuf;
use std::sync::Arc;

use relaykit_cli::Commands;

#[derive(Parser)]
#[command(name = "relaykit")]
#[command(about = "Resilient calls, events and sagas between services", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON configuration file; RELAYKIT_* environment variables override it
    #[arg(long, global = true, value_name = "PATH")]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    relaykit_utils::tracing::init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.file {
        loader = loader.file(path);
    }
    let config = Arc::new(loader.load()?);

    cli.command.execute(config).await
}
