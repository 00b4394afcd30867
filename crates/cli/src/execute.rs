use crate::commands::Commands;
use relaykit_config::RelayConfig;
use std::sync::Arc;

impl Commands {
    pub async fn execute(self, config: Arc<RelayConfig>) -> anyhow::Result<()> {
        match self {
            Commands::Config => crate::commands::config::execute(&config),
            Commands::Demo { command } => command.execute(config).await,
        }
    }
}
