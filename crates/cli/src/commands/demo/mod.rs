use clap::Subcommand;
use relaykit_config::RelayConfig;
use std::sync::Arc;

pub mod breaker;
pub mod saga;
pub mod simulated;

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Call a dependency that fails a number of times and watch its breaker
    Breaker {
        /// Calls the simulated dependency fails before recovering
        #[arg(long, default_value = "8")]
        failures: u32,

        /// Number of client invocations to make
        #[arg(long, default_value = "12")]
        calls: u32,
    },

    /// Run the order saga, optionally failing one of its steps
    Saga {
        /// Step whose dependency is down
        #[arg(long, value_parser = saga::STEP_NAMES)]
        fail_at: Option<String>,
    },
}

impl DemoCommands {
    pub async fn execute(self, config: Arc<RelayConfig>) -> anyhow::Result<()> {
        match self {
            DemoCommands::Breaker { failures, calls } => {
                breaker::execute(&config, failures, calls).await
            }
            DemoCommands::Saga { fail_at } => saga::execute(&config, fail_at.as_deref()).await,
        }
    }
}
