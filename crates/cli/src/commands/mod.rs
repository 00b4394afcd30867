use clap::Subcommand;

pub mod config;
pub mod demo;

use self::demo::DemoCommands;

#[derive(Subcommand)]
pub enum Commands {
    /// Print the effective configuration as JSON
    Config,

    /// Drive the building blocks against simulated dependencies
    Demo {
        #[command(subcommand)]
        command: DemoCommands,
    },
}
