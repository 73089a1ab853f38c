use clap::{Parser, Subcommand};

use crate::commands::{create_user::CreateUserCmd, import::ImportCmd};

#[derive(Parser)]
#[command(
    version,
    about,
    long_about = "CLI for yamdb - administration tasks working directly with the database."
)]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    CreateUser(CreateUserCmd),
    Import(ImportCmd),
}

impl crate::commands::Executor for Command {
    async fn run(self) -> anyhow::Result<()> {
        match self {
            Command::CreateUser(cmd) => cmd.run().await,
            Command::Import(cmd) => cmd.run().await,
        }
    }
}
