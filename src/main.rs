use clap::Parser;
use miette::Result;
use wallet_service::app;
use wallet_service::config::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Flags fall back to the environment, so .env has to be loaded before parsing.
    let _ = dotenvy::dotenv();
    wallet_service::telemetry::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => app::serve(args).await?,
        Command::Migrate(args) => app::migrate(args).await?,
    }

    Ok(())
}
