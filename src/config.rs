//! Command-line and environment configuration.
//!
//! Every flag can also come from the environment (a `.env` file is loaded
//! before parsing), so `DATABASE_URL=... wallet-service serve` works as-is.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP wallet service
    Serve(ServeArgs),
    /// Apply or revert the database schema migrations
    Migrate(MigrateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Maximum number of pooled connections
    #[arg(long, env = "DB_MAX_CONN", default_value_t = 25)]
    pub db_max_conn: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Postgres,
    Memory,
    Rocksdb,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    /// Port to listen on; a leading ':' is accepted (":8080")
    #[arg(long, env = "SERVER_PORT", default_value = "8080", value_parser = parse_port)]
    pub port: u16,

    /// Upper bound on a single balance or withdraw call
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 5000)]
    pub request_timeout_ms: u64,

    /// Account store backend
    #[arg(long, env = "WALLET_STORE", value_enum, default_value_t = StoreKind::Postgres)]
    pub store: StoreKind,

    /// Database directory for the rocksdb store
    #[arg(long, env = "WALLET_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// CSV file (`id,balance`) provisioning accounts in the memory or rocksdb store
    #[arg(long)]
    pub seed_file: Option<PathBuf>,
}

impl ServeArgs {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Args, Debug, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    /// Migration direction
    #[arg(long, value_enum, default_value_t = Direction::Up)]
    pub direction: Direction,

    /// Directory holding the `*.up.sql` / `*.down.sql` files
    #[arg(long, default_value = "migrations")]
    pub migrations_dir: PathBuf,
}

fn parse_port(value: &str) -> Result<u16, String> {
    value
        .trim_start_matches(':')
        .parse()
        .map_err(|e| format!("invalid port '{value}': {e}"))
}
