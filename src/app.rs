//! Process bootstrap: opening the configured store, serving HTTP, running migrations.

use miette::Diagnostic;
use sqlx::migrate::{MigrateError, Migrator};
use std::fs::File;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::application::WalletService;
use crate::config::{Direction, MigrateArgs, ServeArgs, StoreKind};
use crate::domain::account::Account;
use crate::domain::ports::{AccountStore, SharedAccountStore};
use crate::error::{SeedError, StorageError};
use crate::infrastructure::in_memory::InMemoryAccountStore;
use crate::infrastructure::postgres::PostgresAccountStore;
use crate::interfaces::csv::account_reader::AccountReader;
use crate::interfaces::http::{AppState, router};

#[derive(Error, Diagnostic, Debug)]
pub enum StartupError {
    #[error("no database URL configured")]
    #[diagnostic(
        code(wallet::config::database_url),
        help("pass --database-url or set DATABASE_URL (a .env file is read as well)")
    )]
    MissingDatabaseUrl,

    #[error("the rocksdb store needs a database directory")]
    #[diagnostic(code(wallet::config::db_path), help("pass --db-path or set WALLET_DB_PATH"))]
    MissingDbPath,

    #[error("the rocksdb store is not compiled in")]
    #[diagnostic(
        code(wallet::config::rocksdb),
        help("rebuild with `--features storage-rocksdb`")
    )]
    RocksDbUnavailable,

    #[error("--seed-file is only supported by the memory and rocksdb stores")]
    #[diagnostic(
        code(wallet::config::seed),
        help("provision postgres accounts with SQL instead")
    )]
    SeedUnsupported,

    #[error("account store unavailable")]
    #[diagnostic(code(wallet::storage))]
    Storage(#[from] StorageError),

    #[error("failed to load accounts from {}", path.display())]
    #[diagnostic(code(wallet::seed))]
    Seed {
        path: PathBuf,
        #[source]
        source: SeedError,
    },

    #[error("migration failed")]
    #[diagnostic(code(wallet::migrate))]
    Migrate(#[from] MigrateError),

    #[error("I/O error")]
    #[diagnostic(code(wallet::io))]
    Io(#[from] std::io::Error),
}

/// Opens the account store selected by `args`, provisioning seed accounts if asked to.
pub async fn open_store(args: &ServeArgs) -> Result<SharedAccountStore, StartupError> {
    match args.store {
        StoreKind::Postgres => {
            if args.seed_file.is_some() {
                return Err(StartupError::SeedUnsupported);
            }
            let url = args
                .db
                .database_url
                .as_deref()
                .ok_or(StartupError::MissingDatabaseUrl)?;
            let store = PostgresAccountStore::connect(url, args.db.db_max_conn).await?;
            info!(max_connections = args.db.db_max_conn, "connected to postgres");
            Ok(Arc::new(store))
        }
        StoreKind::Memory => {
            let store = InMemoryAccountStore::new();
            if let Some(path) = &args.seed_file {
                let accounts = load_seed(path)?;
                info!(accounts = accounts.len(), "seeding in-memory store");
                for account in accounts {
                    store.insert(account.id, account.balance).await;
                }
            } else {
                warn!("in-memory store started without --seed-file; every account lookup will miss");
            }
            Ok(Arc::new(store))
        }
        StoreKind::Rocksdb => open_rocksdb(args),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_rocksdb(args: &ServeArgs) -> Result<SharedAccountStore, StartupError> {
    use crate::infrastructure::rocksdb::RocksDBStore;

    let path = args.db_path.as_ref().ok_or(StartupError::MissingDbPath)?;
    let store = RocksDBStore::open(path)?;
    if let Some(seed) = &args.seed_file {
        let accounts = load_seed(seed)?;
        info!(accounts = accounts.len(), "seeding rocksdb store");
        for account in accounts {
            store.insert(account.id, account.balance)?;
        }
    }
    Ok(Arc::new(store))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_rocksdb(args: &ServeArgs) -> Result<SharedAccountStore, StartupError> {
    if args.db_path.is_none() {
        return Err(StartupError::MissingDbPath);
    }
    Err(StartupError::RocksDbUnavailable)
}

fn load_seed(path: &Path) -> Result<Vec<Account>, StartupError> {
    let seed_error = |source: SeedError| StartupError::Seed {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|e| seed_error(SeedError::Csv(e.into())))?;
    AccountReader::new(file)
        .accounts()
        .collect::<Result<Vec<_>, _>>()
        .map_err(seed_error)
}

/// Runs the HTTP service until Ctrl-C or SIGTERM, then closes the store.
pub async fn serve(args: ServeArgs) -> Result<(), StartupError> {
    let store = open_store(&args).await?;
    let state = AppState::new(WalletService::new(store.clone()), args.request_timeout());

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, args.port)).await?;
    info!(addr = %listener.local_addr()?, "server starting");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("server stopped");
    Ok(())
}

/// Applies (`up`) or reverts (`down`) every migration in `args.migrations_dir`.
pub async fn migrate(args: MigrateArgs) -> Result<(), StartupError> {
    let url = args
        .db
        .database_url
        .as_deref()
        .ok_or(StartupError::MissingDatabaseUrl)?;
    let store = PostgresAccountStore::connect(url, 1).await?;
    let migrator = Migrator::new(args.migrations_dir.as_path()).await?;

    match args.direction {
        Direction::Up => {
            info!(dir = %args.migrations_dir.display(), "migrating up");
            migrator.run(store.pool()).await?;
        }
        Direction::Down => {
            info!(dir = %args.migrations_dir.display(), "rolling back");
            migrator.undo(store.pool(), 0).await?;
        }
    }

    store.close().await;
    info!("migrations done");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
