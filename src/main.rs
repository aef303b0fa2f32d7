use anyhow::{Context, Result};
use clap::Parser;
use device_registry::cli::{Cli, Commands, ServeArgs};
use device_registry::config::{resolve_db_path, ConfigOverrides, ServerConfig};
use device_registry::db::{create_pool, init_schema};
use device_registry::logging::{
    cleanup_old_logs, init_logging, log_file_from_env, retention_days_from_env, ApplicationMode,
    LoggingConfig,
};
use device_registry::server::RegistryServer;
use device_registry::store::{DeviceStore, SqliteDeviceStore};
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut log_config = match cli.command {
        // Keep stdout clean for the JSON listing unless asked otherwise
        Commands::List { .. } if cli.verbose == 0 && !cli.json => {
            LoggingConfig::for_mode(ApplicationMode::Cli)
        },
        _ => LoggingConfig::from_args(cli.quiet, cli.verbose > 0, cli.json),
    };

    let log_file = match cli.command {
        Commands::Serve(_) => log_file_from_env(),
        Commands::List { .. } => None,
    };
    if let Some(path) = &log_file {
        log_config = LoggingConfig::for_mode(ApplicationMode::Server);
        log_config.json_format = cli.json;
        log_config.file_output = Some(path.clone());
    }

    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Some(dir) = log_file.as_deref().and_then(|p| p.parent()) {
        match cleanup_old_logs(dir, retention_days_from_env()) {
            Ok(0) => {},
            Ok(count) => tracing::info!("Cleaned up {} old log file(s)", count),
            Err(e) => tracing::warn!("Failed to cleanup old logs: {}", e),
        }
    }

    if let Err(e) = run(cli.command).await {
        tracing::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Serve(args) => serve(args).await,
        Commands::List { db } => list(db).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = ServerConfig::resolve(ConfigOverrides {
        host: args.host,
        port: args.port,
        db_path: args.db,
        static_dir: args.static_dir,
    });

    RegistryServer::new(config).run().await
}

async fn list(db: Option<PathBuf>) -> Result<()> {
    let db_path = resolve_db_path(db);
    let pool = create_pool(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    init_schema(&pool).await?;

    let devices = SqliteDeviceStore::new(pool.clone()).list().await?;
    println!("{}", serde_json::to_string_pretty(&devices)?);

    pool.close().await;
    Ok(())
}
