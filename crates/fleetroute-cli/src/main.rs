mod banner;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fleetroute_config::{AppConfig, ConfigLoader, LogConfig};
use fleetroute_db::{Database, MigrationRunner, ledger};
use fleetroute_gateway::GatewayServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fleetroute", version, about = "Logistics back-office server")]
struct Cli {
    /// Path to a YAML or TOML config file.
    #[arg(short, long, global = true, env = "FLEETROUTE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations, then serve the HTTP API (default).
    Serve,
    /// Apply pending migrations and exit.
    Migrate {
        /// List pending scripts without applying them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Show applied and pending migrations.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = ConfigLoader::load(cli.config.as_deref()).context("failed to load config")?;
    init_tracing(&config.log);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate { dry_run } => migrate(&config, dry_run),
        Command::Status => status(&config),
    }
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    // No listener is bound until every pending migration has committed.
    let server = GatewayServer::bootstrap(config.clone()).context("startup aborted")?;
    banner::print_banner(&config, server.migration_report());

    server.run().await?;
    Ok(())
}

fn migrate(config: &AppConfig, dry_run: bool) -> Result<()> {
    let dir = &config.database.migrations_dir;
    let db = Database::open(&config.database.path)?;

    if dry_run {
        let mut conn = db.connection()?;
        let pending = MigrationRunner::new(&mut conn).plan(dir)?;
        if pending.is_empty() {
            println!("No pending migrations.");
        }
        for script in pending {
            println!("pending  {}", script.name);
        }
        return Ok(());
    }

    let report = db
        .migrate(dir)
        .with_context(|| format!("failed to run migrations from {}", dir.display()))?;
    for name in &report.applied {
        println!("applied  {name}");
    }
    info!(
        "migrations complete: {} applied, {} skipped",
        report.applied.len(),
        report.skipped.len()
    );
    if report.is_noop() {
        println!("No pending migrations.");
    }
    Ok(())
}

fn status(config: &AppConfig) -> Result<()> {
    let db = Database::open(&config.database.path)?;
    let mut conn = db.connection()?;

    let records = if ledger::ledger_exists(&conn)? {
        ledger::list_records(&conn)?
    } else {
        Vec::new()
    };
    for record in &records {
        println!(
            "applied  {}  {}",
            record.applied_at.format("%Y-%m-%d %H:%M:%S"),
            record.name
        );
    }

    let pending = MigrationRunner::new(&mut conn).plan(&config.database.migrations_dir)?;
    for script in &pending {
        println!("pending  {}", script.name);
    }
    println!("{} applied, {} pending", records.len(), pending.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["fleetroute"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn migrate_accepts_dry_run_and_global_config() {
        let cli =
            Cli::try_parse_from(["fleetroute", "migrate", "--dry-run", "--config", "fleet.yml"])
                .unwrap();
        assert!(matches!(cli.command, Some(Command::Migrate { dry_run: true })));
        assert_eq!(cli.config, Some(PathBuf::from("fleet.yml")));
    }

    #[test]
    fn migrate_then_dry_run_reports_nothing_pending() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("migrations");
        std::fs::create_dir_all(&scripts).unwrap();
        std::fs::write(scripts.join("001_a.sql"), "CREATE TABLE a (id INTEGER);").unwrap();

        let mut config = AppConfig::default();
        config.database.path = dir.path().join("data.sqlite");
        config.database.migrations_dir = scripts.clone();

        migrate(&config, true).unwrap();
        migrate(&config, false).unwrap();
        status(&config).unwrap();

        let db = Database::open(&config.database.path).unwrap();
        let mut conn = db.connection().unwrap();
        assert!(MigrationRunner::new(&mut conn).plan(&scripts).unwrap().is_empty());
    }

    #[test]
    fn migrate_fails_on_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.database.path = dir.path().join("data.sqlite");
        config.database.migrations_dir = dir.path().join("absent");

        let err = migrate(&config, false).unwrap_err();
        assert!(format!("{err:#}").contains("migrations directory does not exist"));
    }
}
