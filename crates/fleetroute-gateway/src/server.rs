use std::sync::Arc;

use fleetroute_common::{Error, Result};
use fleetroute_config::AppConfig;
use fleetroute_db::{Database, RunReport};
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// The HTTP server. Construct with [`GatewayServer::bootstrap`] so the schema
/// is current before the first request is accepted.
pub struct GatewayServer {
    config: AppConfig,
    db: Arc<Database>,
    migration_report: RunReport,
}

impl GatewayServer {
    /// Open the configured database and apply pending migrations.
    ///
    /// Fails instead of degrading: the server must never run against a
    /// partially migrated schema.
    pub fn bootstrap(config: AppConfig) -> Result<Self> {
        let db = Database::open(&config.database.path)?;
        let report = db.migrate(&config.database.migrations_dir)?;
        info!(
            "migrations complete: {} applied, {} already present",
            report.applied.len(),
            report.skipped.len()
        );
        Ok(Self {
            config,
            db: Arc::new(db),
            migration_report: report,
        })
    }

    /// What [`GatewayServer::bootstrap`] applied and skipped.
    pub fn migration_report(&self) -> &RunReport {
        &self.migration_report
    }

    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = TcpListener::bind(&addr).await?;
        info!("FleetRoute gateway listening on {}", addr);
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let state = Arc::new(AppState::new(self.config, self.db));
        let app = build_router(state);

        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Gateway(format!("server error: {e}")))?;

        Ok(())
    }
}
