use std::sync::Arc;

use fleetroute_common::Result;
use fleetroute_config::AppConfig;
use fleetroute_db::{Database, DriverStore, RoutePointStore, RouteStore, VehicleStore, ledger};

/// Shared application state accessible from all request handlers.
pub struct AppState {
    pub config: AppConfig,
    pub db: Arc<Database>,
    pub vehicles: VehicleStore,
    pub drivers: DriverStore,
    pub routes: RouteStore,
    pub route_points: RoutePointStore,
}

impl AppState {
    /// Build the stores over an already-migrated database.
    pub fn new(config: AppConfig, db: Arc<Database>) -> Self {
        Self {
            config,
            vehicles: VehicleStore::new(db.clone()),
            drivers: DriverStore::new(db.clone()),
            routes: RouteStore::new(db.clone()),
            route_points: RoutePointStore::new(db.clone()),
            db,
        }
    }

    pub fn migrations_applied(&self) -> Result<usize> {
        let conn = self.db.connection()?;
        Ok(ledger::applied_count(&conn)?)
    }
}

pub type SharedState = Arc<AppState>;
