pub mod database;
pub mod driver_store;
pub mod ledger;
pub mod migrations;
pub mod route_point_store;
pub mod route_store;
pub mod vehicle_store;

pub use database::Database;
pub use driver_store::{Driver, DriverStore, NewDriver};
pub use ledger::MigrationRecord;
pub use migrations::{MigrationError, MigrationRunner, MigrationScript, RunReport, discover_scripts};
pub use route_point_store::{AddPurchaseOrder, RoutePoint, RoutePointStatus, RoutePointStore};
pub use route_store::{NewRoute, Route, RouteDetails, RouteStatus, RouteStore};
pub use vehicle_store::{NewVehicle, Vehicle, VehicleStore};


#[cfg(test)]
mod tests {
    use crate::ledger;
    use crate::test_support::{migrated_db, schema_dir};

    #[test]
    fn shipped_schema_applies_cleanly_and_is_idempotent() {
        let db = migrated_db();
        let report = db.migrate(&schema_dir()).unwrap();
        assert!(report.is_noop());

        let conn = db.connection().unwrap();
        let names = ledger::list_applied_names(&conn).unwrap();
        assert_eq!(
            names,
            vec![
                "001_create_vehicle.sql",
                "002_create_driver.sql",
                "003_create_route.sql",
                "004_create_route_point.sql",
            ]
        );
    }
}
