use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleetroute_common::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::{Database, column_timestamp, column_uuid, decode_text, now_timestamp};
use crate::driver_store::{Driver, fetch_driver};
use crate::route_point_store::{RoutePoint, fetch_points_for_route};
use crate::vehicle_store::{Vehicle, fetch_vehicle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Pending,
    Started,
    Completed,
}

impl RouteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            other => Err(Error::Database(format!("unknown route status: {other}"))),
        }
    }
}

/// A route row as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: RouteStatus,
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A route together with its assigned vehicle, driver and stops.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteDetails {
    #[serde(flatten)]
    pub route: Route,
    pub vehicle: Vehicle,
    pub driver: Driver,
    pub route_points: Vec<RoutePoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRoute {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
}

const ROUTE_COLUMNS: &str =
    "id, name, description, status, vehicle_id, driver_id, created_at, updated_at";

pub struct RouteStore {
    db: Arc<Database>,
}

impl RouteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a pending route for an existing vehicle and driver.
    pub fn create(&self, new: NewRoute) -> Result<RouteDetails> {
        if new.name.trim().is_empty() {
            return Err(Error::InvalidInput("route name cannot be empty".into()));
        }

        let conn = self.db.connection()?;
        let vehicle_known = fetch_vehicle(&conn, &new.vehicle_id)
            .map_err(|e| Error::Database(format!("failed to look up vehicle: {e}")))?
            .is_some();
        if !vehicle_known {
            return Err(Error::not_found("vehicle", new.vehicle_id));
        }
        let driver_known = fetch_driver(&conn, &new.driver_id)
            .map_err(|e| Error::Database(format!("failed to look up driver: {e}")))?
            .is_some();
        if !driver_known {
            return Err(Error::not_found("driver", new.driver_id));
        }

        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO route (id, name, description, status, vehicle_id, driver_id,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                id.to_string(),
                new.name.trim(),
                new.description,
                RouteStatus::Pending.as_str(),
                new.vehicle_id.to_string(),
                new.driver_id.to_string(),
                now_timestamp(),
            ],
        )
        .map_err(|e| Error::Database(format!("failed to create route: {e}")))?;

        load_details(&conn, &id)?.ok_or_else(|| Error::not_found("route", id))
    }

    pub fn get(&self, id: Uuid) -> Result<Option<RouteDetails>> {
        let conn = self.db.connection()?;
        load_details(&conn, &id)
    }

    pub fn list(&self) -> Result<Vec<RouteDetails>> {
        let conn = self.db.connection()?;
        let routes = {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {ROUTE_COLUMNS} FROM route ORDER BY created_at ASC, id ASC"
                ))
                .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;
            let rows = stmt
                .query_map([], map_route)
                .map_err(|e| Error::Database(format!("failed to query routes: {e}")))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::Database(format!("failed to read route row: {e}")))?
        };

        routes
            .into_iter()
            .map(|route| attach_relations(&conn, route))
            .collect()
    }
}

fn load_details(conn: &Connection, id: &Uuid) -> Result<Option<RouteDetails>> {
    let route = conn
        .query_row(
            &format!("SELECT {ROUTE_COLUMNS} FROM route WHERE id = ?1"),
            params![id.to_string()],
            map_route,
        )
        .optional()
        .map_err(|e| Error::Database(format!("failed to read route: {e}")))?;

    route.map(|route| attach_relations(conn, route)).transpose()
}

/// A route whose vehicle or driver row is gone is corrupt, not missing.
fn attach_relations(conn: &Connection, route: Route) -> Result<RouteDetails> {
    let vehicle = fetch_vehicle(conn, &route.vehicle_id)
        .map_err(|e| Error::Database(format!("failed to read vehicle: {e}")))?
        .ok_or_else(|| {
            Error::Database(format!(
                "route {} references missing vehicle {}",
                route.id, route.vehicle_id
            ))
        })?;
    let driver = fetch_driver(conn, &route.driver_id)
        .map_err(|e| Error::Database(format!("failed to read driver: {e}")))?
        .ok_or_else(|| {
            Error::Database(format!(
                "route {} references missing driver {}",
                route.id, route.driver_id
            ))
        })?;
    let route_points = fetch_points_for_route(conn, &route.id)
        .map_err(|e| Error::Database(format!("failed to read route points: {e}")))?;

    Ok(RouteDetails {
        route,
        vehicle,
        driver,
        route_points,
    })
}

fn map_route(row: &rusqlite::Row<'_>) -> rusqlite::Result<Route> {
    Ok(Route {
        id: column_uuid(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        status: decode_text(3, row.get(3)?, RouteStatus::from_str)?,
        vehicle_id: column_uuid(row, 4)?,
        driver_id: column_uuid(row, 5)?,
        created_at: column_timestamp(row, 6)?,
        updated_at: column_timestamp(row, 7)?,
    })
}
