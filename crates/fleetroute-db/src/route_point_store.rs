use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleetroute_common::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::{Database, column_timestamp, column_uuid, decode_text, now_timestamp};

/// Delivery progress of a single stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePointStatus {
    Pending,
    InRoute,
    Completed,
}

impl RoutePointStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InRoute => "in_route",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for RoutePointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutePointStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_route" => Ok(Self::InRoute),
            "completed" => Ok(Self::Completed),
            other => Err(Error::Database(format!("unknown route point status: {other}"))),
        }
    }
}

/// A stop on a route, created from a purchase order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub id: Uuid,
    pub purchase_order_id: String,
    pub route_id: Uuid,
    pub status: RoutePointStatus,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to attach a purchase order to a route as a new stop.
#[derive(Debug, Clone, Deserialize)]
pub struct AddPurchaseOrder {
    pub route_id: Uuid,
    pub purchase_order_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: String,
}

impl AddPurchaseOrder {
    pub fn validate(&self) -> Result<()> {
        if self.purchase_order_id.trim().is_empty() {
            return Err(Error::InvalidInput("purchase_order_id cannot be empty".into()));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::InvalidInput(format!(
                "latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::InvalidInput(format!(
                "longitude {} is outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

const ROUTE_POINT_COLUMNS: &str = "id, purchase_order_id, route_id, status, latitude, longitude, \
                                   address, created_at, updated_at";

pub struct RoutePointStore {
    db: Arc<Database>,
}

impl RoutePointStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Add a pending stop to an existing route.
    pub fn add_purchase_order(&self, order: AddPurchaseOrder) -> Result<RoutePoint> {
        order.validate()?;
        let id = Uuid::new_v4();

        let conn = self.db.connection()?;
        if !route_exists(&conn, &order.route_id)
            .map_err(|e| Error::Database(format!("failed to look up route: {e}")))?
        {
            return Err(Error::not_found("route", order.route_id));
        }

        conn.execute(
            "INSERT INTO route_point (id, purchase_order_id, route_id, status, latitude,
                                      longitude, address, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                id.to_string(),
                order.purchase_order_id.trim(),
                order.route_id.to_string(),
                RoutePointStatus::Pending.as_str(),
                order.latitude,
                order.longitude,
                order.address,
                now_timestamp(),
            ],
        )
        .map_err(|e| Error::Database(format!("failed to create route point: {e}")))?;

        fetch_route_point(&conn, &id)
            .map_err(|e| Error::Database(format!("failed to read route point: {e}")))?
            .ok_or_else(|| Error::not_found("route point", id))
    }

    pub fn get(&self, id: Uuid) -> Result<Option<RoutePoint>> {
        let conn = self.db.connection()?;
        fetch_route_point(&conn, &id)
            .map_err(|e| Error::Database(format!("failed to read route point: {e}")))
    }

    pub fn list(&self) -> Result<Vec<RoutePoint>> {
        let conn = self.db.connection()?;
        query_route_points(
            &conn,
            &format!("SELECT {ROUTE_POINT_COLUMNS} FROM route_point ORDER BY created_at ASC, id ASC"),
            [],
        )
        .map_err(|e| Error::Database(format!("failed to query route points: {e}")))
    }

    pub fn list_for_route(&self, route_id: Uuid) -> Result<Vec<RoutePoint>> {
        let conn = self.db.connection()?;
        fetch_points_for_route(&conn, &route_id)
            .map_err(|e| Error::Database(format!("failed to query route points: {e}")))
    }
}

pub(crate) fn fetch_points_for_route(
    conn: &Connection,
    route_id: &Uuid,
) -> rusqlite::Result<Vec<RoutePoint>> {
    query_route_points(
        conn,
        &format!(
            "SELECT {ROUTE_POINT_COLUMNS} FROM route_point
             WHERE route_id = ?1
             ORDER BY created_at ASC, id ASC"
        ),
        params![route_id.to_string()],
    )
}

fn query_route_points<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> rusqlite::Result<Vec<RoutePoint>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map_route_point)?;
    rows.collect()
}

fn fetch_route_point(conn: &Connection, id: &Uuid) -> rusqlite::Result<Option<RoutePoint>> {
    conn.query_row(
        &format!("SELECT {ROUTE_POINT_COLUMNS} FROM route_point WHERE id = ?1"),
        params![id.to_string()],
        map_route_point,
    )
    .optional()
}

fn route_exists(conn: &Connection, id: &Uuid) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM route WHERE id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )
}

fn map_route_point(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoutePoint> {
    Ok(RoutePoint {
        id: column_uuid(row, 0)?,
        purchase_order_id: row.get(1)?,
        route_id: column_uuid(row, 2)?,
        status: decode_text(3, row.get(3)?, RoutePointStatus::from_str)?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
        address: row.get(6)?,
        created_at: column_timestamp(row, 7)?,
        updated_at: column_timestamp(row, 8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{migrated_db, seed_route};

    fn order(route_id: Uuid, po: &str) -> AddPurchaseOrder {
        AddPurchaseOrder {
            route_id,
            purchase_order_id: po.to_string(),
            latitude: 37.7749,
            longitude: -122.4194,
            address: "123 Test Point".to_string(),
        }
    }

    #[test]
    fn add_purchase_order_creates_pending_point() {
        let db = migrated_db();
        let route_id = seed_route(&db);
        let store = RoutePointStore::new(db);

        let point = store.add_purchase_order(order(route_id, "PO12345")).unwrap();
        assert_eq!(point.status, RoutePointStatus::Pending);
        assert_eq!(point.route_id, route_id);
        assert_eq!(point.purchase_order_id, "PO12345");
        assert_eq!(store.get(point.id).unwrap(), Some(point));
    }

    #[test]
    fn unknown_route_is_not_found() {
        let store = RoutePointStore::new(migrated_db());
        let err = store
            .add_purchase_order(order(Uuid::new_v4(), "PO1"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn coordinates_are_range_checked() {
        let db = migrated_db();
        let route_id = seed_route(&db);
        let store = RoutePointStore::new(db);

        let mut bad = order(route_id, "PO1");
        bad.latitude = 91.0;
        assert!(matches!(store.add_purchase_order(bad), Err(Error::InvalidInput(_))));

        let mut bad = order(route_id, "PO1");
        bad.longitude = -180.5;
        assert!(matches!(store.add_purchase_order(bad), Err(Error::InvalidInput(_))));

        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn list_for_route_filters_by_route() {
        let db = migrated_db();
        let first = seed_route(&db);
        let second = seed_route(&db);
        let store = RoutePointStore::new(db);

        store.add_purchase_order(order(first, "PO1")).unwrap();
        store.add_purchase_order(order(first, "PO2")).unwrap();
        store.add_purchase_order(order(second, "PO3")).unwrap();

        assert_eq!(store.list().unwrap().len(), 3);
        let points = store.list_for_route(first).unwrap();
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.route_id == first));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            RoutePointStatus::Pending,
            RoutePointStatus::InRoute,
            RoutePointStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<RoutePointStatus>().unwrap(), status);
        }
        assert!("lost".parse::<RoutePointStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&RoutePointStatus::InRoute).unwrap(),
            r#""in_route""#
        );
    }
}
