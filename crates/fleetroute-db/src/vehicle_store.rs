use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleetroute_common::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::{Database, column_timestamp, column_uuid, now_timestamp};

/// A delivery vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub plate_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for registering a vehicle. A missing `id` is generated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewVehicle {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub plate_number: String,
}

pub struct VehicleStore {
    db: Arc<Database>,
}

impl VehicleStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, new: NewVehicle) -> Result<Vehicle> {
        let plate_number = validate_plate_number(&new.plate_number)?;
        let id = new.id.unwrap_or_else(Uuid::new_v4);
        let now = now_timestamp();

        let conn = self.db.connection()?;
        conn.execute(
            "INSERT INTO vehicle (id, plate_number, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![id.to_string(), plate_number, now],
        )
        .map_err(|e| Error::Database(format!("failed to create vehicle: {e}")))?;

        fetch_vehicle(&conn, &id)
            .map_err(|e| Error::Database(format!("failed to read vehicle: {e}")))?
            .ok_or_else(|| Error::not_found("vehicle", id))
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Vehicle>> {
        let conn = self.db.connection()?;
        fetch_vehicle(&conn, &id).map_err(|e| Error::Database(format!("failed to read vehicle: {e}")))
    }

    pub fn list(&self) -> Result<Vec<Vehicle>> {
        let conn = self.db.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, plate_number, created_at, updated_at
                 FROM vehicle
                 ORDER BY created_at ASC, id ASC",
            )
            .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], map_vehicle)
            .map_err(|e| Error::Database(format!("failed to query vehicles: {e}")))?;

        let mut vehicles = Vec::new();
        for row in rows {
            vehicles.push(
                row.map_err(|e| Error::Database(format!("failed to read vehicle row: {e}")))?,
            );
        }
        Ok(vehicles)
    }

    /// Overwrite the mutable fields of an existing vehicle.
    pub fn update(&self, vehicle: &Vehicle) -> Result<Vehicle> {
        let plate_number = validate_plate_number(&vehicle.plate_number)?;
        let conn = self.db.connection()?;
        let changed = conn
            .execute(
                "UPDATE vehicle SET plate_number = ?2, updated_at = ?3 WHERE id = ?1",
                params![vehicle.id.to_string(), plate_number, now_timestamp()],
            )
            .map_err(|e| Error::Database(format!("failed to update vehicle: {e}")))?;

        if changed == 0 {
            return Err(Error::not_found("vehicle", vehicle.id));
        }

        fetch_vehicle(&conn, &vehicle.id)
            .map_err(|e| Error::Database(format!("failed to read vehicle: {e}")))?
            .ok_or_else(|| Error::not_found("vehicle", vehicle.id))
    }
}

fn validate_plate_number(plate: &str) -> Result<&str> {
    let plate = plate.trim();
    if plate.is_empty() {
        return Err(Error::InvalidInput("plate_number cannot be empty".into()));
    }
    Ok(plate)
}

pub(crate) fn fetch_vehicle(conn: &Connection, id: &Uuid) -> rusqlite::Result<Option<Vehicle>> {
    conn.query_row(
        "SELECT id, plate_number, created_at, updated_at FROM vehicle WHERE id = ?1",
        params![id.to_string()],
        map_vehicle,
    )
    .optional()
}

fn map_vehicle(row: &rusqlite::Row<'_>) -> rusqlite::Result<Vehicle> {
    Ok(Vehicle {
        id: column_uuid(row, 0)?,
        plate_number: row.get(1)?,
        created_at: column_timestamp(row, 2)?,
        updated_at: column_timestamp(row, 3)?,
    })
}
