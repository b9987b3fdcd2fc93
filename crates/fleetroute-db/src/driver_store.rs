use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleetroute_common::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::{Database, column_timestamp, column_uuid, now_timestamp};

/// A driver who can be assigned to routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub address: String,
    pub identification: String,
    pub license_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewDriver {
    pub id: Option<Uuid>,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub address: String,
    pub identification: String,
    pub license_number: String,
}

const DRIVER_COLUMNS: &str = "id, name, phone_number, email, address, identification, \
                              license_number, created_at, updated_at";

pub struct DriverStore {
    db: Arc<Database>,
}

impl DriverStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, new: NewDriver) -> Result<Driver> {
        validate_name(&new.name)?;
        let id = new.id.unwrap_or_else(Uuid::new_v4);

        let conn = self.db.connection()?;
        conn.execute(
            "INSERT INTO driver (id, name, phone_number, email, address, identification,
                                 license_number, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                id.to_string(),
                new.name.trim(),
                new.phone_number,
                new.email,
                new.address,
                new.identification,
                new.license_number,
                now_timestamp(),
            ],
        )
        .map_err(|e| Error::Database(format!("failed to create driver: {e}")))?;

        fetch_driver(&conn, &id)
            .map_err(|e| Error::Database(format!("failed to read driver: {e}")))?
            .ok_or_else(|| Error::not_found("driver", id))
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Driver>> {
        let conn = self.db.connection()?;
        fetch_driver(&conn, &id).map_err(|e| Error::Database(format!("failed to read driver: {e}")))
    }

    pub fn list(&self) -> Result<Vec<Driver>> {
        let conn = self.db.connection()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {DRIVER_COLUMNS} FROM driver ORDER BY created_at ASC, id ASC"
            ))
            .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], map_driver)
            .map_err(|e| Error::Database(format!("failed to query drivers: {e}")))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(format!("failed to read driver row: {e}")))
    }

    pub fn update(&self, driver: &Driver) -> Result<Driver> {
        validate_name(&driver.name)?;
        let conn = self.db.connection()?;
        let changed = conn
            .execute(
                "UPDATE driver
                 SET name = ?2, phone_number = ?3, email = ?4, address = ?5,
                     identification = ?6, license_number = ?7, updated_at = ?8
                 WHERE id = ?1",
                params![
                    driver.id.to_string(),
                    driver.name.trim(),
                    driver.phone_number,
                    driver.email,
                    driver.address,
                    driver.identification,
                    driver.license_number,
                    now_timestamp(),
                ],
            )
            .map_err(|e| Error::Database(format!("failed to update driver: {e}")))?;

        if changed == 0 {
            return Err(Error::not_found("driver", driver.id));
        }

        fetch_driver(&conn, &driver.id)
            .map_err(|e| Error::Database(format!("failed to read driver: {e}")))?
            .ok_or_else(|| Error::not_found("driver", driver.id))
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput("driver name cannot be empty".into()));
    }
    Ok(())
}

pub(crate) fn fetch_driver(conn: &Connection, id: &Uuid) -> rusqlite::Result<Option<Driver>> {
    conn.query_row(
        &format!("SELECT {DRIVER_COLUMNS} FROM driver WHERE id = ?1"),
        params![id.to_string()],
        map_driver,
    )
    .optional()
}

fn map_driver(row: &rusqlite::Row<'_>) -> rusqlite::Result<Driver> {
    Ok(Driver {
        id: column_uuid(row, 0)?,
        name: row.get(1)?,
        phone_number: row.get(2)?,
        email: row.get(3)?,
        address: row.get(4)?,
        identification: row.get(5)?,
        license_number: row.get(6)?,
        created_at: column_timestamp(row, 7)?,
        updated_at: column_timestamp(row, 8)?,
    })
}
