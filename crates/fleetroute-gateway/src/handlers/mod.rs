pub mod driver;
pub mod route;
pub mod route_point;
pub mod vehicle;

use fleetroute_common::Error;
use uuid::Uuid;

use crate::error::ApiError;

/// Parse a path id, rejecting malformed UUIDs with 400 rather than 404.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|e| ApiError(Error::InvalidInput(format!("invalid id {raw:?}: {e}"))))
}

pub(crate) fn found<T>(value: Option<T>, kind: &str, id: Uuid) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError(Error::not_found(kind, id)))
}
