use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use fleetroute_db::{Driver, NewDriver};

use super::{found, parse_id};
use crate::error::ApiError;
use crate::state::SharedState;

pub async fn list_drivers(State(state): State<SharedState>) -> Result<Json<Vec<Driver>>, ApiError> {
    Ok(Json(state.drivers.list()?))
}

pub async fn get_driver(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Driver>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(found(state.drivers.get(id)?, "driver", id)?))
}

pub async fn create_driver(
    State(state): State<SharedState>,
    payload: Result<Json<NewDriver>, JsonRejection>,
) -> Result<(StatusCode, Json<Driver>), ApiError> {
    let Json(new) = payload?;
    let driver = state.drivers.create(new)?;
    Ok((StatusCode::CREATED, Json(driver)))
}
