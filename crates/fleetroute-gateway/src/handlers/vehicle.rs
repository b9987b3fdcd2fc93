use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use fleetroute_db::{NewVehicle, Vehicle};

use super::{found, parse_id};
use crate::error::ApiError;
use crate::state::SharedState;

pub async fn list_vehicles(State(state): State<SharedState>) -> Result<Json<Vec<Vehicle>>, ApiError> {
    Ok(Json(state.vehicles.list()?))
}

pub async fn get_vehicle(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vehicle>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(found(state.vehicles.get(id)?, "vehicle", id)?))
}

pub async fn create_vehicle(
    State(state): State<SharedState>,
    payload: Result<Json<NewVehicle>, JsonRejection>,
) -> Result<(StatusCode, Json<Vehicle>), ApiError> {
    let Json(new) = payload?;
    let vehicle = state.vehicles.create(new)?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}
