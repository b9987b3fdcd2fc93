use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use fleetroute_db::{NewRoute, RouteDetails};
use tracing::info;

use super::{found, parse_id};
use crate::error::ApiError;
use crate::state::SharedState;

pub async fn list_routes(
    State(state): State<SharedState>,
) -> Result<Json<Vec<RouteDetails>>, ApiError> {
    Ok(Json(state.routes.list()?))
}

pub async fn get_route(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RouteDetails>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(found(state.routes.get(id)?, "route", id)?))
}

pub async fn create_route(
    State(state): State<SharedState>,
    payload: Result<Json<NewRoute>, JsonRejection>,
) -> Result<(StatusCode, Json<RouteDetails>), ApiError> {
    let Json(new) = payload?;
    let details = state.routes.create(new)?;
    info!(
        "route created: id={}, vehicle={}, driver={}",
        details.route.id, details.vehicle.id, details.driver.id
    );
    Ok((StatusCode::CREATED, Json(details)))
}
