use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use fleetroute_db::{AddPurchaseOrder, RoutePoint};

use super::{found, parse_id};
use crate::error::ApiError;
use crate::state::SharedState;

pub async fn list_route_points(
    State(state): State<SharedState>,
) -> Result<Json<Vec<RoutePoint>>, ApiError> {
    Ok(Json(state.route_points.list()?))
}

pub async fn get_route_point(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RoutePoint>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(found(state.route_points.get(id)?, "route point", id)?))
}

pub async fn add_purchase_order(
    State(state): State<SharedState>,
    payload: Result<Json<AddPurchaseOrder>, JsonRejection>,
) -> Result<Json<RoutePoint>, ApiError> {
    let Json(order) = payload?;
    Ok(Json(state.route_points.add_purchase_order(order)?))
}
