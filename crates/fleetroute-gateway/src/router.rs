use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::handlers::{driver, route, route_point, vehicle};
use crate::state::SharedState;

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/vehicles", get(vehicle::list_vehicles).post(vehicle::create_vehicle))
        .route("/vehicles/{id}", get(vehicle::get_vehicle))
        .route("/car-drivers", get(driver::list_drivers).post(driver::create_driver))
        .route("/car-drivers/{id}", get(driver::get_driver))
        .route("/routes", get(route::list_routes).post(route::create_route))
        .route("/routes/{id}", get(route::get_route))
        .route("/route-points", get(route_point::list_route_points))
        .route("/route-points/{id}", get(route_point::get_route_point))
        .route(
            "/route-points/add-purchase-order",
            post(route_point::add_purchase_order),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn status(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!({
        "status": "running",
        "migrations_applied": state.migrations_applied()?,
    })))
}
