mod v1;

use axum::Router;
use axum::routing::get;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::handlers::health::*;
use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/v1", v1::routes())
}

pub fn health_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(health))
}

/// WebSocket upgrades are not part of the OpenAPI document.
pub fn ws_routes() -> Router<AppState> {
    Router::new()
        .route("/ws/matches/{id}", get(handlers::ws::match_socket))
        .route("/ws/dashboard", get(handlers::ws::dashboard_socket))
}
