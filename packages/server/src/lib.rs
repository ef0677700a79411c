pub mod anti_cheat;
pub mod config;
pub mod coordinator;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod fanout;
pub mod handlers;
pub mod judging;
pub mod lobby;
pub mod models;
pub mod presence;
pub mod rating;
pub mod routes;
pub mod seed;
pub mod state;
pub mod store;
pub mod utils;

use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Code Duel Arena API",
        version = "1.0.0",
        description = "Head-to-head programming matches with live judging and ratings. \
            Callers are identified by the `X-User-Id` header set by the gateway."
    ),
    tags(
        (name = "Users", description = "Player registration, rating profiles and online players"),
        (name = "Matches", description = "Match creation and lifecycle"),
        (name = "Submissions", description = "Judged submissions and supported languages"),
        (name = "Anti-Cheat", description = "Editor violation reports"),
        (name = "Health", description = "Liveness"),
    ),
)]
struct ApiDoc;

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age));

    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(routes::health_routes())
        .nest("/api", routes::api_routes())
        .split_for_parts();

    router
        .merge(routes::ws_routes())
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(cors)
}
