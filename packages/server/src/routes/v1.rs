use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers::anti_cheat::*;
use crate::handlers::matches::*;
use crate::handlers::submissions::*;
use crate::handlers::users::*;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_user))
        .routes(routes!(get_profile))
        .routes(routes!(list_online_players))
        .routes(routes!(create_match))
        .routes(routes!(get_match))
        .routes(routes!(cancel_match))
        .routes(routes!(get_submission))
        .routes(routes!(list_languages))
        .routes(routes!(report_violation))
}
