use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::anti_cheat::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/anti-cheat/logs",
    tag = "Anti-Cheat",
    operation_id = "reportViolation",
    summary = "Report an editor violation",
    description = "Logs a violation for the caller. When the caller's count for a kind reaches its threshold in an active match, the match ends as CHEATING and the caller is penalized.",
    request_body = ViolationReportRequest,
    responses(
        (status = 200, description = "Violation recorded", body = ViolationReportResponse),
        (status = 400, description = "Not a participant (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Missing caller identity (TOKEN_MISSING)", body = ErrorBody),
        (status = 404, description = "Unknown match (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user, payload), fields(caller = auth_user.user_id, match_id = payload.match_id))]
pub async fn report_violation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ViolationReportRequest>,
) -> Result<Json<ViolationReportResponse>, AppError> {
    let outcome = state
        .anti_cheat
        .record(
            payload.match_id,
            auth_user.user_id,
            payload.kind,
            payload.details,
        )
        .await?;
    Ok(Json(ViolationReportResponse { outcome }))
}
