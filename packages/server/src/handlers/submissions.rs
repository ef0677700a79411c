use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::judging::persist::test_case_results;
use crate::models::submission::*;
use crate::state::AppState;
use crate::store;

#[utoipa::path(
    get,
    path = "/submissions/{id}",
    tag = "Submissions",
    operation_id = "getSubmission",
    summary = "Get a submission with per-test-case results",
    description = "Only the author may read a submission.",
    params(("id" = i32, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission", body = SubmissionResponse),
        (status = 401, description = "Missing caller identity (TOKEN_MISSING)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Unknown submission (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(caller = auth_user.user_id))]
pub async fn get_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let submission = store::submissions::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))?;
    auth_user.require_self(submission.user_id)?;

    let results = test_case_results(&state.db, id).await?;
    Ok(Json(SubmissionResponse::new(submission, results)))
}

#[utoipa::path(
    get,
    path = "/languages",
    tag = "Submissions",
    operation_id = "listLanguages",
    summary = "Languages accepted for submissions",
    responses(
        (status = 200, description = "Supported languages, sorted by key", body = Vec<LanguageResponse>),
    ),
)]
pub async fn list_languages(State(state): State<AppState>) -> Json<Vec<LanguageResponse>> {
    let mut languages: Vec<LanguageResponse> = state
        .pipeline
        .execution()
        .languages
        .iter()
        .map(|(key, id)| LanguageResponse {
            key: key.clone(),
            language_id: *id,
        })
        .collect();
    languages.sort_by(|a, b| a.key.cmp(&b.key));
    Json(languages)
}
