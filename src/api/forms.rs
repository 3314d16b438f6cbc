use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentTeacher, CurrentUser};
use crate::core::state::AppState;
use crate::db::models::Work;
use crate::repositories;
use crate::schemas::form::{
    AnswerResponse, FormAccessResponse, StudentFormStatusResponse, SubmitAnswerRequest,
};
use crate::services::form_access::{self, SubmitAnswerInput};

/// Form lifecycle, nested under `/works/:work_id/form`. Everything except
/// `/status` is student-facing.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/access", get(access))
        .route("/answers", get(list_answers).post(submit_answer))
        .route("/finish", post(finish))
        .route("/status", get(status))
}

async fn load_work(state: &AppState, work_id: &str) -> Result<Work, ApiError> {
    repositories::works::find_by_id(state.db(), work_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load work"))?
        .ok_or_else(|| ApiError::NotFound(format!("work {work_id} not found")))
}

async fn access(
    Path(work_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<FormAccessResponse>, ApiError> {
    let work = load_work(&state, &work_id).await?;
    let view = form_access::compute_access(&state, &work, &user.id).await?;
    Ok(Json(FormAccessResponse::from_view(view)))
}

async fn submit_answer(
    Path(work_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let work = load_work(&state, &work_id).await?;
    let answer = form_access::submit_answer(
        &state,
        &work,
        &user.id,
        SubmitAnswerInput {
            question_id: &payload.question_id,
            selected_index: payload.selected_index,
            response: payload.response.as_deref(),
        },
    )
    .await?;

    Ok(Json(AnswerResponse::from_model(answer)))
}

async fn list_answers(
    Path(work_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AnswerResponse>>, ApiError> {
    let work = load_work(&state, &work_id).await?;

    let answers = repositories::answers::list_for_student(state.db(), &work.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load answers"))?;

    Ok(Json(answers.into_iter().map(AnswerResponse::from_model).collect()))
}

async fn finish(
    Path(work_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<FormAccessResponse>, ApiError> {
    let work = load_work(&state, &work_id).await?;
    let view = form_access::finish_form(&state, &work, &user.id).await?;
    Ok(Json(FormAccessResponse::from_view(view)))
}

async fn status(
    Path(work_id): Path<String>,
    CurrentTeacher(_user): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentFormStatusResponse>>, ApiError> {
    let work = load_work(&state, &work_id).await?;

    let students = state
        .roster()
        .students_for_module(&work.module_id)
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

    let statuses = form_access::status_for_roster(&state, &work, &students).await?;

    Ok(Json(statuses.into_iter().map(StudentFormStatusResponse::from_status).collect()))
}
