use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentTeacher, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::program::{GradeProgramCreate, GradeProgramResponse};
use crate::services::grade_programs;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_program))
        .route("/:program_id", get(get_program))
}

async fn create_program(
    CurrentTeacher(_user): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<GradeProgramCreate>,
) -> Result<(StatusCode, Json<GradeProgramResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let sibling_sum =
        repositories::grade_programs::sum_percentage_for_module(state.db(), &payload.module_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to sum module programs"))?;

    let entry_percentages: Vec<f64> =
        payload.entries.iter().map(|entry| entry.percentage).collect();
    grade_programs::validate_percentages(sibling_sum, payload.percentage, &entry_percentages)?;

    let entry_ids: Vec<String> =
        payload.entries.iter().map(|_| Uuid::new_v4().to_string()).collect();
    let entries = payload
        .entries
        .iter()
        .zip(&entry_ids)
        .map(|(entry, id)| repositories::grade_programs::CreateProgramEntry {
            id,
            number: entry.number,
            percentage: entry.percentage,
        })
        .collect();

    let program = repositories::grade_programs::create(
        state.db(),
        repositories::grade_programs::CreateProgram {
            id: &Uuid::new_v4().to_string(),
            module_id: &payload.module_id,
            number: payload.number,
            percentage: payload.percentage,
            entries,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create grade program"))?;

    let entries = repositories::grade_programs::list_entries(state.db(), &program.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load program entries"))?;

    Ok((StatusCode::CREATED, Json(GradeProgramResponse::from_models(program, entries))))
}

async fn get_program(
    Path(program_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<GradeProgramResponse>, ApiError> {
    let program = repositories::grade_programs::find_by_id(state.db(), &program_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load grade program"))?
        .ok_or_else(|| ApiError::NotFound(format!("grade program {program_id} not found")))?;

    let entries = repositories::grade_programs::list_entries(state.db(), &program.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load program entries"))?;

    Ok(Json(GradeProgramResponse::from_models(program, entries)))
}
