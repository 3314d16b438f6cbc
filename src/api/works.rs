use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentTeacher, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::models::Work;
use crate::db::types::{FormAccessMode, WorkKind};
use crate::repositories;
use crate::schemas::grading::{
    CorrectedGradeResponse, EvaluateFilesRequest, GradeWorkRequest, GradingSummaryResponse,
    UploadPointsRequest,
};
use crate::schemas::submission::{
    FileSubmissionRequest, FileSubmissionResponse, SessionRecordRequest, SessionResponse,
};
use crate::schemas::work::{WorkCreate, WorkResponse, WorkUpdate};
use crate::services::grade_scale::{self, GradeScale};
use crate::services::grading;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_work))
        .route("/:work_id", get(get_work).patch(update_work))
        .route("/:work_id/grade", post(grade_work))
        .route("/:work_id/files", post(submit_files))
        .route("/:work_id/sessions", post(record_session))
        .route("/:work_id/students/:student_id/points", post(upload_points))
        .route(
            "/:work_id/students/:student_id/files",
            get(get_student_files).post(evaluate_files),
        )
}

async fn load_work(state: &AppState, work_id: &str) -> Result<Work, ApiError> {
    repositories::works::find_by_id(state.db(), work_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load work"))?
        .ok_or_else(|| ApiError::NotFound(format!("work {work_id} not found")))
}

fn validate_kind_payload(payload: &WorkCreate) -> Result<(), ApiError> {
    match payload.kind {
        WorkKind::Form => {
            if payload.form_id.is_none() {
                return Err(ApiError::BadRequest("form works require form_id".to_string()));
            }
            if payload.form_access == Some(FormAccessMode::Wtime)
                && payload.time_access_seconds.is_none()
            {
                return Err(ApiError::BadRequest(
                    "wtime access requires time_access_seconds".to_string(),
                ));
            }
        }
        WorkKind::Files => {
            if payload.pattern_items.is_empty() {
                return Err(ApiError::BadRequest(
                    "files works require at least one pattern item".to_string(),
                ));
            }
        }
        WorkKind::InPerson => {
            if payload.session_blocks.is_empty() {
                return Err(ApiError::BadRequest(
                    "in-person works require at least one session block".to_string(),
                ));
            }
        }
    }

    Ok(())
}

async fn validate_program_reference(
    state: &AppState,
    payload: &WorkCreate,
) -> Result<(), ApiError> {
    if !payload.is_qualified {
        return Ok(());
    }

    let program_id = payload
        .grade_program_id
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("qualified works require grade_program_id".to_string()))?;

    let program = repositories::grade_programs::find_by_id(state.db(), program_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load grade program"))?
        .ok_or_else(|| ApiError::NotFound(format!("grade program {program_id} not found")))?;

    if program.is_accumulative {
        let entry_id = payload.program_entry_id.as_deref().ok_or_else(|| {
            ApiError::BadRequest("accumulative programs require program_entry_id".to_string())
        })?;

        repositories::grade_programs::find_entry(state.db(), &program.id, entry_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load program entry"))?
            .ok_or_else(|| {
                ApiError::NotFound(format!("entry {entry_id} not found on program {}", program.id))
            })?;
    } else if payload.program_entry_id.is_some() {
        return Err(ApiError::BadRequest(
            "program_entry_id only applies to accumulative programs".to_string(),
        ));
    }

    Ok(())
}

async fn create_work(
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<WorkCreate>,
) -> Result<(StatusCode, Json<WorkResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let date_start = to_primitive_utc(payload.date_start);
    let date_limit = to_primitive_utc(payload.date_limit);
    if date_limit <= date_start {
        return Err(ApiError::BadRequest("date_limit must be after date_start".to_string()));
    }

    validate_kind_payload(&payload)?;
    validate_program_reference(&state, &payload).await?;

    let item_ids: Vec<String> =
        payload.pattern_items.iter().map(|_| Uuid::new_v4().to_string()).collect();
    let block_ids: Vec<String> =
        payload.session_blocks.iter().map(|_| Uuid::new_v4().to_string()).collect();

    let pattern_items = payload
        .pattern_items
        .iter()
        .zip(&item_ids)
        .map(|(item, id)| repositories::works::CreatePatternItem {
            id,
            title: &item.title,
            description: item.description.as_deref(),
            points: item.points,
            order_index: item.order_index,
        })
        .collect();

    let session_blocks = payload
        .session_blocks
        .iter()
        .zip(&block_ids)
        .map(|(block, id)| repositories::works::CreateSessionBlock {
            id,
            block_date: to_primitive_utc(block.block_date),
            capacity: block.capacity,
        })
        .collect();

    let work = repositories::works::create(
        state.db(),
        repositories::works::CreateWork {
            id: &Uuid::new_v4().to_string(),
            module_id: &payload.module_id,
            title: &payload.title,
            description: payload.description.as_deref(),
            kind: payload.kind,
            is_qualified: payload.is_qualified,
            grade_program_id: payload.grade_program_id.as_deref(),
            program_entry_id: payload.program_entry_id.as_deref(),
            date_start,
            date_limit,
            form_id: payload.form_id.as_deref(),
            form_access: payload.form_access,
            time_access_seconds: payload.time_access_seconds,
            created_by: &user.id,
            created_at: primitive_now_utc(),
            pattern_items,
            session_blocks,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create work"))?;

    let response = work_response(&state, work).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn work_response(state: &AppState, work: Work) -> Result<WorkResponse, ApiError> {
    let pattern_items = repositories::works::list_pattern_items(state.db(), &work.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load pattern items"))?;
    let session_blocks = repositories::works::list_session_blocks(state.db(), &work.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load session blocks"))?;

    Ok(WorkResponse::from_models(work, pattern_items, session_blocks))
}

async fn get_work(
    Path(work_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<WorkResponse>, ApiError> {
    let work = load_work(&state, &work_id).await?;
    Ok(Json(work_response(&state, work).await?))
}

async fn update_work(
    Path(work_id): Path<String>,
    CurrentTeacher(_user): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<WorkUpdate>,
) -> Result<Json<WorkResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let work = load_work(&state, &work_id).await?;
    let now = primitive_now_utc();

    if work.is_revised {
        return Err(ApiError::Conflict(format!("work {work_id} is already graded")));
    }
    if now >= work.date_start {
        return Err(ApiError::Conflict(format!("work {work_id} has already started")));
    }

    let updated = repositories::works::update(
        state.db(),
        &work_id,
        repositories::works::UpdateWork {
            title: payload.title.as_deref(),
            description: payload.description.as_deref(),
            date_start: payload.date_start.map(to_primitive_utc),
            date_limit: payload.date_limit.map(to_primitive_utc),
            form_access: payload.form_access,
            time_access_seconds: payload.time_access_seconds,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update work"))?
    .ok_or_else(|| ApiError::NotFound(format!("work {work_id} not found")))?;

    if updated.date_limit <= updated.date_start {
        return Err(ApiError::BadRequest("date_limit must be after date_start".to_string()));
    }

    Ok(Json(work_response(&state, updated).await?))
}

async fn grade_work(
    Path(work_id): Path<String>,
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<GradeWorkRequest>,
) -> Result<Json<GradingSummaryResponse>, ApiError> {
    let summary = grading::grade_work(&state, &work_id, &user.id, payload.kind).await?;
    Ok(Json(GradingSummaryResponse::from_summary(summary)))
}

async fn upload_points(
    Path((work_id, student_id)): Path<(String, String)>,
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<UploadPointsRequest>,
) -> Result<Json<CorrectedGradeResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let grade = grading::upload_student_points(
        &state,
        &work_id,
        &student_id,
        &payload.question_id,
        payload.points,
        &user.id,
    )
    .await?;

    Ok(Json(CorrectedGradeResponse { work_id, student_id, grade }))
}

async fn evaluate_files(
    Path((work_id, student_id)): Path<(String, String)>,
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<EvaluateFilesRequest>,
) -> Result<Json<CorrectedGradeResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let evaluations: Vec<grading::FileEvaluationInput> = payload
        .evaluations
        .into_iter()
        .map(|entry| grading::FileEvaluationInput {
            pattern_item_id: entry.pattern_item_id,
            points: entry.points,
        })
        .collect();

    let grade = grading::evaluate_student_files(
        &state,
        &work_id,
        &student_id,
        &evaluations,
        &user.id,
        payload.reevaluate,
    )
    .await?;

    Ok(Json(CorrectedGradeResponse { work_id, student_id, grade }))
}

async fn submit_files(
    Path(work_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<FileSubmissionRequest>,
) -> Result<Json<FileSubmissionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let work = load_work(&state, &work_id).await?;
    if work.kind != WorkKind::Files {
        return Err(ApiError::BadRequest(format!("work {work_id} does not accept file uploads")));
    }
    if work.is_revised {
        return Err(ApiError::Conflict(format!("work {work_id} is already graded")));
    }

    let now = primitive_now_utc();
    if now < work.date_start {
        return Err(ApiError::Conflict(format!("work {work_id} has not started yet")));
    }
    if now > work.date_limit {
        return Err(ApiError::Conflict(format!("the deadline for work {work_id} has passed")));
    }

    let submission = repositories::files::upsert_submission(
        state.db(),
        &Uuid::new_v4().to_string(),
        &work_id,
        &user.id,
        &payload.files,
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to store file submission"))?;

    Ok(Json(FileSubmissionResponse::from_models(submission, Vec::new())))
}

async fn get_student_files(
    Path((work_id, student_id)): Path<(String, String)>,
    CurrentTeacher(_user): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<FileSubmissionResponse>, ApiError> {
    load_work(&state, &work_id).await?;

    let submission = repositories::files::find_submission(state.db(), &work_id, &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load file submission"))?
        .ok_or_else(|| {
            ApiError::NotFound(format!("student {student_id} has no submission for work {work_id}"))
        })?;

    let evaluations =
        repositories::files::list_evaluations_for_student(state.db(), &work_id, &student_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load file evaluations"))?;

    Ok(Json(FileSubmissionResponse::from_models(submission, evaluations)))
}

async fn record_session(
    Path(work_id): Path<String>,
    CurrentTeacher(_user): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<SessionRecordRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let work = load_work(&state, &work_id).await?;
    if work.kind != WorkKind::InPerson {
        return Err(ApiError::BadRequest(format!("work {work_id} has no in-person sessions")));
    }
    if work.is_revised {
        return Err(ApiError::Conflict(format!("work {work_id} is already graded")));
    }

    let scale = GradeScale::from_settings(state.settings().grading());
    if payload.pregrade > scale.max_grade() {
        return Err(ApiError::BadRequest(format!(
            "pregrade must not exceed {}",
            scale.max_grade()
        )));
    }

    if let Some(block_id) = payload.block_id.as_deref() {
        let blocks = repositories::works::list_session_blocks(state.db(), &work_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load session blocks"))?;
        if !blocks.iter().any(|block| block.id == block_id) {
            return Err(ApiError::NotFound(format!(
                "session block {block_id} not found on work {work_id}"
            )));
        }
    }

    let session = repositories::sessions::upsert(
        state.db(),
        repositories::sessions::UpsertSession {
            id: &Uuid::new_v4().to_string(),
            work_id: &work_id,
            student_id: &payload.student_id,
            block_id: payload.block_id.as_deref(),
            attended_on: payload.attended_on.map(to_primitive_utc),
            pregrade: grade_scale::encode_pregrade(payload.pregrade),
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record session"))?;

    let pregrade = scale.from_pregrade(session.pregrade);
    Ok(Json(SessionResponse::from_model(session, pregrade)))
}

