use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Answer, FormAccess, Work};
use crate::db::types::{FormAccessMode, FormAccessStatus, QuestionKind, WorkKind};
use crate::repositories;
use crate::services::bounded::run_bounded;
use crate::services::error::DomainError;
use crate::services::form_timing;
use crate::services::roster::Student;

#[derive(Debug, Clone)]
pub(crate) struct FormAccessView {
    pub(crate) access: FormAccess,
    pub(crate) deadline: PrimitiveDateTime,
    pub(crate) can_submit: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct StudentFormStatus {
    pub(crate) student_id: String,
    pub(crate) full_name: String,
    pub(crate) status: Option<FormAccessStatus>,
    pub(crate) opened_at: Option<PrimitiveDateTime>,
    pub(crate) deadline: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone)]
pub(crate) struct SubmitAnswerInput<'a> {
    pub(crate) question_id: &'a str,
    pub(crate) selected_index: Option<i32>,
    pub(crate) response: Option<&'a str>,
}

fn access_mode(work: &Work) -> FormAccessMode {
    work.form_access.unwrap_or(FormAccessMode::Default)
}

fn require_form_work(work: &Work) -> Result<&str, DomainError> {
    if work.kind != WorkKind::Form {
        return Err(DomainError::Validation(format!(
            "work {} is of kind {}, not a form",
            work.id,
            work.kind.as_str()
        )));
    }
    work.form_id
        .as_deref()
        .ok_or_else(|| DomainError::Validation(format!("work {} has no form attached", work.id)))
}

/// Resolves (and lazily creates) the student's access row for a form work.
///
/// The row is created with `opened` only while the work deadline has not
/// passed; a first request after the deadline is rejected instead of creating
/// a late access. An `opened` row whose window has expired is flipped to
/// `finished` here, so expiry is observed on the next read.
pub(crate) async fn compute_access(
    state: &AppState,
    work: &Work,
    student_id: &str,
) -> Result<FormAccessView, DomainError> {
    require_form_work(work)?;

    let now = primitive_now_utc();
    if now < work.date_start {
        return Err(DomainError::Conflict(format!("work {} has not started yet", work.id)));
    }

    let existing = repositories::form_access::find(state.db(), &work.id, student_id)
        .await
        .map_err(|err| DomainError::db(err, "Failed to fetch form access"))?;

    let mut access = match existing {
        Some(access) => access,
        None => {
            if now > work.date_limit {
                return Err(DomainError::Conflict(
                    "form was never accessed and the deadline has passed".to_string(),
                ));
            }
            repositories::form_access::create_opened(state.db(), &work.id, student_id, now)
                .await
                .map_err(|err| DomainError::db(err, "Failed to open form access"))?
        }
    };

    let deadline = form_timing::effective_deadline(
        access_mode(work),
        access.opened_at,
        work.time_access_seconds,
        work.date_limit,
    );

    if access.status == FormAccessStatus::Opened && now >= deadline {
        let finished =
            repositories::form_access::mark_finished(state.db(), &work.id, student_id, now)
                .await
                .map_err(|err| DomainError::db(err, "Failed to expire form access"))?;
        if finished {
            access.status = FormAccessStatus::Finished;
            access.finished_at = Some(now);
        }
    }

    let can_submit = form_timing::can_submit(access.status, now, deadline);

    Ok(FormAccessView { access, deadline, can_submit })
}

/// Writes or updates a student's answer while the form window is open.
pub(crate) async fn submit_answer(
    state: &AppState,
    work: &Work,
    student_id: &str,
    input: SubmitAnswerInput<'_>,
) -> Result<Answer, DomainError> {
    let form_id = require_form_work(work)?;
    let now = primitive_now_utc();

    let access = repositories::form_access::find(state.db(), &work.id, student_id)
        .await
        .map_err(|err| DomainError::db(err, "Failed to fetch form access"))?
        .ok_or_else(|| {
            DomainError::Conflict("form must be opened before submitting answers".to_string())
        })?;

    let deadline = form_timing::effective_deadline(
        access_mode(work),
        access.opened_at,
        work.time_access_seconds,
        work.date_limit,
    );

    if !form_timing::can_submit(access.status, now, deadline) {
        return Err(DomainError::Conflict("form is closed for submissions".to_string()));
    }

    let question = repositories::questions::find_by_id(state.db(), input.question_id)
        .await
        .map_err(|err| DomainError::db(err, "Failed to fetch question"))?
        .filter(|question| question.form_id == form_id)
        .ok_or_else(|| {
            DomainError::NotFound(format!("question {} not found on this form", input.question_id))
        })?;

    match question.kind {
        QuestionKind::Alternatives | QuestionKind::Choice => {
            if input.selected_index.is_none() {
                return Err(DomainError::Validation(
                    "choice questions require selected_index".to_string(),
                ));
            }
        }
        QuestionKind::Free => {
            if input.response.map(str::trim).filter(|text| !text.is_empty()).is_none() {
                return Err(DomainError::Validation(
                    "free-response questions require a response".to_string(),
                ));
            }
        }
    }

    repositories::answers::upsert(
        state.db(),
        repositories::answers::UpsertAnswer {
            id: &Uuid::new_v4().to_string(),
            work_id: &work.id,
            student_id,
            question_id: input.question_id,
            selected_index: input.selected_index,
            response: input.response,
            updated_at: now,
        },
    )
    .await
    .map_err(|err| DomainError::db(err, "Failed to store answer"))
}

/// Explicit `opened -> finished` transition. Partial answers are fine; the
/// transition only needs the window (plus grace) to still be open.
pub(crate) async fn finish_form(
    state: &AppState,
    work: &Work,
    student_id: &str,
) -> Result<FormAccessView, DomainError> {
    require_form_work(work)?;
    let now = primitive_now_utc();

    let access = repositories::form_access::find(state.db(), &work.id, student_id)
        .await
        .map_err(|err| DomainError::db(err, "Failed to fetch form access"))?
        .ok_or_else(|| {
            DomainError::Conflict("form was never opened; nothing to finish".to_string())
        })?;

    let deadline = form_timing::effective_deadline(
        access_mode(work),
        access.opened_at,
        work.time_access_seconds,
        work.date_limit,
    );

    if access.status != FormAccessStatus::Opened {
        return Err(DomainError::Conflict("form is already closed".to_string()));
    }

    if !form_timing::can_finish(access.status, now, deadline) {
        return Err(DomainError::Conflict("finish window has closed".to_string()));
    }

    let finished = repositories::form_access::mark_finished(state.db(), &work.id, student_id, now)
        .await
        .map_err(|err| DomainError::db(err, "Failed to finish form"))?;

    if !finished {
        return Err(DomainError::Conflict("form is already closed".to_string()));
    }

    let mut access = access;
    access.status = FormAccessStatus::Finished;
    access.finished_at = Some(now);

    Ok(FormAccessView { access, deadline, can_submit: false })
}

/// Roster-wide `-> revised` used by grading: back-fills synthetic rows for
/// students who never opened the form, then forces every row to `revised`.
pub(crate) async fn revise_for_roster(
    pool: &PgPool,
    work_id: &str,
    student_ids: &[String],
    now: PrimitiveDateTime,
) -> Result<(u64, u64), DomainError> {
    let backfilled = repositories::form_access::backfill_missing(pool, work_id, student_ids, now)
        .await
        .map_err(|err| DomainError::db(err, "Failed to back-fill form access"))?;

    let revised = repositories::form_access::revise_all(pool, work_id)
        .await
        .map_err(|err| DomainError::db(err, "Failed to revise form access"))?;

    Ok((backfilled, revised))
}

/// Lightweight per-student status fan-out for the teacher view.
pub(crate) async fn status_for_roster(
    state: &AppState,
    work: &Work,
    students: &[Student],
) -> Result<Vec<StudentFormStatus>, DomainError> {
    require_form_work(work)?;

    let limit = state.settings().grading().status_concurrency;
    let pool = state.db().clone();
    let work = work.clone();
    let students: Vec<Student> = students.to_vec();

    run_bounded(limit, students.len(), |index| {
        let pool = pool.clone();
        let work = work.clone();
        let student = students[index].clone();

        async move {
            let access = repositories::form_access::find(&pool, &work.id, &student.id)
                .await
                .map_err(|err| DomainError::db(err, "Failed to fetch form access"))?;

            let status = match access {
                Some(access) => {
                    let deadline = form_timing::effective_deadline(
                        access_mode(&work),
                        access.opened_at,
                        work.time_access_seconds,
                        work.date_limit,
                    );
                    StudentFormStatus {
                        student_id: student.id,
                        full_name: student.full_name,
                        status: Some(access.status),
                        opened_at: Some(access.opened_at),
                        deadline: Some(deadline),
                    }
                }
                None => StudentFormStatus {
                    student_id: student.id,
                    full_name: student.full_name,
                    status: None,
                    opened_at: None,
                    deadline: None,
                },
            };

            Ok(status)
        }
    })
    .await
}
