use sqlx::PgPool;

use crate::db::models::{FileEvaluation, FileSubmission};

const SUBMISSION_COLUMNS: &str = "id, work_id, student_id, files, uploaded_at";
const EVALUATION_COLUMNS: &str =
    "id, work_id, student_id, pattern_item_id, points, evaluated_by, evaluated_at";

pub(crate) async fn find_submission(
    pool: &PgPool,
    work_id: &str,
    student_id: &str,
) -> Result<Option<FileSubmission>, sqlx::Error> {
    sqlx::query_as::<_, FileSubmission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM file_submissions WHERE work_id = $1 AND student_id = $2"
    ))
    .bind(work_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

/// One submission row per (work, student); re-uploading replaces the file
/// reference list.
pub(crate) async fn upsert_submission(
    pool: &PgPool,
    id: &str,
    work_id: &str,
    student_id: &str,
    files: &[String],
    uploaded_at: time::PrimitiveDateTime,
) -> Result<FileSubmission, sqlx::Error> {
    sqlx::query_as::<_, FileSubmission>(&format!(
        "INSERT INTO file_submissions (id, work_id, student_id, files, uploaded_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (work_id, student_id) DO UPDATE SET
            files = EXCLUDED.files,
            uploaded_at = EXCLUDED.uploaded_at
         RETURNING {SUBMISSION_COLUMNS}"
    ))
    .bind(id)
    .bind(work_id)
    .bind(student_id)
    .bind(sqlx::types::Json(files))
    .bind(uploaded_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpsertEvaluation<'a> {
    pub(crate) id: &'a str,
    pub(crate) work_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) pattern_item_id: &'a str,
    pub(crate) points: f64,
    pub(crate) evaluated_by: &'a str,
    pub(crate) evaluated_at: time::PrimitiveDateTime,
}

pub(crate) async fn upsert_evaluation(
    pool: &PgPool,
    params: UpsertEvaluation<'_>,
) -> Result<FileEvaluation, sqlx::Error> {
    sqlx::query_as::<_, FileEvaluation>(&format!(
        "INSERT INTO file_evaluations (id, work_id, student_id, pattern_item_id, points, evaluated_by, evaluated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (work_id, student_id, pattern_item_id) DO UPDATE SET
            points = EXCLUDED.points,
            evaluated_by = EXCLUDED.evaluated_by,
            evaluated_at = EXCLUDED.evaluated_at
         RETURNING {EVALUATION_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.work_id)
    .bind(params.student_id)
    .bind(params.pattern_item_id)
    .bind(params.points)
    .bind(params.evaluated_by)
    .bind(params.evaluated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_evaluations_for_student(
    pool: &PgPool,
    work_id: &str,
    student_id: &str,
) -> Result<Vec<FileEvaluation>, sqlx::Error> {
    sqlx::query_as::<_, FileEvaluation>(&format!(
        "SELECT {EVALUATION_COLUMNS} FROM file_evaluations WHERE work_id = $1 AND student_id = $2"
    ))
    .bind(work_id)
    .bind(student_id)
    .fetch_all(pool)
    .await
}
