use sqlx::PgPool;

use crate::db::models::{Grade, WorkGrade};

const GRADE_COLUMNS: &str =
    "id, module_id, student_id, program_id, program_entry_id, value, graded_at";
const WORK_GRADE_COLUMNS: &str = "id, module_id, student_id, work_id, value, graded_at";

pub(crate) async fn find_grade(
    pool: &PgPool,
    module_id: &str,
    student_id: &str,
    program_id: &str,
    program_entry_id: Option<&str>,
) -> Result<Option<Grade>, sqlx::Error> {
    sqlx::query_as::<_, Grade>(&format!(
        "SELECT {GRADE_COLUMNS} FROM grades
         WHERE module_id = $1 AND student_id = $2 AND program_id = $3
           AND COALESCE(program_entry_id, '') = COALESCE($4, '')"
    ))
    .bind(module_id)
    .bind(student_id)
    .bind(program_id)
    .bind(program_entry_id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct UpsertGrade<'a> {
    pub(crate) id: &'a str,
    pub(crate) module_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) program_id: &'a str,
    pub(crate) program_entry_id: Option<&'a str>,
    pub(crate) value: f64,
    pub(crate) graded_at: time::PrimitiveDateTime,
}

/// Keyed by (module, student, program, accumulative entry); re-running a
/// grading batch updates in place instead of duplicating rows.
pub(crate) async fn upsert_grade(
    pool: &PgPool,
    params: UpsertGrade<'_>,
) -> Result<Grade, sqlx::Error> {
    sqlx::query_as::<_, Grade>(&format!(
        "INSERT INTO grades (id, module_id, student_id, program_id, program_entry_id, value, graded_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (module_id, student_id, program_id, COALESCE(program_entry_id, '')) DO UPDATE SET
            value = EXCLUDED.value,
            graded_at = EXCLUDED.graded_at
         RETURNING {GRADE_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.module_id)
    .bind(params.student_id)
    .bind(params.program_id)
    .bind(params.program_entry_id)
    .bind(params.value)
    .bind(params.graded_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_work_grade(
    pool: &PgPool,
    work_id: &str,
    student_id: &str,
) -> Result<Option<WorkGrade>, sqlx::Error> {
    sqlx::query_as::<_, WorkGrade>(&format!(
        "SELECT {WORK_GRADE_COLUMNS} FROM work_grades WHERE work_id = $1 AND student_id = $2"
    ))
    .bind(work_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct UpsertWorkGrade<'a> {
    pub(crate) id: &'a str,
    pub(crate) module_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) work_id: &'a str,
    pub(crate) value: f64,
    pub(crate) graded_at: time::PrimitiveDateTime,
}

pub(crate) async fn upsert_work_grade(
    pool: &PgPool,
    params: UpsertWorkGrade<'_>,
) -> Result<WorkGrade, sqlx::Error> {
    sqlx::query_as::<_, WorkGrade>(&format!(
        "INSERT INTO work_grades (id, module_id, student_id, work_id, value, graded_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (work_id, student_id) DO UPDATE SET
            value = EXCLUDED.value,
            graded_at = EXCLUDED.graded_at
         RETURNING {WORK_GRADE_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.module_id)
    .bind(params.student_id)
    .bind(params.work_id)
    .bind(params.value)
    .bind(params.graded_at)
    .fetch_one(pool)
    .await
}
