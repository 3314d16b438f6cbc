use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::FormAccess;
use crate::db::types::FormAccessStatus;

const COLUMNS: &str = "id, work_id, student_id, status, opened_at, finished_at";

pub(crate) async fn find(
    pool: &PgPool,
    work_id: &str,
    student_id: &str,
) -> Result<Option<FormAccess>, sqlx::Error> {
    sqlx::query_as::<_, FormAccess>(&format!(
        "SELECT {COLUMNS} FROM form_access WHERE work_id = $1 AND student_id = $2"
    ))
    .bind(work_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

/// Creates the access row on first request. A concurrent first request is
/// absorbed by the unique key; the stored row wins.
pub(crate) async fn create_opened(
    pool: &PgPool,
    work_id: &str,
    student_id: &str,
    opened_at: time::PrimitiveDateTime,
) -> Result<FormAccess, sqlx::Error> {
    sqlx::query_as::<_, FormAccess>(&format!(
        "INSERT INTO form_access (id, work_id, student_id, status, opened_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (work_id, student_id) DO UPDATE SET work_id = EXCLUDED.work_id
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(work_id)
    .bind(student_id)
    .bind(FormAccessStatus::Opened)
    .bind(opened_at)
    .fetch_one(pool)
    .await
}

/// `opened -> finished`; returns false when the row was not in `opened`.
pub(crate) async fn mark_finished(
    pool: &PgPool,
    work_id: &str,
    student_id: &str,
    finished_at: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE form_access SET status = $4, finished_at = $3
         WHERE work_id = $1 AND student_id = $2 AND status = $5",
    )
    .bind(work_id)
    .bind(student_id)
    .bind(finished_at)
    .bind(FormAccessStatus::Finished)
    .bind(FormAccessStatus::Opened)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Inserts synthetic rows for students who never opened the form, so the
/// roster-wide revision can still represent "did not attempt".
pub(crate) async fn backfill_missing(
    pool: &PgPool,
    work_id: &str,
    student_ids: &[String],
    opened_at: time::PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    if student_ids.is_empty() {
        return Ok(0);
    }

    let ids: Vec<String> = student_ids.iter().map(|_| Uuid::new_v4().to_string()).collect();

    let result = sqlx::query(
        "INSERT INTO form_access (id, work_id, student_id, status, opened_at)
         SELECT row_id, $2, student, $3, $4
         FROM UNNEST($1::text[], $5::text[]) AS input(row_id, student)
         ON CONFLICT (work_id, student_id) DO NOTHING",
    )
    .bind(&ids)
    .bind(work_id)
    .bind(FormAccessStatus::Opened)
    .bind(opened_at)
    .bind(student_ids)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub(crate) async fn revise_all(pool: &PgPool, work_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE form_access SET status = $2 WHERE work_id = $1")
        .bind(work_id)
        .bind(FormAccessStatus::Revised)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
