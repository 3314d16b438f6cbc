use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Session;

const COLUMNS: &str = "id, work_id, student_id, block_id, attended_on, pregrade, updated_at";

pub(crate) struct UpsertSession<'a> {
    pub(crate) id: &'a str,
    pub(crate) work_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) block_id: Option<&'a str>,
    pub(crate) attended_on: Option<PrimitiveDateTime>,
    pub(crate) pregrade: i64,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn upsert(
    pool: &PgPool,
    params: UpsertSession<'_>,
) -> Result<Session, sqlx::Error> {
    sqlx::query_as::<_, Session>(&format!(
        "INSERT INTO sessions (id, work_id, student_id, block_id, attended_on, pregrade, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (work_id, student_id) DO UPDATE SET
            block_id = EXCLUDED.block_id,
            attended_on = EXCLUDED.attended_on,
            pregrade = EXCLUDED.pregrade,
            updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.work_id)
    .bind(params.student_id)
    .bind(params.block_id)
    .bind(params.attended_on)
    .bind(params.pregrade)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find(
    pool: &PgPool,
    work_id: &str,
    student_id: &str,
) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(&format!(
        "SELECT {COLUMNS} FROM sessions WHERE work_id = $1 AND student_id = $2"
    ))
    .bind(work_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}
