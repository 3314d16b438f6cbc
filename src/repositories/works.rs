use sqlx::PgPool;

use crate::db::models::{Work, WorkPatternItem, WorkSessionBlock};
use crate::db::types::{FormAccessMode, WorkKind};

pub(crate) const COLUMNS: &str = "\
    id, module_id, title, description, kind, is_qualified, grade_program_id, \
    program_entry_id, date_start, date_limit, form_id, form_access, \
    time_access_seconds, is_revised, created_by, created_at, updated_at";

const PATTERN_COLUMNS: &str = "id, work_id, title, description, points, order_index";
const BLOCK_COLUMNS: &str = "id, work_id, block_date, capacity";

pub(crate) struct CreateWork<'a> {
    pub(crate) id: &'a str,
    pub(crate) module_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) kind: WorkKind,
    pub(crate) is_qualified: bool,
    pub(crate) grade_program_id: Option<&'a str>,
    pub(crate) program_entry_id: Option<&'a str>,
    pub(crate) date_start: time::PrimitiveDateTime,
    pub(crate) date_limit: time::PrimitiveDateTime,
    pub(crate) form_id: Option<&'a str>,
    pub(crate) form_access: Option<FormAccessMode>,
    pub(crate) time_access_seconds: Option<i32>,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) pattern_items: Vec<CreatePatternItem<'a>>,
    pub(crate) session_blocks: Vec<CreateSessionBlock<'a>>,
}

pub(crate) struct CreatePatternItem<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) points: f64,
    pub(crate) order_index: i32,
}

pub(crate) struct CreateSessionBlock<'a> {
    pub(crate) id: &'a str,
    pub(crate) block_date: time::PrimitiveDateTime,
    pub(crate) capacity: i32,
}

pub(crate) async fn create(pool: &PgPool, params: CreateWork<'_>) -> Result<Work, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let work = sqlx::query_as::<_, Work>(&format!(
        "INSERT INTO works (
            id, module_id, title, description, kind, is_qualified, grade_program_id,
            program_entry_id, date_start, date_limit, form_id, form_access,
            time_access_seconds, is_revised, created_by, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,FALSE,$14,$15,$15)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.module_id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.kind)
    .bind(params.is_qualified)
    .bind(params.grade_program_id)
    .bind(params.program_entry_id)
    .bind(params.date_start)
    .bind(params.date_limit)
    .bind(params.form_id)
    .bind(params.form_access)
    .bind(params.time_access_seconds)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_one(&mut *tx)
    .await?;

    for item in &params.pattern_items {
        sqlx::query(
            "INSERT INTO work_pattern_items (id, work_id, title, description, points, order_index)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(item.id)
        .bind(&work.id)
        .bind(item.title)
        .bind(item.description)
        .bind(item.points)
        .bind(item.order_index)
        .execute(&mut *tx)
        .await?;
    }

    for block in &params.session_blocks {
        sqlx::query(
            "INSERT INTO work_session_blocks (id, work_id, block_date, capacity)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(block.id)
        .bind(&work.id)
        .bind(block.block_date)
        .bind(block.capacity)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(work)
}

pub(crate) async fn find_by_id(pool: &PgPool, work_id: &str) -> Result<Option<Work>, sqlx::Error> {
    sqlx::query_as::<_, Work>(&format!("SELECT {COLUMNS} FROM works WHERE id = $1"))
        .bind(work_id)
        .fetch_optional(pool)
        .await
}

pub(crate) struct UpdateWork<'a> {
    pub(crate) title: Option<&'a str>,
    pub(crate) description: Option<&'a str>,
    pub(crate) date_start: Option<time::PrimitiveDateTime>,
    pub(crate) date_limit: Option<time::PrimitiveDateTime>,
    pub(crate) form_access: Option<FormAccessMode>,
    pub(crate) time_access_seconds: Option<i32>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    work_id: &str,
    params: UpdateWork<'_>,
) -> Result<Option<Work>, sqlx::Error> {
    sqlx::query_as::<_, Work>(&format!(
        "UPDATE works SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            date_start = COALESCE($4, date_start),
            date_limit = COALESCE($5, date_limit),
            form_access = COALESCE($6, form_access),
            time_access_seconds = COALESCE($7, time_access_seconds),
            updated_at = $8
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(work_id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.date_start)
    .bind(params.date_limit)
    .bind(params.form_access)
    .bind(params.time_access_seconds)
    .bind(params.updated_at)
    .fetch_optional(pool)
    .await
}

/// Flips `is_revised` exactly once. Returns false when the work was already
/// revised by a concurrent grading run.
pub(crate) async fn mark_revised(
    pool: &PgPool,
    work_id: &str,
    revised_at: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE works SET is_revised = TRUE, updated_at = $2
         WHERE id = $1 AND is_revised = FALSE",
    )
    .bind(work_id)
    .bind(revised_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_pattern_items(
    pool: &PgPool,
    work_id: &str,
) -> Result<Vec<WorkPatternItem>, sqlx::Error> {
    sqlx::query_as::<_, WorkPatternItem>(&format!(
        "SELECT {PATTERN_COLUMNS} FROM work_pattern_items WHERE work_id = $1 ORDER BY order_index"
    ))
    .bind(work_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_session_blocks(
    pool: &PgPool,
    work_id: &str,
) -> Result<Vec<WorkSessionBlock>, sqlx::Error> {
    sqlx::query_as::<_, WorkSessionBlock>(&format!(
        "SELECT {BLOCK_COLUMNS} FROM work_session_blocks WHERE work_id = $1 ORDER BY block_date"
    ))
    .bind(work_id)
    .fetch_all(pool)
    .await
}
