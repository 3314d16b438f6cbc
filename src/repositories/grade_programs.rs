use sqlx::PgPool;

use crate::db::models::{GradeProgram, GradeProgramEntry};

pub(crate) const COLUMNS: &str =
    "id, module_id, number, percentage, is_accumulative, created_at, updated_at";

const ENTRY_COLUMNS: &str = "id, program_id, number, percentage";

pub(crate) struct CreateProgram<'a> {
    pub(crate) id: &'a str,
    pub(crate) module_id: &'a str,
    pub(crate) number: i32,
    pub(crate) percentage: f64,
    pub(crate) entries: Vec<CreateProgramEntry<'a>>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) struct CreateProgramEntry<'a> {
    pub(crate) id: &'a str,
    pub(crate) number: i32,
    pub(crate) percentage: f64,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateProgram<'_>,
) -> Result<GradeProgram, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let program = sqlx::query_as::<_, GradeProgram>(&format!(
        "INSERT INTO grade_programs (id, module_id, number, percentage, is_accumulative, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.module_id)
    .bind(params.number)
    .bind(params.percentage)
    .bind(!params.entries.is_empty())
    .bind(params.created_at)
    .fetch_one(&mut *tx)
    .await?;

    for entry in &params.entries {
        sqlx::query(
            "INSERT INTO grade_program_entries (id, program_id, number, percentage)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(entry.id)
        .bind(&program.id)
        .bind(entry.number)
        .bind(entry.percentage)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(program)
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    program_id: &str,
) -> Result<Option<GradeProgram>, sqlx::Error> {
    sqlx::query_as::<_, GradeProgram>(&format!(
        "SELECT {COLUMNS} FROM grade_programs WHERE id = $1"
    ))
    .bind(program_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_entries(
    pool: &PgPool,
    program_id: &str,
) -> Result<Vec<GradeProgramEntry>, sqlx::Error> {
    sqlx::query_as::<_, GradeProgramEntry>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM grade_program_entries WHERE program_id = $1 ORDER BY number"
    ))
    .bind(program_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_entry(
    pool: &PgPool,
    program_id: &str,
    entry_id: &str,
) -> Result<Option<GradeProgramEntry>, sqlx::Error> {
    sqlx::query_as::<_, GradeProgramEntry>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM grade_program_entries WHERE program_id = $1 AND id = $2"
    ))
    .bind(program_id)
    .bind(entry_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn sum_percentage_for_module(
    pool: &PgPool,
    module_id: &str,
) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(percentage), 0) FROM grade_programs WHERE module_id = $1",
    )
    .bind(module_id)
    .fetch_one(pool)
    .await
}
