use sqlx::PgPool;

use crate::db::models::Answer;

const COLUMNS: &str = "id, work_id, student_id, question_id, selected_index, response, updated_at";

pub(crate) struct UpsertAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) work_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) selected_index: Option<i32>,
    pub(crate) response: Option<&'a str>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

/// At most one answer per (work, student, question); a repeat write updates
/// the stored answer in place.
pub(crate) async fn upsert(pool: &PgPool, params: UpsertAnswer<'_>) -> Result<Answer, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "INSERT INTO answers (id, work_id, student_id, question_id, selected_index, response, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (work_id, student_id, question_id) DO UPDATE SET
            selected_index = EXCLUDED.selected_index,
            response = EXCLUDED.response,
            updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.work_id)
    .bind(params.student_id)
    .bind(params.question_id)
    .bind(params.selected_index)
    .bind(params.response)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    work_id: &str,
    student_id: &str,
) -> Result<Vec<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "SELECT {COLUMNS} FROM answers WHERE work_id = $1 AND student_id = $2"
    ))
    .bind(work_id)
    .bind(student_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::core::time::primitive_now_utc;
    use crate::test_support;

    #[tokio::test]
    async fn repeated_answer_write_updates_the_stored_row() -> anyhow::Result<()> {
        let Some(pool) = test_support::try_pool().await else {
            return Ok(());
        };
        let (work_id, question_id) = test_support::seed_form_work(&pool).await?;
        let student_id = Uuid::new_v4().to_string();

        let first = upsert(
            &pool,
            UpsertAnswer {
                id: &Uuid::new_v4().to_string(),
                work_id: &work_id,
                student_id: &student_id,
                question_id: &question_id,
                selected_index: None,
                response: Some("first draft"),
                updated_at: primitive_now_utc(),
            },
        )
        .await?;

        let second = upsert(
            &pool,
            UpsertAnswer {
                id: &Uuid::new_v4().to_string(),
                work_id: &work_id,
                student_id: &student_id,
                question_id: &question_id,
                selected_index: None,
                response: Some("final answer"),
                updated_at: primitive_now_utc(),
            },
        )
        .await?;

        // The original row wins; the repeat write only changes its content.
        assert_eq!(second.id, first.id);
        assert_eq!(second.response.as_deref(), Some("final answer"));

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM answers
             WHERE work_id = $1 AND student_id = $2 AND question_id = $3",
        )
        .bind(&work_id)
        .bind(&student_id)
        .bind(&question_id)
        .fetch_one(&pool)
        .await?;
        assert_eq!(count, 1);

        Ok(())
    }
}
