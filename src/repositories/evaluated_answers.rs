use sqlx::PgPool;

use crate::db::models::EvaluatedAnswer;

const COLUMNS: &str = "id, work_id, student_id, question_id, points, evaluated_by, evaluated_at";

pub(crate) struct UpsertEvaluatedAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) work_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) points: f64,
    pub(crate) evaluated_by: &'a str,
    pub(crate) evaluated_at: time::PrimitiveDateTime,
}

pub(crate) async fn upsert(
    pool: &PgPool,
    params: UpsertEvaluatedAnswer<'_>,
) -> Result<EvaluatedAnswer, sqlx::Error> {
    sqlx::query_as::<_, EvaluatedAnswer>(&format!(
        "INSERT INTO evaluated_answers (id, work_id, student_id, question_id, points, evaluated_by, evaluated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (work_id, student_id, question_id) DO UPDATE SET
            points = EXCLUDED.points,
            evaluated_by = EXCLUDED.evaluated_by,
            evaluated_at = EXCLUDED.evaluated_at
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.work_id)
    .bind(params.student_id)
    .bind(params.question_id)
    .bind(params.points)
    .bind(params.evaluated_by)
    .bind(params.evaluated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    work_id: &str,
    student_id: &str,
) -> Result<Vec<EvaluatedAnswer>, sqlx::Error> {
    sqlx::query_as::<_, EvaluatedAnswer>(&format!(
        "SELECT {COLUMNS} FROM evaluated_answers WHERE work_id = $1 AND student_id = $2"
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
    async fn repeated_evaluation_updates_the_stored_row() -> anyhow::Result<()> {
        let Some(pool) = test_support::try_pool().await else {
            return Ok(());
        };
        let (work_id, question_id) = test_support::seed_form_work(&pool).await?;
        let student_id = Uuid::new_v4().to_string();

        let first = upsert(
            &pool,
            UpsertEvaluatedAnswer {
                id: &Uuid::new_v4().to_string(),
                work_id: &work_id,
                student_id: &student_id,
                question_id: &question_id,
                points: 4.0,
                evaluated_by: "teacher-test",
                evaluated_at: primitive_now_utc(),
            },
        )
        .await?;

        let second = upsert(
            &pool,
            UpsertEvaluatedAnswer {
                id: &Uuid::new_v4().to_string(),
                work_id: &work_id,
                student_id: &student_id,
                question_id: &question_id,
                points: 7.5,
                evaluated_by: "teacher-test",
                evaluated_at: primitive_now_utc(),
            },
        )
        .await?;

        // The original row wins; the repeat write only changes its content.
        assert_eq!(second.id, first.id);
        assert_eq!(second.points, 7.5);

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM evaluated_answers
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
