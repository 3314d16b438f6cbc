use sqlx::PgPool;

use crate::db::models::FormQuestion;

const COLUMNS: &str = "id, form_id, kind, title, points, correct_index, order_index";

pub(crate) async fn list_by_form(
    pool: &PgPool,
    form_id: &str,
) -> Result<Vec<FormQuestion>, sqlx::Error> {
    sqlx::query_as::<_, FormQuestion>(&format!(
        "SELECT {COLUMNS} FROM form_questions WHERE form_id = $1 ORDER BY order_index"
    ))
    .bind(form_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    question_id: &str,
) -> Result<Option<FormQuestion>, sqlx::Error> {
    sqlx::query_as::<_, FormQuestion>(&format!(
        "SELECT {COLUMNS} FROM form_questions WHERE id = $1"
    ))
    .bind(question_id)
    .fetch_optional(pool)
    .await
}
