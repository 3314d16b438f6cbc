use crate::core::state::AppState;
use crate::db::models::Work;
use crate::repositories;
use crate::services::bounded::run_bounded;
use crate::services::error::DomainError;
use crate::services::evaluate::{
    has_grade_row, EvaluationBatch, GradeKey, StudentEvaluation, StudentScore,
};
use crate::services::roster::Student;

/// In-person strategy: the session's stored pre-grade is the grade, no scale
/// is applied downstream. A student without a session aborts the batch.
pub(crate) async fn evaluate(
    state: &AppState,
    work: &Work,
    students: &[Student],
    key: &GradeKey,
) -> Result<EvaluationBatch, DomainError> {
    let limit = state.settings().grading().evaluation_concurrency;

    let pool = state.db().clone();
    let work_id = work.id.clone();
    let key = key.clone();
    let students: Vec<Student> = students.to_vec();

    let evaluations = run_bounded(limit, students.len(), |index| {
        let pool = pool.clone();
        let work_id = work_id.clone();
        let key = key.clone();
        let student = students[index].clone();

        async move {
            let session = repositories::sessions::find(&pool, &work_id, &student.id)
                .await
                .map_err(|err| DomainError::db(err, "Failed to load session"))?
                .ok_or_else(|| {
                    DomainError::Conflict(format!(
                        "not every student has a session (missing for {})",
                        student.id
                    ))
                })?;

            let has_grade_row = has_grade_row(&pool, &key, &student.id).await?;

            Ok(StudentEvaluation {
                student_id: student.id,
                score: StudentScore::Pregrade(session.pregrade),
                has_grade_row,
            })
        }
    })
    .await?;

    Ok(EvaluationBatch { max_points: 0.0, students: evaluations })
}
