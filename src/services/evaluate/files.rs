use std::collections::HashSet;

use crate::core::state::AppState;
use crate::db::models::{FileEvaluation, Work, WorkPatternItem};
use crate::repositories;
use crate::services::bounded::run_bounded;
use crate::services::error::DomainError;
use crate::services::evaluate::{
    has_grade_row, EvaluationBatch, GradeKey, StudentEvaluation, StudentScore,
};
use crate::services::roster::Student;

/// Sums one student's rubric marks. Every pattern item must carry exactly one
/// evaluation before the work can be graded.
pub(crate) fn sum_evaluations(
    student_id: &str,
    items: &[WorkPatternItem],
    evaluations: &[FileEvaluation],
) -> Result<f64, DomainError> {
    let known: HashSet<&str> = items.iter().map(|item| item.id.as_str()).collect();

    let mut points = 0.0;
    for evaluation in evaluations {
        if !known.contains(evaluation.pattern_item_id.as_str()) {
            return Err(DomainError::Validation(format!(
                "evaluation references unknown pattern item {}",
                evaluation.pattern_item_id
            )));
        }
        points += evaluation.points;
    }

    if evaluations.len() != items.len() {
        return Err(DomainError::Conflict(format!(
            "student {} has {} of {} pattern items evaluated; not all students fully evaluated",
            student_id,
            evaluations.len(),
            items.len()
        )));
    }

    Ok(points)
}

pub(crate) fn max_points(items: &[WorkPatternItem]) -> f64 {
    items.iter().map(|item| item.points).sum()
}

pub(crate) async fn evaluate(
    state: &AppState,
    work: &Work,
    students: &[Student],
    key: &GradeKey,
) -> Result<EvaluationBatch, DomainError> {
    let items = repositories::works::list_pattern_items(state.db(), &work.id)
        .await
        .map_err(|err| DomainError::db(err, "Failed to load pattern items"))?;

    if items.is_empty() {
        return Err(DomainError::Validation(format!("work {} has no pattern items", work.id)));
    }

    let batch_max_points = max_points(&items);
    let limit = state.settings().grading().evaluation_concurrency;

    let pool = state.db().clone();
    let work_id = work.id.clone();
    let items = std::sync::Arc::new(items);
    let key = key.clone();
    let students: Vec<Student> = students.to_vec();

    let evaluations = run_bounded(limit, students.len(), |index| {
        let pool = pool.clone();
        let work_id = work_id.clone();
        let items = items.clone();
        let key = key.clone();
        let student = students[index].clone();

        async move {
            let marks =
                repositories::files::list_evaluations_for_student(&pool, &work_id, &student.id)
                    .await
                    .map_err(|err| DomainError::db(err, "Failed to load file evaluations"))?;

            let points = sum_evaluations(&student.id, &items, &marks)?;
            let has_grade_row = has_grade_row(&pool, &key, &student.id).await?;

            Ok(StudentEvaluation {
                student_id: student.id,
                score: StudentScore::Points(points),
                has_grade_row,
            })
        }
    })
    .await?;

    Ok(EvaluationBatch { max_points: batch_max_points, students: evaluations })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn item(id: &str, points: f64) -> WorkPatternItem {
        WorkPatternItem {
            id: id.to_string(),
            work_id: "work-1".to_string(),
            title: format!("item {id}"),
            description: None,
            points,
            order_index: 0,
        }
    }

    fn evaluation(item_id: &str, points: f64) -> FileEvaluation {
        FileEvaluation {
            id: format!("eval-{item_id}"),
            work_id: "work-1".to_string(),
            student_id: "student-1".to_string(),
            pattern_item_id: item_id.to_string(),
            points,
            evaluated_by: "teacher-1".to_string(),
            evaluated_at: datetime!(2026-04-10 12:00:00),
        }
    }

    #[test]
    fn fully_evaluated_student_sums_all_items() {
        let items = vec![item("i1", 10.0), item("i2", 15.0)];
        let marks = vec![evaluation("i1", 7.0), evaluation("i2", 15.0)];
        let points = sum_evaluations("student-1", &items, &marks).expect("complete evaluation");
        assert_eq!(points, 22.0);
        assert_eq!(max_points(&items), 25.0);
    }

    #[test]
    fn partially_evaluated_student_fails_the_batch() {
        let items = vec![item("i1", 10.0), item("i2", 15.0)];
        let marks = vec![evaluation("i1", 7.0)];
        let err = sum_evaluations("student-1", &items, &marks).expect_err("missing item");
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn evaluation_for_unknown_item_is_rejected() {
        let items = vec![item("i1", 10.0)];
        let marks = vec![evaluation("ghost", 5.0)];
        let err = sum_evaluations("student-1", &items, &marks).expect_err("unknown item");
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
