use std::collections::HashMap;

use crate::core::state::AppState;
use crate::db::models::{Answer, EvaluatedAnswer, FormQuestion, Work};
use crate::db::types::QuestionKind;
use crate::repositories;
use crate::services::bounded::run_bounded;
use crate::services::error::DomainError;
use crate::services::evaluate::{
    has_grade_row, EvaluationBatch, GradeKey, StudentEvaluation, StudentScore,
};
use crate::services::roster::Student;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FormScore {
    pub(crate) points: f64,
    pub(crate) answered_percentage: f64,
}

/// Scores one student's form from the stored answers and evaluator marks.
///
/// `choice` questions award their full points when the selected index matches
/// the correct one; `free` questions take whatever an evaluator recorded.
/// `alternatives` questions bear no points and are ignored entirely.
pub(crate) fn score_answers(
    questions: &[FormQuestion],
    answers: &[Answer],
    evaluated: &[EvaluatedAnswer],
) -> FormScore {
    let answers_by_question: HashMap<&str, &Answer> =
        answers.iter().map(|answer| (answer.question_id.as_str(), answer)).collect();
    let evaluated_by_question: HashMap<&str, &EvaluatedAnswer> =
        evaluated.iter().map(|entry| (entry.question_id.as_str(), entry)).collect();

    let mut points = 0.0;
    let mut considered = 0usize;
    let mut covered = 0usize;

    for question in questions {
        if !question.kind.bears_points() {
            continue;
        }
        considered += 1;

        let answer = answers_by_question.get(question.id.as_str());
        let mark = evaluated_by_question.get(question.id.as_str());
        if answer.is_some() || mark.is_some() {
            covered += 1;
        }

        match question.kind {
            QuestionKind::Choice => {
                let selected = answer.and_then(|answer| answer.selected_index);
                if selected.is_some() && selected == question.correct_index {
                    points += question.points;
                }
            }
            QuestionKind::Free => {
                if let Some(mark) = mark {
                    points += mark.points;
                }
            }
            QuestionKind::Alternatives => {}
        }
    }

    let answered_percentage =
        if considered == 0 { 100.0 } else { (covered as f64 / considered as f64) * 100.0 };

    FormScore { points, answered_percentage }
}

pub(crate) fn max_points(questions: &[FormQuestion]) -> f64 {
    questions
        .iter()
        .filter(|question| question.kind.bears_points())
        .map(|question| question.points)
        .sum()
}

/// Form strategy: every student who opened the form must sit at 100% answered
/// coverage before the batch may proceed; students who never opened it are
/// counted at zero points without tripping the gate.
pub(crate) async fn evaluate(
    state: &AppState,
    work: &Work,
    students: &[Student],
    key: &GradeKey,
) -> Result<EvaluationBatch, DomainError> {
    let form_id = work
        .form_id
        .as_deref()
        .ok_or_else(|| DomainError::Validation(format!("work {} has no form attached", work.id)))?;

    let questions = repositories::questions::list_by_form(state.db(), form_id)
        .await
        .map_err(|err| DomainError::db(err, "Failed to load form questions"))?;

    let batch_max_points = max_points(&questions);
    let limit = state.settings().grading().evaluation_concurrency;

    let pool = state.db().clone();
    let work_id = work.id.clone();
    let questions = std::sync::Arc::new(questions);
    let key = key.clone();
    let students: Vec<Student> = students.to_vec();

    let evaluations = run_bounded(limit, students.len(), |index| {
        let pool = pool.clone();
        let work_id = work_id.clone();
        let questions = questions.clone();
        let key = key.clone();
        let student = students[index].clone();

        async move {
            let access = repositories::form_access::find(&pool, &work_id, &student.id)
                .await
                .map_err(|err| DomainError::db(err, "Failed to fetch form access"))?;

            let score = match access {
                None => StudentScore::Points(0.0),
                Some(_) => {
                    let answers =
                        repositories::answers::list_for_student(&pool, &work_id, &student.id)
                            .await
                            .map_err(|err| DomainError::db(err, "Failed to load answers"))?;
                    let evaluated = repositories::evaluated_answers::list_for_student(
                        &pool,
                        &work_id,
                        &student.id,
                    )
                    .await
                    .map_err(|err| DomainError::db(err, "Failed to load evaluated answers"))?;

                    let scored = score_answers(&questions, &answers, &evaluated);
                    if scored.answered_percentage < 100.0 {
                        return Err(DomainError::Conflict(format!(
                            "student {} answered {:.0}% of the form; grading needs 100%",
                            student.id, scored.answered_percentage
                        )));
                    }
                    StudentScore::Points(scored.points)
                }
            };

            let has_grade_row = has_grade_row(&pool, &key, &student.id).await?;

            Ok(StudentEvaluation { student_id: student.id, score, has_grade_row })
        }
    })
    .await?;

    Ok(EvaluationBatch { max_points: batch_max_points, students: evaluations })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn question(id: &str, kind: QuestionKind, points: f64, correct: Option<i32>) -> FormQuestion {
        FormQuestion {
            id: id.to_string(),
            form_id: "form-1".to_string(),
            kind,
            title: format!("question {id}"),
            points,
            correct_index: correct,
            order_index: 0,
        }
    }

    fn answer(question_id: &str, selected: Option<i32>) -> Answer {
        Answer {
            id: format!("ans-{question_id}"),
            work_id: "work-1".to_string(),
            student_id: "student-1".to_string(),
            question_id: question_id.to_string(),
            selected_index: selected,
            response: None,
            updated_at: datetime!(2026-04-10 10:00:00),
        }
    }

    fn mark(question_id: &str, points: f64) -> EvaluatedAnswer {
        EvaluatedAnswer {
            id: format!("eval-{question_id}"),
            work_id: "work-1".to_string(),
            student_id: "student-1".to_string(),
            question_id: question_id.to_string(),
            points,
            evaluated_by: "teacher-1".to_string(),
            evaluated_at: datetime!(2026-04-10 12:00:00),
        }
    }

    #[test]
    fn correct_choice_earns_full_question_points() {
        let questions = vec![question("q1", QuestionKind::Choice, 10.0, Some(2))];
        let score = score_answers(&questions, &[answer("q1", Some(2))], &[]);
        assert_eq!(score.points, 10.0);
        assert_eq!(score.answered_percentage, 100.0);
    }

    #[test]
    fn wrong_choice_earns_nothing_but_counts_as_answered() {
        let questions = vec![question("q1", QuestionKind::Choice, 10.0, Some(2))];
        let score = score_answers(&questions, &[answer("q1", Some(0))], &[]);
        assert_eq!(score.points, 0.0);
        assert_eq!(score.answered_percentage, 100.0);
    }

    #[test]
    fn free_questions_take_the_evaluator_mark() {
        let questions = vec![question("q1", QuestionKind::Free, 20.0, None)];
        let score = score_answers(&questions, &[], &[mark("q1", 12.5)]);
        assert_eq!(score.points, 12.5);
        assert_eq!(score.answered_percentage, 100.0);
    }

    #[test]
    fn unanswered_free_question_lowers_coverage() {
        let questions = vec![
            question("q1", QuestionKind::Choice, 10.0, Some(1)),
            question("q2", QuestionKind::Free, 20.0, None),
        ];
        let score = score_answers(&questions, &[answer("q1", Some(1))], &[]);
        assert_eq!(score.points, 10.0);
        assert_eq!(score.answered_percentage, 50.0);
    }

    #[test]
    fn alternatives_questions_are_ignored() {
        let questions = vec![
            question("q1", QuestionKind::Alternatives, 0.0, None),
            question("q2", QuestionKind::Choice, 5.0, Some(0)),
        ];
        let score = score_answers(&questions, &[answer("q2", Some(0))], &[]);
        assert_eq!(score.points, 5.0);
        assert_eq!(score.answered_percentage, 100.0);
        assert_eq!(max_points(&questions), 5.0);
    }

    #[test]
    fn form_without_point_bearing_questions_is_fully_covered() {
        let questions = vec![question("q1", QuestionKind::Alternatives, 0.0, None)];
        let score = score_answers(&questions, &[], &[]);
        assert_eq!(score.answered_percentage, 100.0);
        assert_eq!(score.points, 0.0);
    }
}
