use std::time::Instant;

use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Work;
use crate::db::types::{QuestionKind, WorkKind};
use crate::repositories;
use crate::services::error::DomainError;
use crate::services::evaluate::{self, EvaluationBatch, GradeKey, StudentScore};
use crate::services::form_access;
use crate::services::grade_scale::GradeScale;
use crate::services::notifier;

#[derive(Debug, Clone)]
pub(crate) struct GradingSummary {
    pub(crate) work_id: String,
    pub(crate) graded_students: usize,
    pub(crate) inserted: usize,
    pub(crate) updated: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct FileEvaluationInput {
    pub(crate) pattern_item_id: String,
    pub(crate) points: f64,
}

async fn load_work(state: &AppState, work_id: &str) -> Result<Work, DomainError> {
    repositories::works::find_by_id(state.db(), work_id)
        .await
        .map_err(|err| DomainError::db(err, "Failed to load work"))?
        .ok_or_else(|| DomainError::NotFound(format!("work {work_id} not found")))
}

/// Resolves the natural key grades for this work persist under. Qualified
/// works point at a grade program (and, for accumulative programs, one of its
/// entries); unqualified works grade per (work, student).
async fn resolve_grade_key(state: &AppState, work: &Work) -> Result<GradeKey, DomainError> {
    if !work.is_qualified {
        return Ok(GradeKey::Unqualified {
            module_id: work.module_id.clone(),
            work_id: work.id.clone(),
        });
    }

    let program_id = work.grade_program_id.as_deref().ok_or_else(|| {
        DomainError::Validation(format!("qualified work {} has no grade program", work.id))
    })?;

    let program = repositories::grade_programs::find_by_id(state.db(), program_id)
        .await
        .map_err(|err| DomainError::db(err, "Failed to load grade program"))?
        .ok_or_else(|| DomainError::NotFound(format!("grade program {program_id} not found")))?;

    let program_entry_id = if program.is_accumulative {
        let entry_id = work.program_entry_id.as_deref().ok_or_else(|| {
            DomainError::Validation(format!(
                "work {} targets accumulative program {} without an entry",
                work.id, program.id
            ))
        })?;

        repositories::grade_programs::find_entry(state.db(), &program.id, entry_id)
            .await
            .map_err(|err| DomainError::db(err, "Failed to load program entry"))?
            .ok_or_else(|| {
                DomainError::NotFound(format!(
                    "entry {entry_id} not found on program {}",
                    program.id
                ))
            })?;

        Some(entry_id.to_string())
    } else {
        None
    };

    Ok(GradeKey::Qualified {
        module_id: work.module_id.clone(),
        program_id: program.id,
        program_entry_id,
    })
}

fn final_grade(scale: &GradeScale, score: StudentScore, max_points: f64) -> f64 {
    match score {
        StudentScore::Points(points) => scale.transform(points, max_points),
        StudentScore::Pregrade(pregrade) => scale.from_pregrade(pregrade),
    }
}

async fn persist_grade(
    state: &AppState,
    key: &GradeKey,
    student_id: &str,
    value: f64,
) -> Result<(), DomainError> {
    let now = primitive_now_utc();

    match key {
        GradeKey::Qualified { module_id, program_id, program_entry_id } => {
            repositories::grades::upsert_grade(
                state.db(),
                repositories::grades::UpsertGrade {
                    id: &Uuid::new_v4().to_string(),
                    module_id,
                    student_id,
                    program_id,
                    program_entry_id: program_entry_id.as_deref(),
                    value,
                    graded_at: now,
                },
            )
            .await
            .map_err(|err| DomainError::db(err, "Failed to persist grade"))?;
        }
        GradeKey::Unqualified { module_id, work_id } => {
            repositories::grades::upsert_work_grade(
                state.db(),
                repositories::grades::UpsertWorkGrade {
                    id: &Uuid::new_v4().to_string(),
                    module_id,
                    student_id,
                    work_id,
                    value,
                    graded_at: now,
                },
            )
            .await
            .map_err(|err| DomainError::db(err, "Failed to persist work grade"))?;
        }
    }

    Ok(())
}

/// Closes out a work: evaluates the whole roster, persists final grades and
/// flips the work to revised. Terminal; a revised work is never re-graded
/// through this path.
pub(crate) async fn grade_work(
    state: &AppState,
    work_id: &str,
    grader_id: &str,
    declared_kind: WorkKind,
) -> Result<GradingSummary, DomainError> {
    let started = Instant::now();
    let work = load_work(state, work_id).await?;

    if work.kind != declared_kind {
        return Err(DomainError::Validation(format!(
            "work {} is of kind {}, requested grading as {}",
            work.id,
            work.kind.as_str(),
            declared_kind.as_str()
        )));
    }

    let now = primitive_now_utc();
    if now < work.date_limit {
        return Err(DomainError::Conflict(format!(
            "work {} cannot be graded before its deadline",
            work.id
        )));
    }
    if work.is_revised {
        return Err(DomainError::Conflict(format!("work {} is already graded", work.id)));
    }

    let key = resolve_grade_key(state, &work).await?;

    let students = state
        .roster()
        .students_for_module(&work.module_id)
        .await
        .map_err(|err| DomainError::Unavailable(err.to_string()))?;
    if students.is_empty() {
        return Err(DomainError::NotFound(format!(
            "no students enrolled in module {}",
            work.module_id
        )));
    }

    let batch: EvaluationBatch = match work.kind {
        WorkKind::Form => evaluate::form::evaluate(state, &work, &students, &key).await?,
        WorkKind::Files => evaluate::files::evaluate(state, &work, &students, &key).await?,
        WorkKind::InPerson => evaluate::in_person::evaluate(state, &work, &students, &key).await?,
    };

    let scale = GradeScale::from_settings(state.settings().grading());
    let mut inserted = 0usize;
    let mut updated = 0usize;

    for evaluation in &batch.students {
        let value = final_grade(&scale, evaluation.score, batch.max_points);
        persist_grade(state, &key, &evaluation.student_id, value).await?;
        if evaluation.has_grade_row {
            updated += 1;
        } else {
            inserted += 1;
        }
    }

    if work.kind == WorkKind::Form {
        let student_ids: Vec<String> =
            students.iter().map(|student| student.id.clone()).collect();
        let (backfilled, revised) =
            form_access::revise_for_roster(state.db(), &work.id, &student_ids, now).await?;
        tracing::debug!(
            work_id = %work.id,
            backfilled,
            revised,
            "Revised form access for roster"
        );
    }

    let flipped = repositories::works::mark_revised(state.db(), &work.id, now)
        .await
        .map_err(|err| DomainError::db(err, "Failed to mark work revised"))?;
    if !flipped {
        return Err(DomainError::Conflict(format!("work {} is already graded", work.id)));
    }

    metrics::counter!("grading_runs_total", "kind" => work.kind.as_str()).increment(1);
    metrics::histogram!("grading_duration_seconds").record(started.elapsed().as_secs_f64());

    notifier::publish_work_graded(state, &work, batch.students.len()).await;

    tracing::info!(
        work_id = %work.id,
        grader_id = %grader_id,
        graded_students = batch.students.len(),
        inserted,
        updated,
        "Work graded"
    );

    Ok(GradingSummary {
        work_id: work.id,
        graded_students: batch.students.len(),
        inserted,
        updated,
    })
}

/// Re-derives and overwrites one student's grade row from their stored
/// answers or rubric marks. Only meaningful once the work is revised.
async fn recompute_student_grade(
    state: &AppState,
    work: &Work,
    student_id: &str,
) -> Result<f64, DomainError> {
    let scale = GradeScale::from_settings(state.settings().grading());

    let (points, max_points) = match work.kind {
        WorkKind::Form => {
            let form_id = work.form_id.as_deref().ok_or_else(|| {
                DomainError::Validation(format!("work {} has no form attached", work.id))
            })?;
            let questions = repositories::questions::list_by_form(state.db(), form_id)
                .await
                .map_err(|err| DomainError::db(err, "Failed to load form questions"))?;
            let answers = repositories::answers::list_for_student(state.db(), &work.id, student_id)
                .await
                .map_err(|err| DomainError::db(err, "Failed to load answers"))?;
            let evaluated =
                repositories::evaluated_answers::list_for_student(state.db(), &work.id, student_id)
                    .await
                    .map_err(|err| DomainError::db(err, "Failed to load evaluated answers"))?;

            let score = evaluate::form::score_answers(&questions, &answers, &evaluated);
            (score.points, evaluate::form::max_points(&questions))
        }
        WorkKind::Files => {
            let items = repositories::works::list_pattern_items(state.db(), &work.id)
                .await
                .map_err(|err| DomainError::db(err, "Failed to load pattern items"))?;
            let marks =
                repositories::files::list_evaluations_for_student(state.db(), &work.id, student_id)
                    .await
                    .map_err(|err| DomainError::db(err, "Failed to load file evaluations"))?;

            let points = evaluate::files::sum_evaluations(student_id, &items, &marks)?;
            (points, evaluate::files::max_points(&items))
        }
        WorkKind::InPerson => {
            return Err(DomainError::Validation(
                "in-person grades come from sessions and cannot be recomputed here".to_string(),
            ));
        }
    };

    let key = resolve_grade_key(state, work).await?;
    let value = scale.transform(points, max_points);
    persist_grade(state, &key, student_id, value).await?;

    metrics::counter!("grade_corrections_total", "kind" => work.kind.as_str()).increment(1);

    Ok(value)
}

/// Records an evaluator's mark for one (student, question) pair. Idempotent;
/// a repeat call updates the stored mark. On an already-revised work the
/// student's full form score is recomputed and their grade row overwritten.
pub(crate) async fn upload_student_points(
    state: &AppState,
    work_id: &str,
    student_id: &str,
    question_id: &str,
    points: f64,
    grader_id: &str,
) -> Result<Option<f64>, DomainError> {
    let work = load_work(state, work_id).await?;

    if work.kind != WorkKind::Form {
        return Err(DomainError::Validation(format!(
            "work {} is of kind {}, not a form",
            work.id,
            work.kind.as_str()
        )));
    }
    let form_id = work
        .form_id
        .as_deref()
        .ok_or_else(|| DomainError::Validation(format!("work {} has no form attached", work.id)))?;

    let question = repositories::questions::find_by_id(state.db(), question_id)
        .await
        .map_err(|err| DomainError::db(err, "Failed to load question"))?
        .filter(|question| question.form_id == form_id)
        .ok_or_else(|| {
            DomainError::NotFound(format!("question {question_id} not found on this form"))
        })?;

    if question.kind != QuestionKind::Free {
        return Err(DomainError::Validation(
            "only free-response questions take evaluator marks".to_string(),
        ));
    }
    if points < 0.0 || points > question.points {
        return Err(DomainError::Validation(format!(
            "points must be within [0, {}], got {points}",
            question.points
        )));
    }

    repositories::evaluated_answers::upsert(
        state.db(),
        repositories::evaluated_answers::UpsertEvaluatedAnswer {
            id: &Uuid::new_v4().to_string(),
            work_id: &work.id,
            student_id,
            question_id,
            points,
            evaluated_by: grader_id,
            evaluated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|err| DomainError::db(err, "Failed to store evaluated answer"))?;

    if !work.is_revised {
        return Ok(None);
    }

    let value = recompute_student_grade(state, &work, student_id).await?;
    Ok(Some(value))
}

/// Stores rubric marks for one student's file submission. With `reevaluate`
/// the work must already be revised and the student's grade row is
/// recomputed from the updated marks.
pub(crate) async fn evaluate_student_files(
    state: &AppState,
    work_id: &str,
    student_id: &str,
    evaluations: &[FileEvaluationInput],
    grader_id: &str,
    reevaluate: bool,
) -> Result<Option<f64>, DomainError> {
    let work = load_work(state, work_id).await?;

    if work.kind != WorkKind::Files {
        return Err(DomainError::Validation(format!(
            "work {} is of kind {}, not a files work",
            work.id,
            work.kind.as_str()
        )));
    }
    if evaluations.is_empty() {
        return Err(DomainError::Validation("no evaluations supplied".to_string()));
    }
    if reevaluate && !work.is_revised {
        return Err(DomainError::Conflict(format!(
            "work {} has not been graded yet; nothing to re-evaluate",
            work.id
        )));
    }

    let items = repositories::works::list_pattern_items(state.db(), &work.id)
        .await
        .map_err(|err| DomainError::db(err, "Failed to load pattern items"))?;

    for evaluation in evaluations {
        let item = items
            .iter()
            .find(|item| item.id == evaluation.pattern_item_id)
            .ok_or_else(|| {
                DomainError::NotFound(format!(
                    "pattern item {} not found on work {}",
                    evaluation.pattern_item_id, work.id
                ))
            })?;

        if evaluation.points < 0.0 || evaluation.points > item.points {
            return Err(DomainError::Validation(format!(
                "points for item {} must be within [0, {}], got {}",
                item.id, item.points, evaluation.points
            )));
        }
    }

    let now = primitive_now_utc();
    for evaluation in evaluations {
        repositories::files::upsert_evaluation(
            state.db(),
            repositories::files::UpsertEvaluation {
                id: &Uuid::new_v4().to_string(),
                work_id: &work.id,
                student_id,
                pattern_item_id: &evaluation.pattern_item_id,
                points: evaluation.points,
                evaluated_by: grader_id,
                evaluated_at: now,
            },
        )
        .await
        .map_err(|err| DomainError::db(err, "Failed to store file evaluation"))?;
    }

    if !reevaluate {
        return Ok(None);
    }

    let value = recompute_student_grade(state, &work, student_id).await?;
    Ok(Some(value))
}
