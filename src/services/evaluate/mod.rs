use sqlx::PgPool;

use crate::repositories;
use crate::services::error::DomainError;

pub(crate) mod files;
pub(crate) mod form;
pub(crate) mod in_person;

/// What a strategy measured for one student. Form and files works produce
/// achieved points; in-person works carry a pre-grade already expressed on the
/// 1000x fixed-point encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum StudentScore {
    Points(f64),
    Pregrade(i64),
}

#[derive(Debug, Clone)]
pub(crate) struct StudentEvaluation {
    pub(crate) student_id: String,
    pub(crate) score: StudentScore,
    pub(crate) has_grade_row: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct EvaluationBatch {
    pub(crate) max_points: f64,
    pub(crate) students: Vec<StudentEvaluation>,
}

/// Natural key a persisted grade is looked up (and later upserted) under.
#[derive(Debug, Clone)]
pub(crate) enum GradeKey {
    Qualified {
        module_id: String,
        program_id: String,
        program_entry_id: Option<String>,
    },
    Unqualified {
        module_id: String,
        work_id: String,
    },
}

pub(crate) async fn has_grade_row(
    pool: &PgPool,
    key: &GradeKey,
    student_id: &str,
) -> Result<bool, DomainError> {
    let found = match key {
        GradeKey::Qualified { module_id, program_id, program_entry_id } => {
            repositories::grades::find_grade(
                pool,
                module_id,
                student_id,
                program_id,
                program_entry_id.as_deref(),
            )
            .await
            .map_err(|err| DomainError::db(err, "Failed to look up grade"))?
            .is_some()
        }
        GradeKey::Unqualified { work_id, .. } => {
            repositories::grades::find_work_grade(pool, work_id, student_id)
                .await
                .map_err(|err| DomainError::db(err, "Failed to look up work grade"))?
                .is_some()
        }
    };

    Ok(found)
}
