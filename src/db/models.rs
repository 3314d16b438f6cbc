use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{FormAccessMode, FormAccessStatus, QuestionKind, WorkKind};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct GradeProgram {
    pub(crate) id: String,
    pub(crate) module_id: String,
    pub(crate) number: i32,
    pub(crate) percentage: f64,
    pub(crate) is_accumulative: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct GradeProgramEntry {
    pub(crate) id: String,
    pub(crate) program_id: String,
    pub(crate) number: i32,
    pub(crate) percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Work {
    pub(crate) id: String,
    pub(crate) module_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) kind: WorkKind,
    pub(crate) is_qualified: bool,
    pub(crate) grade_program_id: Option<String>,
    pub(crate) program_entry_id: Option<String>,
    pub(crate) date_start: PrimitiveDateTime,
    pub(crate) date_limit: PrimitiveDateTime,
    pub(crate) form_id: Option<String>,
    pub(crate) form_access: Option<FormAccessMode>,
    pub(crate) time_access_seconds: Option<i32>,
    pub(crate) is_revised: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct WorkPatternItem {
    pub(crate) id: String,
    pub(crate) work_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) points: f64,
    pub(crate) order_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct WorkSessionBlock {
    pub(crate) id: String,
    pub(crate) work_id: String,
    pub(crate) block_date: PrimitiveDateTime,
    pub(crate) capacity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct FormQuestion {
    pub(crate) id: String,
    pub(crate) form_id: String,
    pub(crate) kind: QuestionKind,
    pub(crate) title: String,
    pub(crate) points: f64,
    pub(crate) correct_index: Option<i32>,
    pub(crate) order_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Answer {
    pub(crate) id: String,
    pub(crate) work_id: String,
    pub(crate) student_id: String,
    pub(crate) question_id: String,
    pub(crate) selected_index: Option<i32>,
    pub(crate) response: Option<String>,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct EvaluatedAnswer {
    pub(crate) id: String,
    pub(crate) work_id: String,
    pub(crate) student_id: String,
    pub(crate) question_id: String,
    pub(crate) points: f64,
    pub(crate) evaluated_by: String,
    pub(crate) evaluated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct FormAccess {
    pub(crate) id: String,
    pub(crate) work_id: String,
    pub(crate) student_id: String,
    pub(crate) status: FormAccessStatus,
    pub(crate) opened_at: PrimitiveDateTime,
    pub(crate) finished_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct FileSubmission {
    pub(crate) id: String,
    pub(crate) work_id: String,
    pub(crate) student_id: String,
    pub(crate) files: Json<Vec<String>>,
    pub(crate) uploaded_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct FileEvaluation {
    pub(crate) id: String,
    pub(crate) work_id: String,
    pub(crate) student_id: String,
    pub(crate) pattern_item_id: String,
    pub(crate) points: f64,
    pub(crate) evaluated_by: String,
    pub(crate) evaluated_at: PrimitiveDateTime,
}

/// In-person attendance record. `pregrade` is 1000x fixed point, so a stored
/// value of 45_500 reads back as 45.5.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Session {
    pub(crate) id: String,
    pub(crate) work_id: String,
    pub(crate) student_id: String,
    pub(crate) block_id: Option<String>,
    pub(crate) attended_on: Option<PrimitiveDateTime>,
    pub(crate) pregrade: i64,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Grade {
    pub(crate) id: String,
    pub(crate) module_id: String,
    pub(crate) student_id: String,
    pub(crate) program_id: String,
    pub(crate) program_entry_id: Option<String>,
    pub(crate) value: f64,
    pub(crate) graded_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct WorkGrade {
    pub(crate) id: String,
    pub(crate) module_id: String,
    pub(crate) student_id: String,
    pub(crate) work_id: String,
    pub(crate) value: f64,
    pub(crate) graded_at: PrimitiveDateTime,
}
