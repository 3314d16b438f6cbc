use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::WorkKind;
use crate::services::grading::GradingSummary;

#[derive(Debug, Deserialize)]
pub(crate) struct GradeWorkRequest {
    pub(crate) kind: WorkKind,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradingSummaryResponse {
    pub(crate) work_id: String,
    pub(crate) graded_students: usize,
    pub(crate) inserted: usize,
    pub(crate) updated: usize,
}

impl GradingSummaryResponse {
    pub(crate) fn from_summary(summary: GradingSummary) -> Self {
        Self {
            work_id: summary.work_id,
            graded_students: summary.graded_students,
            inserted: summary.inserted,
            updated: summary.updated,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UploadPointsRequest {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[validate(range(min = 0.0, message = "points must be non-negative"))]
    pub(crate) points: f64,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub(crate) struct FileEvaluationEntry {
    #[serde(alias = "patternItemId")]
    #[validate(length(min = 1, message = "pattern_item_id must not be empty"))]
    pub(crate) pattern_item_id: String,
    #[validate(range(min = 0.0, message = "points must be non-negative"))]
    pub(crate) points: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct EvaluateFilesRequest {
    #[validate(nested, length(min = 1, message = "evaluations must not be empty"))]
    pub(crate) evaluations: Vec<FileEvaluationEntry>,
    #[serde(default)]
    pub(crate) reevaluate: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CorrectedGradeResponse {
    pub(crate) work_id: String,
    pub(crate) student_id: String,
    pub(crate) grade: Option<f64>,
}
