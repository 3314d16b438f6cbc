use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{FileEvaluation, FileSubmission, Session};
use crate::schemas::work::deserialize_option_offset_datetime_flexible;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct FileSubmissionRequest {
    #[validate(length(min = 1, message = "files must not be empty"))]
    pub(crate) files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FileEvaluationResponse {
    pub(crate) pattern_item_id: String,
    pub(crate) points: f64,
    pub(crate) evaluated_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct FileSubmissionResponse {
    pub(crate) work_id: String,
    pub(crate) student_id: String,
    pub(crate) files: Vec<String>,
    pub(crate) uploaded_at: String,
    pub(crate) evaluations: Vec<FileEvaluationResponse>,
}

impl FileSubmissionResponse {
    pub(crate) fn from_models(
        submission: FileSubmission,
        evaluations: Vec<FileEvaluation>,
    ) -> Self {
        Self {
            work_id: submission.work_id,
            student_id: submission.student_id,
            files: submission.files.0,
            uploaded_at: format_primitive(submission.uploaded_at),
            evaluations: evaluations
                .into_iter()
                .map(|evaluation| FileEvaluationResponse {
                    pattern_item_id: evaluation.pattern_item_id,
                    points: evaluation.points,
                    evaluated_at: format_primitive(evaluation.evaluated_at),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SessionRecordRequest {
    #[serde(alias = "studentId")]
    #[validate(length(min = 1, message = "student_id must not be empty"))]
    pub(crate) student_id: String,
    #[serde(default)]
    #[serde(alias = "blockId")]
    pub(crate) block_id: Option<String>,
    #[serde(
        default,
        alias = "attendedOn",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) attended_on: Option<OffsetDateTime>,
    #[validate(range(min = 0.0, message = "pregrade must be non-negative"))]
    pub(crate) pregrade: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) work_id: String,
    pub(crate) student_id: String,
    pub(crate) block_id: Option<String>,
    pub(crate) attended_on: Option<String>,
    pub(crate) pregrade: f64,
}

impl SessionResponse {
    pub(crate) fn from_model(session: Session, pregrade: f64) -> Self {
        Self {
            work_id: session.work_id,
            student_id: session.student_id,
            block_id: session.block_id,
            attended_on: session.attended_on.map(format_primitive),
            pregrade,
        }
    }
}
