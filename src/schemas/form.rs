use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Answer;
use crate::db::types::FormAccessStatus;
use crate::services::form_access::{FormAccessView, StudentFormStatus};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitAnswerRequest {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default)]
    #[serde(alias = "selectedIndex")]
    pub(crate) selected_index: Option<i32>,
    #[serde(default)]
    pub(crate) response: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FormAccessResponse {
    pub(crate) work_id: String,
    pub(crate) student_id: String,
    pub(crate) status: FormAccessStatus,
    pub(crate) opened_at: String,
    pub(crate) finished_at: Option<String>,
    pub(crate) deadline: String,
    pub(crate) can_submit: bool,
}

impl FormAccessResponse {
    pub(crate) fn from_view(view: FormAccessView) -> Self {
        Self {
            work_id: view.access.work_id,
            student_id: view.access.student_id,
            status: view.access.status,
            opened_at: format_primitive(view.access.opened_at),
            finished_at: view.access.finished_at.map(format_primitive),
            deadline: format_primitive(view.deadline),
            can_submit: view.can_submit,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerResponse {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) selected_index: Option<i32>,
    pub(crate) response: Option<String>,
    pub(crate) updated_at: String,
}

impl AnswerResponse {
    pub(crate) fn from_model(answer: Answer) -> Self {
        Self {
            id: answer.id,
            question_id: answer.question_id,
            selected_index: answer.selected_index,
            response: answer.response,
            updated_at: format_primitive(answer.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentFormStatusResponse {
    pub(crate) student_id: String,
    pub(crate) full_name: String,
    pub(crate) status: Option<FormAccessStatus>,
    pub(crate) opened_at: Option<String>,
    pub(crate) deadline: Option<String>,
}

impl StudentFormStatusResponse {
    pub(crate) fn from_status(status: StudentFormStatus) -> Self {
        Self {
            student_id: status.student_id,
            full_name: status.full_name,
            status: status.status,
            opened_at: status.opened_at.map(format_primitive),
            deadline: status.deadline.map(format_primitive),
        }
    }
}
