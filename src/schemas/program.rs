use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{GradeProgram, GradeProgramEntry};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ProgramEntryCreate {
    #[validate(range(min = 1, message = "number must be positive"))]
    pub(crate) number: i32,
    #[validate(range(exclusive_min = 0.0, max = 100.0, message = "percentage must be in (0, 100]"))]
    pub(crate) percentage: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeProgramCreate {
    #[serde(alias = "moduleId")]
    #[validate(length(min = 1, message = "module_id must not be empty"))]
    pub(crate) module_id: String,
    #[validate(range(min = 1, message = "number must be positive"))]
    pub(crate) number: i32,
    #[validate(range(exclusive_min = 0.0, max = 100.0, message = "percentage must be in (0, 100]"))]
    pub(crate) percentage: f64,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) entries: Vec<ProgramEntryCreate>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProgramEntryResponse {
    pub(crate) id: String,
    pub(crate) number: i32,
    pub(crate) percentage: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeProgramResponse {
    pub(crate) id: String,
    pub(crate) module_id: String,
    pub(crate) number: i32,
    pub(crate) percentage: f64,
    pub(crate) is_accumulative: bool,
    pub(crate) entries: Vec<ProgramEntryResponse>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl GradeProgramResponse {
    pub(crate) fn from_models(program: GradeProgram, entries: Vec<GradeProgramEntry>) -> Self {
        Self {
            id: program.id,
            module_id: program.module_id,
            number: program.number,
            percentage: program.percentage,
            is_accumulative: program.is_accumulative,
            entries: entries
                .into_iter()
                .map(|entry| ProgramEntryResponse {
                    id: entry.id,
                    number: entry.number,
                    percentage: entry.percentage,
                })
                .collect(),
            created_at: format_primitive(program.created_at),
            updated_at: format_primitive(program.updated_at),
        }
    }
}
