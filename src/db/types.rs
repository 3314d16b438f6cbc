use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "workkind", rename_all = "snake_case")]
pub(crate) enum WorkKind {
    Form,
    Files,
    InPerson,
}

impl WorkKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            WorkKind::Form => "form",
            WorkKind::Files => "files",
            WorkKind::InPerson => "in_person",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "formaccessmode", rename_all = "lowercase")]
pub(crate) enum FormAccessMode {
    Default,
    Wtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "formaccessstatus", rename_all = "lowercase")]
pub(crate) enum FormAccessStatus {
    Opened,
    Finished,
    Revised,
}

/// Question kinds on a form. `Alternatives` is the single-choice variant that
/// carries no points and is ignored by grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "questionkind", rename_all = "lowercase")]
pub(crate) enum QuestionKind {
    Alternatives,
    Choice,
    Free,
}

impl QuestionKind {
    pub(crate) fn bears_points(self) -> bool {
        !matches!(self, QuestionKind::Alternatives)
    }
}
