pub(crate) mod answers;
pub(crate) mod evaluated_answers;
pub(crate) mod files;
pub(crate) mod form_access;
pub(crate) mod grade_programs;
pub(crate) mod grades;
pub(crate) mod health;
pub(crate) mod questions;
pub(crate) mod sessions;
pub(crate) mod works;
