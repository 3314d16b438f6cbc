pub(crate) mod bounded;
pub(crate) mod error;
pub(crate) mod evaluate;
pub(crate) mod form_access;
pub(crate) mod form_timing;
pub(crate) mod grade_programs;
pub(crate) mod grade_scale;
pub(crate) mod grading;
pub(crate) mod notifier;
pub(crate) mod roster;
