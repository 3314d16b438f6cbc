pub(crate) mod errors;
pub(crate) mod forms;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod programs;
pub(crate) mod router;
pub(crate) mod works;
