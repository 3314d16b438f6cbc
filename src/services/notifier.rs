use serde_json::json;

use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::Work;

/// Best-effort notification that a work has been graded. Delivery failure is
/// logged and never propagated into the grading result.
pub(crate) async fn publish_work_graded(state: &AppState, work: &Work, graded_students: usize) {
    let payload = json!({
        "event": "work_graded",
        "work_id": work.id,
        "module_id": work.module_id,
        "kind": work.kind,
        "graded_students": graded_students,
        "occurred_at": format_primitive(primitive_now_utc()),
    })
    .to_string();

    let channel = &state.settings().notifications().channel;
    match state.redis().publish(channel, &payload).await {
        Ok(true) => {
            tracing::debug!(work_id = %work.id, channel = %channel, "Published grading event");
        }
        Ok(false) => {
            tracing::warn!(work_id = %work.id, "Notification skipped; Redis not connected");
        }
        Err(err) => {
            tracing::warn!(work_id = %work.id, error = %err, "Failed to publish grading event");
        }
    }
}
