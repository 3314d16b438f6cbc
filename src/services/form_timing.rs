use time::{Duration, PrimitiveDateTime};

use crate::db::types::{FormAccessMode, FormAccessStatus};

/// Finishing is tolerated slightly past the deadline for network jitter.
pub(crate) const FINISH_GRACE_SECONDS: i64 = 300;

/// Effective deadline for a student's form window.
///
/// `default` works close at the work's global `date_limit`; `wtime` works
/// close `time_access_seconds` after the student opened the form, clipped to
/// never exceed `date_limit`.
pub(crate) fn effective_deadline(
    mode: FormAccessMode,
    opened_at: PrimitiveDateTime,
    time_access_seconds: Option<i32>,
    date_limit: PrimitiveDateTime,
) -> PrimitiveDateTime {
    match mode {
        FormAccessMode::Default => date_limit,
        FormAccessMode::Wtime => {
            let seconds = i64::from(time_access_seconds.unwrap_or(0).max(0));
            let timed = opened_at + Duration::seconds(seconds);
            if timed < date_limit {
                timed
            } else {
                date_limit
            }
        }
    }
}

pub(crate) fn can_submit(
    status: FormAccessStatus,
    now: PrimitiveDateTime,
    deadline: PrimitiveDateTime,
) -> bool {
    matches!(status, FormAccessStatus::Opened) && now < deadline
}

pub(crate) fn can_finish(
    status: FormAccessStatus,
    now: PrimitiveDateTime,
    deadline: PrimitiveDateTime,
) -> bool {
    matches!(status, FormAccessStatus::Opened)
        && now <= deadline + Duration::seconds(FINISH_GRACE_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const OPENED: PrimitiveDateTime = datetime!(2026-04-10 10:00:00);
    const LIMIT: PrimitiveDateTime = datetime!(2026-04-10 11:00:00);

    #[test]
    fn default_mode_uses_the_work_limit() {
        assert_eq!(
            effective_deadline(FormAccessMode::Default, OPENED, Some(60), LIMIT),
            LIMIT
        );
    }

    #[test]
    fn wtime_adds_access_window_to_opening() {
        let deadline = effective_deadline(FormAccessMode::Wtime, OPENED, Some(60), LIMIT);
        assert_eq!(deadline, datetime!(2026-04-10 10:01:00));
    }

    #[test]
    fn wtime_is_clipped_to_the_work_limit() {
        for seconds in [0, 60, 3_600, 7_200, 86_400] {
            let deadline = effective_deadline(FormAccessMode::Wtime, OPENED, Some(seconds), LIMIT);
            assert!(deadline <= LIMIT, "window {seconds}s escaped the limit");
        }
    }

    #[test]
    fn submission_rejected_after_timed_window() {
        let deadline = effective_deadline(FormAccessMode::Wtime, OPENED, Some(60), LIMIT);
        let just_late = datetime!(2026-04-10 10:01:01);
        assert!(!can_submit(FormAccessStatus::Opened, just_late, deadline));
        assert!(can_submit(FormAccessStatus::Opened, datetime!(2026-04-10 10:00:59), deadline));
    }

    #[test]
    fn submission_requires_opened_status() {
        assert!(!can_submit(FormAccessStatus::Finished, OPENED, LIMIT));
        assert!(!can_submit(FormAccessStatus::Revised, OPENED, LIMIT));
    }

    #[test]
    fn finish_is_tolerated_within_grace() {
        let inside_grace = LIMIT + Duration::seconds(FINISH_GRACE_SECONDS);
        let past_grace = LIMIT + Duration::seconds(FINISH_GRACE_SECONDS + 1);
        assert!(can_finish(FormAccessStatus::Opened, inside_grace, LIMIT));
        assert!(!can_finish(FormAccessStatus::Opened, past_grace, LIMIT));
    }

    #[test]
    fn finish_never_regresses_a_closed_form() {
        assert!(!can_finish(FormAccessStatus::Finished, OPENED, LIMIT));
        assert!(!can_finish(FormAccessStatus::Revised, OPENED, LIMIT));
    }
}
