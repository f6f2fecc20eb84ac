//! One-shot session planning.
//!
//! Composes window activation with the externally supplied "session already
//! running" fact and produces either a concrete plan for the launcher or one
//! of the two normal skip outcomes. Both skips are expected terminal states,
//! not errors, so they are result variants rather than failure types.

use chrono::NaiveDateTime;

use crate::policy::BlockPolicy;

/// Everything the external applier needs to start one blocking session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    /// Minutes the session should run, until the active window's end time.
    pub duration_minutes: u32,
    /// Effective whitelist flag for the session.
    pub block_as_whitelist: bool,
    /// Effective host list, if any is configured.
    pub host_blacklist: Option<Vec<String>>,
}

/// Outcome of one scheduler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A window is active; start a session with this plan.
    Started(SessionPlan),
    /// The external store reports a session already in progress.
    SkippedAlreadyRunning,
    /// No window contains the current time.
    SkippedNoActiveSchedule,
}

/// Plans one scheduler invocation.
///
/// Pure over its inputs: the policy, the current local timestamp, and the
/// already-running fact read from the external preference store. The
/// already-running check comes first so an in-progress session is never
/// restarted or shortened.
pub fn plan_session(policy: &BlockPolicy, now: NaiveDateTime, already_running: bool) -> RunOutcome {
    if already_running {
        return RunOutcome::SkippedAlreadyRunning;
    }

    let Some(schedule) = policy.active_schedule(now) else {
        return RunOutcome::SkippedNoActiveSchedule;
    };
    tracing::debug!(
        start = %schedule.start_time,
        end = %schedule.end_time,
        weekday = ?schedule.weekday,
        "selected active window"
    );

    let options = policy.resolve_options(schedule);
    RunOutcome::Started(SessionPlan {
        duration_minutes: schedule.duration_minutes(now),
        block_as_whitelist: options.block_as_whitelist,
        host_blacklist: options.host_blacklist,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Schedule, TimeOfDay};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        // 2020-04-23 is a Thursday.
        NaiveDate::from_ymd_opt(2020, 4, 23)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn daytime_policy() -> BlockPolicy {
        BlockPolicy::new(vec![Schedule::new(
            None,
            TimeOfDay::new(5, 0),
            TimeOfDay::new(21, 0),
        )])
        .with_host_blacklist(vec!["example.com".to_string()])
    }

    // ==================== Outcome Tests ====================

    #[test]
    fn already_running_skips_before_anything_else() {
        let outcome = plan_session(&daytime_policy(), at(11, 0), true);
        assert_eq!(outcome, RunOutcome::SkippedAlreadyRunning);
    }

    #[test]
    fn already_running_wins_even_outside_windows() {
        let outcome = plan_session(&daytime_policy(), at(23, 0), true);
        assert_eq!(outcome, RunOutcome::SkippedAlreadyRunning);
    }

    #[test]
    fn no_active_window_skips() {
        let outcome = plan_session(&daytime_policy(), at(23, 0), false);
        assert_eq!(outcome, RunOutcome::SkippedNoActiveSchedule);
    }

    #[test]
    fn active_window_produces_plan() {
        let outcome = plan_session(&daytime_policy(), at(20, 45), false);
        assert_eq!(
            outcome,
            RunOutcome::Started(SessionPlan {
                duration_minutes: 15,
                block_as_whitelist: false,
                host_blacklist: Some(vec!["example.com".to_string()]),
            })
        );
    }

    #[test]
    fn plan_uses_window_overrides() {
        let mut schedule = Schedule::new(None, TimeOfDay::new(5, 0), TimeOfDay::new(21, 0));
        schedule.block_as_whitelist = Some(true);
        schedule.host_blacklist = Some(vec!["focus.example.com".to_string()]);
        let policy = BlockPolicy::new(vec![schedule])
            .with_host_blacklist(vec!["example.com".to_string()]);

        match plan_session(&policy, at(11, 0), false) {
            RunOutcome::Started(plan) => {
                assert!(plan.block_as_whitelist);
                assert_eq!(
                    plan.host_blacklist,
                    Some(vec!["focus.example.com".to_string()])
                );
            }
            other => panic!("expected Started, got {other:?}"),
        }
    }

    #[test]
    fn plan_duration_crosses_midnight() {
        let policy = BlockPolicy::new(vec![Schedule::new(
            None,
            TimeOfDay::new(22, 0),
            TimeOfDay::new(5, 0),
        )]);

        match plan_session(&policy, at(23, 0), false) {
            RunOutcome::Started(plan) => assert_eq!(plan.duration_minutes, 360),
            other => panic!("expected Started, got {other:?}"),
        }
    }
}
