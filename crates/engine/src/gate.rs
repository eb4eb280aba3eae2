//! Per-step gate evaluation.
//!
//! Gates decide whether a step runs, is skipped, or must wait before
//! dispatch. Evaluation order is fixed: the `if` condition first, then the
//! time window and weekday set, then the delay. All present gates must
//! pass; a failing gate short-circuits with the skip reason of the first
//! gate that failed.
//!
//! Time and day gates read the clock captured at run start, so a run never
//! straddles a day or window boundary mid-execution.

use std::time::Duration;

use chrono::{Datelike, NaiveTime, Timelike};

use baton_types::Weekday;

use crate::condition::eval_comparison;
use crate::plan::PreparedStep;
use crate::resolve::RunContext;

/// Outcome of gate evaluation for one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// All gates passed; dispatch immediately.
    Run,
    /// A gate failed; record the step as skipped with this reason.
    Skip(String),
    /// All gates passed and the step declares a delay; pause this long,
    /// then dispatch.
    Wait(Duration),
}

/// Evaluates every gate on a prepared step against the run context.
pub fn evaluate_gate(step: &PreparedStep, context: &RunContext) -> Gate {
    if let Some(condition) = &step.condition
        && !eval_comparison(condition, context)
    {
        return Gate::Skip("condition not met".to_string());
    }

    let now_hm = NaiveTime::from_hms_opt(context.now.hour(), context.now.minute(), 0)
        .expect("clock hour and minute are in range");

    // An empty day list is treated as no gate, not as "never".
    if let Some(days) = &step.days
        && !days.is_empty()
    {
        let today = Weekday::from_chrono(context.now.weekday());
        if !days.contains(&today) {
            let allowed: Vec<&str> = days.iter().map(|day| day.token()).collect();
            return Gate::Skip(format!(
                "not scheduled for {today} (only {})",
                allowed.join(", ")
            ));
        }
    }

    if let Some(after) = step.time_after
        && now_hm < after
    {
        return Gate::Skip(format!(
            "outside time window (runs after {}, now {})",
            after.format("%H:%M"),
            now_hm.format("%H:%M")
        ));
    }

    if let Some(before) = step.time_before
        && now_hm > before
    {
        return Gate::Skip(format!(
            "outside time window (runs before {}, now {})",
            before.format("%H:%M"),
            now_hm.format("%H:%M")
        ));
    }

    match step.delay {
        Some(delay) if !delay.is_zero() => Gate::Wait(delay),
        _ => Gate::Run,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::parse_condition;
    use chrono::{NaiveDate, NaiveDateTime};
    use indexmap::IndexMap;

    // 2024-03-14 is a Thursday.
    fn clock(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap().and_hms_opt(hour, minute, 0).unwrap()
    }

    fn context_at(now: NaiveDateTime) -> RunContext {
        RunContext::new(IndexMap::new(), now)
    }

    fn bare_step() -> PreparedStep {
        PreparedStep {
            index: 0,
            action: "notify".to_string(),
            params: IndexMap::new(),
            condition: None,
            time_after: None,
            time_before: None,
            days: None,
            delay: None,
        }
    }

    #[test]
    fn ungated_step_runs() {
        assert_eq!(evaluate_gate(&bare_step(), &context_at(clock(12, 0))), Gate::Run);
    }

    #[test]
    fn window_admits_midday_and_rejects_evening() {
        let mut step = bare_step();
        step.time_after = Some(NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        step.time_before = Some(NaiveTime::from_hms_opt(17, 0, 0).unwrap());

        assert_eq!(evaluate_gate(&step, &context_at(clock(12, 0))), Gate::Run);

        let Gate::Skip(reason) = evaluate_gate(&step, &context_at(clock(20, 0))) else {
            panic!("expected evening run to be skipped");
        };
        assert!(reason.contains("time"), "reason should mention the window: {reason}");
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let mut step = bare_step();
        step.time_after = Some(NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        step.time_before = Some(NaiveTime::from_hms_opt(17, 0, 0).unwrap());

        assert_eq!(evaluate_gate(&step, &context_at(clock(9, 0))), Gate::Run);
        assert_eq!(evaluate_gate(&step, &context_at(clock(17, 0))), Gate::Run);
        assert!(matches!(evaluate_gate(&step, &context_at(clock(8, 59))), Gate::Skip(_)));
        assert!(matches!(evaluate_gate(&step, &context_at(clock(17, 1))), Gate::Skip(_)));
    }

    #[test]
    fn day_gate_checks_the_run_clock_weekday() {
        let mut step = bare_step();
        step.days = Some(vec![Weekday::Thu]);
        assert_eq!(evaluate_gate(&step, &context_at(clock(12, 0))), Gate::Run);

        step.days = Some(vec![Weekday::Sat, Weekday::Sun]);
        let Gate::Skip(reason) = evaluate_gate(&step, &context_at(clock(12, 0))) else {
            panic!("expected weekday run to be skipped");
        };
        assert_eq!(reason, "not scheduled for thu (only sat, sun)");
    }

    #[test]
    fn empty_day_list_is_no_gate() {
        let mut step = bare_step();
        step.days = Some(Vec::new());
        assert_eq!(evaluate_gate(&step, &context_at(clock(12, 0))), Gate::Run);
    }

    #[test]
    fn condition_is_checked_before_the_time_window() {
        let mut step = bare_step();
        step.condition = Some(parse_condition("input.flag == 'on'").unwrap());
        step.time_after = Some(NaiveTime::from_hms_opt(22, 0, 0).unwrap());

        // Both gates fail; the condition's reason wins by evaluation order.
        let Gate::Skip(reason) = evaluate_gate(&step, &context_at(clock(12, 0))) else {
            panic!("expected skip");
        };
        assert_eq!(reason, "condition not met");
    }

    #[test]
    fn delay_surfaces_as_wait_after_gates_pass() {
        let mut step = bare_step();
        step.delay = Some(Duration::from_secs(3));
        assert_eq!(
            evaluate_gate(&step, &context_at(clock(12, 0))),
            Gate::Wait(Duration::from_secs(3))
        );

        // A delayed step outside its window never waits.
        step.time_after = Some(NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert!(matches!(evaluate_gate(&step, &context_at(clock(12, 0))), Gate::Skip(_)));
    }
}
