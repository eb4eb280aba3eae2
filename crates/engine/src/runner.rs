//! Asynchronous run driver.
//!
//! This is the execution surface for concurrent hosts: the same semantics
//! as [`execute_workflow`](crate::executor::execute_workflow), but a step
//! `delay` suspends only this run's task via `tokio::time::sleep` instead
//! of stalling a thread. Multiple runs of the same definition may proceed
//! concurrently; each owns an independent run context.
//!
//! There is no cancellation primitive: dropping the future abandons the
//! run, but an in-flight provider invocation cannot be interrupted.

use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use baton_types::WorkflowDefinition;

use crate::error::EngineError;
use crate::executor::{RunReport, dispatch_step, finalize_report, merge_inputs, skip_step};
use crate::gate::{Gate, evaluate_gate};
use crate::plan::prepare_plan;
use crate::provider::ActionProvider;
use crate::resolve::RunContext;

/// Drives a workflow run to completion on the local wall clock.
pub async fn drive_workflow(
    definition: &WorkflowDefinition,
    runtime_inputs: &IndexMap<String, Value>,
    provider: &dyn ActionProvider,
) -> Result<RunReport, EngineError> {
    drive_workflow_at(definition, runtime_inputs, provider, Local::now().naive_local()).await
}

/// Drives a workflow run with an explicit run clock.
pub async fn drive_workflow_at(
    definition: &WorkflowDefinition,
    runtime_inputs: &IndexMap<String, Value>,
    provider: &dyn ActionProvider,
    now: NaiveDateTime,
) -> Result<RunReport, EngineError> {
    let plan = prepare_plan(definition, provider)?;
    let inputs = merge_inputs(definition, runtime_inputs)?;
    let mut context = RunContext::new(inputs, now);

    let started = Instant::now();
    let mut results = Vec::with_capacity(plan.steps.len());
    for step in &plan.steps {
        match evaluate_gate(step, &context) {
            Gate::Skip(reason) => results.push(skip_step(step, reason, &mut context)),
            Gate::Wait(delay) => {
                debug!(step = step.index, delay_ms = delay.as_millis() as u64, "pausing before step");
                tokio::time::sleep(delay).await;
                results.push(dispatch_step(step, &mut context, provider));
            }
            Gate::Run => results.push(dispatch_step(step, &mut context, provider)),
        }
    }

    Ok(finalize_report(started, results))
}
