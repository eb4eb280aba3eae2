//! Sequential run orchestration.
//!
//! A run validates first, then walks the plan in document order: evaluate
//! the step's gates, pause when a delay is declared, resolve the step's
//! parameter templates, dispatch to the action provider, and record the
//! outcome both in the report and in the run context for later steps.
//!
//! Failures during dispatch (an unresolved template reference, or a typed
//! action error) mark that step `error` and the run continues; a workflow
//! author who wants early termination encodes it as an `if` gate on later
//! steps. Only definition errors detected before the loop abort a run, and
//! those abort it before any side effect.

use std::thread;
use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use baton_types::{ResultFields, WorkflowDefinition};

use crate::error::EngineError;
use crate::gate::{Gate, evaluate_gate};
use crate::plan::{PreparedStep, prepare_plan};
use crate::provider::ActionProvider;
use crate::resolve::{RunContext, resolve_params};

/// Final status of one step in the report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// The action ran and returned result fields.
    Ok,
    /// A gate failed; the action was never invoked.
    Skipped,
    /// Template resolution or the action itself failed.
    Error,
}

/// Per-step entry in the run report, in document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    /// Step position in the workflow document.
    pub step: usize,
    /// Action the step names.
    pub action: String,
    /// Outcome of this step.
    pub status: StepStatus,
    /// Result fields returned by the action, for `ok` steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<ResultFields>,
    /// Why the step was skipped or failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Structured report returned to the caller after every run of a
/// structurally valid workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Wall-clock duration of the run, delays included.
    pub duration_ms: u64,
    /// Number of steps that finished `ok`.
    pub steps_executed: usize,
    /// Number of steps skipped by a gate.
    pub steps_skipped: usize,
    /// One entry per step, ordered by step index.
    pub results: Vec<StepReport>,
}

/// Executes a workflow synchronously against the local wall clock.
///
/// Delays block the calling thread; embed the engine through
/// [`drive_workflow`](crate::runner::drive_workflow) instead when the host
/// is a concurrent runtime.
pub fn execute_workflow(
    definition: &WorkflowDefinition,
    runtime_inputs: &IndexMap<String, Value>,
    provider: &dyn ActionProvider,
) -> Result<RunReport, EngineError> {
    execute_workflow_at(definition, runtime_inputs, provider, Local::now().naive_local())
}

/// Executes a workflow synchronously with an explicit run clock.
///
/// The clock is captured into the run context once; templates and every
/// time/day gate observe the same instant for the whole run.
pub fn execute_workflow_at(
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
                thread::sleep(delay);
                results.push(dispatch_step(step, &mut context, provider));
            }
            Gate::Run => results.push(dispatch_step(step, &mut context, provider)),
        }
    }

    Ok(finalize_report(started, results))
}

/// Resolves runtime inputs against the declared inputs: a supplied value
/// wins, a default fills the gap, and a required input with neither
/// rejects the run. Extra runtime inputs pass through so templates may
/// reference them.
pub(crate) fn merge_inputs(
    definition: &WorkflowDefinition,
    runtime_inputs: &IndexMap<String, Value>,
) -> Result<IndexMap<String, Value>, EngineError> {
    let mut resolved = IndexMap::new();
    for input in &definition.inputs {
        if let Some(value) = runtime_inputs.get(&input.name) {
            resolved.insert(input.name.clone(), value.clone());
        } else if let Some(default) = &input.default {
            resolved.insert(input.name.clone(), default.clone());
        } else if input.required {
            return Err(EngineError::MissingRequiredInput { name: input.name.clone() });
        }
    }
    for (name, value) in runtime_inputs {
        if !resolved.contains_key(name) {
            resolved.insert(name.clone(), value.clone());
        }
    }
    Ok(resolved)
}

/// Records a gate skip: the report entry carries the reason and the
/// context slot stays empty so later references read emptiness.
pub(crate) fn skip_step(
    step: &PreparedStep,
    reason: String,
    context: &mut RunContext,
) -> StepReport {
    debug!(step = step.index, action = %step.action, reason = %reason, "step skipped");
    context.record(None);
    StepReport {
        step: step.index,
        action: step.action.clone(),
        status: StepStatus::Skipped,
        output: None,
        reason: Some(reason),
    }
}

/// Resolves the step's parameters and invokes the provider, normalizing
/// the outcome into a report entry. Never propagates a failure.
pub(crate) fn dispatch_step(
    step: &PreparedStep,
    context: &mut RunContext,
    provider: &dyn ActionProvider,
) -> StepReport {
    let resolved = match resolve_params(&step.params, context) {
        Ok(resolved) => resolved,
        Err(error) => {
            warn!(step = step.index, action = %step.action, error = %error, "template resolution failed");
            context.record(None);
            return StepReport {
                step: step.index,
                action: step.action.clone(),
                status: StepStatus::Error,
                output: None,
                reason: Some(error.to_string()),
            };
        }
    };

    match provider.invoke(&step.action, &resolved) {
        Ok(fields) => {
            debug!(step = step.index, action = %step.action, "step executed");
            context.record(Some(fields.clone()));
            StepReport {
                step: step.index,
                action: step.action.clone(),
                status: StepStatus::Ok,
                output: Some(fields),
                reason: None,
            }
        }
        Err(error) => {
            warn!(step = step.index, action = %step.action, error = %error, "action failed");
            context.record(None);
            StepReport {
                step: step.index,
                action: step.action.clone(),
                status: StepStatus::Error,
                output: None,
                reason: Some(error.to_string()),
            }
        }
    }
}

/// Builds the final report from accumulated step entries.
pub(crate) fn finalize_report(started: Instant, results: Vec<StepReport>) -> RunReport {
    let duration_ms = started.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
    RunReport {
        duration_ms,
        steps_executed: results.iter().filter(|r| r.status == StepStatus::Ok).count(),
        steps_skipped: results.iter().filter(|r| r.status == StepStatus::Skipped).count(),
        results,
    }
}
