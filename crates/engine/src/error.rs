//! Definition-level error taxonomy.
//!
//! Everything here is detected during plan preparation, before any side
//! effect occurs. Runtime problems (unresolved template references, action
//! failures) never surface as these errors; they become step-level `error`
//! results instead so the run always completes with a full report.

use thiserror::Error;

/// A structural problem in a workflow definition, raised before execution
/// begins. A workflow that produces one of these never yields a partial
/// report.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The step names an action the provider's registry does not know.
    #[error("step {step}: unknown action '{action}'")]
    UnknownAction { step: usize, action: String },

    /// The step's `if` expression does not follow the supported
    /// `<source>.<field> <op> <value>` grammar.
    #[error("step {step}: malformed condition '{condition}': {detail}")]
    MalformedCondition {
        step: usize,
        condition: String,
        detail: String,
    },

    /// A `time_after`/`time_before` bound is not a valid `HH:MM` time.
    #[error("step {step}: invalid {field} '{value}': {detail}")]
    InvalidTimeBound {
        step: usize,
        field: &'static str,
        value: String,
        detail: String,
    },

    /// A `steps[<i>]` reference points at the referencing step itself, a
    /// later step, or an index outside the workflow.
    #[error("step {step}: invalid step reference '{reference}': {detail}")]
    InvalidStepReference {
        step: usize,
        reference: String,
        detail: String,
    },

    /// A `{{ ... }}` placeholder in the step's parameters is unparseable.
    #[error("step {step}: malformed placeholder '{placeholder}': {detail}")]
    MalformedPlaceholder {
        step: usize,
        placeholder: String,
        detail: String,
    },

    /// `delay` is negative or not a finite number of seconds.
    #[error("step {step}: delay must be a non-negative number of seconds, got {delay}")]
    InvalidDelay { step: usize, delay: f64 },

    /// A declared required input has neither a runtime value nor a default.
    #[error("missing required input '{name}'")]
    MissingRequiredInput { name: String },

    /// The document shape itself is invalid (bad name slug, duplicate
    /// inputs, empty action, and similar).
    #[error("invalid workflow definition: {0}")]
    InvalidDefinition(String),
}
