//! Strongly typed workflow document definitions shared across the engine,
//! the repository, and any caller-side surface.
//!
//! The models defined here mirror the authoring shape of a workflow
//! document: a named, ordered list of steps plus declared inputs. They
//! intentionally preserve authoring order (via `IndexMap` for step
//! parameters and `Vec` for inputs and steps) so execution and any editing
//! surface see the document exactly as the author wrote it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub mod validation;

/// Describes a fully authored workflow: metadata, declared inputs, and the
/// ordered steps executed sequentially.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowDefinition {
    /// Canonical workflow identifier in slug form (for example,
    /// `morning-focus`). Immutable once stored under that key.
    #[serde(default)]
    pub name: String,
    /// Optional descriptive copy surfaced by listing and editing surfaces.
    #[serde(default)]
    pub description: Option<String>,
    /// Declared inputs in authoring order. Names are unique within the
    /// workflow.
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    /// Ordered list of steps. Document order is the execution order; the
    /// engine never reorders.
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

/// Declares a single runtime input for a workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputSpec {
    /// Input name referenced by `{{ input.<name> }}` templates and
    /// `input.<name>` conditions.
    pub name: String,
    /// Default value applied when no runtime value is supplied.
    #[serde(default)]
    pub default: Option<JsonValue>,
    /// When true, a run without a runtime value and without a default is
    /// rejected before any step executes.
    #[serde(default)]
    pub required: bool,
}

/// One gated invocation of an action with templated parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepSpec {
    /// Name of the capability to invoke, resolved against the action
    /// provider's registry at plan time.
    pub action: String,
    /// Raw parameters passed to the action. String values may embed
    /// `{{ ... }}` placeholders resolved against the run context.
    #[serde(default = "default_param_map")]
    pub params: IndexMap<String, JsonValue>,
    /// Optional pause, in seconds, applied after the step's gates pass and
    /// before the action is invoked.
    #[serde(default)]
    pub delay: Option<f64>,
    /// Inclusive `HH:MM` lower bound; the step only runs at or after this
    /// local wall-clock time.
    #[serde(default)]
    pub time_after: Option<String>,
    /// Inclusive `HH:MM` upper bound; the step only runs at or before this
    /// local wall-clock time.
    #[serde(default)]
    pub time_before: Option<String>,
    /// Weekday allow-list; when present the step only runs on these days.
    #[serde(default)]
    pub days: Option<Vec<Weekday>>,
    /// Optional condition of the form `<source>.<field> <op> <value>`.
    /// Checked together with the time/day gates; all present gates must
    /// pass for the step to run.
    #[serde(default, rename = "if")]
    pub r#if: Option<String>,
}

/// Weekday tokens accepted by the `days` gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    /// Lowercase token as written in workflow documents.
    pub fn token(self) -> &'static str {
        match self {
            Weekday::Mon => "mon",
            Weekday::Tue => "tue",
            Weekday::Wed => "wed",
            Weekday::Thu => "thu",
            Weekday::Fri => "fri",
            Weekday::Sat => "sat",
            Weekday::Sun => "sun",
        }
    }

    /// Converts from the chrono weekday of a run clock.
    pub fn from_chrono(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Mon,
            chrono::Weekday::Tue => Weekday::Tue,
            chrono::Weekday::Wed => Weekday::Wed,
            chrono::Weekday::Thu => Weekday::Thu,
            chrono::Weekday::Fri => Weekday::Fri,
            chrono::Weekday::Sat => Weekday::Sat,
            chrono::Weekday::Sun => Weekday::Sun,
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

fn default_param_map() -> IndexMap<String, JsonValue> {
    IndexMap::new()
}
