//! Validation helpers shared across workflow consumers.
//!
//! These routines check the shape of a workflow document independently of
//! any action registry: identifier form, input uniqueness, delay sign, and
//! time bound syntax. Registry-dependent checks (unknown actions, template
//! references) belong to the engine's plan preparation.

use chrono::NaiveTime;
use regex::Regex;

use super::WorkflowDefinition;

/// Pattern a workflow name must match: lowercase alphanumeric segments
/// separated by single hyphens.
const NAME_PATTERN: &str = "^[a-z0-9]+(?:-[a-z0-9]+)*$";

/// Validate the document shape of a workflow definition.
///
/// Returns the first problem found as a human-readable message. The checks
/// cover what any storing surface needs before accepting a document: the
/// name is a non-empty slug, input names are unique, and every step names
/// an action. Field-level gating checks (delay sign, time bound syntax,
/// condition grammar) are owned by the engine's plan preparation, which
/// reports them as typed errors.
pub fn validate_definition_shape(definition: &WorkflowDefinition) -> Result<(), String> {
    let name_pattern = Regex::new(NAME_PATTERN).expect("name pattern is valid");
    if !name_pattern.is_match(&definition.name) {
        return Err(format!(
            "workflow name '{}' must be a lowercase, hyphen-separated slug",
            definition.name
        ));
    }

    let mut seen_inputs = std::collections::HashSet::new();
    for input in &definition.inputs {
        if input.name.is_empty() {
            return Err("input names cannot be empty".to_string());
        }
        if !seen_inputs.insert(input.name.as_str()) {
            return Err(format!("duplicate input '{}'", input.name));
        }
    }

    for (index, step) in definition.steps.iter().enumerate() {
        if step.action.is_empty() {
            return Err(format!("step {index} is missing an action"));
        }
    }

    Ok(())
}

/// Parse an `HH:MM` wall-clock bound.
pub fn parse_time_bound(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| "expected a wall-clock time in HH:MM form".to_string())
}
