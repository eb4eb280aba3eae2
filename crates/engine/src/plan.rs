//! Plan preparation: structural validation ahead of execution.
//!
//! `prepare_plan` turns a workflow definition into an execution plan,
//! rejecting every definition error a document can express:
//! unknown actions, malformed conditions and placeholders, unparseable
//! time bounds, negative delays, and step references that do not point
//! strictly backwards. A definition that passes produces no errors of
//! these kinds at run time; a definition that fails produces no side
//! effects at all.

use std::time::Duration;

use chrono::NaiveTime;
use indexmap::IndexMap;
use serde_json::Value;

use baton_types::workflow::validation::{parse_time_bound, validate_definition_shape};
use baton_types::{StepSpec, Weekday, WorkflowDefinition};

use crate::condition::{Comparison, parse_condition};
use crate::error::EngineError;
use crate::provider::ActionProvider;
use crate::resolve::scan_placeholders;

/// A step with its gating fields parsed and validated. Parameters stay raw
/// until dispatch so templates see every prior step's output.
#[derive(Debug, Clone)]
pub struct PreparedStep {
    /// Position in document order; also the index later steps use to
    /// reference this step's output.
    pub index: usize,
    /// Validated action name.
    pub action: String,
    /// Raw parameters, templates unresolved.
    pub params: IndexMap<String, Value>,
    /// Parsed `if` condition, when present.
    pub condition: Option<Comparison>,
    /// Parsed inclusive lower time bound.
    pub time_after: Option<NaiveTime>,
    /// Parsed inclusive upper time bound.
    pub time_before: Option<NaiveTime>,
    /// Weekday allow-list.
    pub days: Option<Vec<Weekday>>,
    /// Pre-dispatch pause.
    pub delay: Option<Duration>,
}

/// An ordered, validated execution plan.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub steps: Vec<PreparedStep>,
}

/// Validates a definition against the provider's registry and parses every
/// gating field once.
pub fn prepare_plan(
    definition: &WorkflowDefinition,
    provider: &dyn ActionProvider,
) -> Result<Plan, EngineError> {
    validate_definition_shape(definition).map_err(EngineError::InvalidDefinition)?;

    let mut steps = Vec::with_capacity(definition.steps.len());
    for (index, step) in definition.steps.iter().enumerate() {
        steps.push(prepare_step(index, step, provider)?);
    }
    Ok(Plan { steps })
}

fn prepare_step(
    index: usize,
    step: &StepSpec,
    provider: &dyn ActionProvider,
) -> Result<PreparedStep, EngineError> {
    if !provider.contains(&step.action) {
        return Err(EngineError::UnknownAction { step: index, action: step.action.clone() });
    }

    let delay = match step.delay {
        None => None,
        Some(seconds) if seconds.is_finite() && seconds >= 0.0 => {
            Some(Duration::from_secs_f64(seconds))
        }
        Some(seconds) => return Err(EngineError::InvalidDelay { step: index, delay: seconds }),
    };

    let time_after = parse_bound(index, "time_after", step.time_after.as_deref())?;
    let time_before = parse_bound(index, "time_before", step.time_before.as_deref())?;

    let condition = match &step.r#if {
        None => None,
        Some(raw) => {
            let comparison =
                parse_condition(raw).map_err(|detail| EngineError::MalformedCondition {
                    step: index,
                    condition: raw.clone(),
                    detail,
                })?;
            for referenced in comparison.step_indices() {
                check_backward_reference(
                    index,
                    referenced,
                    &format!("steps[{referenced}] in condition"),
                )?;
            }
            Some(comparison)
        }
    };

    let mut placeholders = Vec::new();
    scan_placeholders(&Value::Object(params_as_object(&step.params)), &mut placeholders);
    for (raw, parsed) in placeholders {
        let expr = parsed.map_err(|detail| EngineError::MalformedPlaceholder {
            step: index,
            placeholder: raw.clone(),
            detail,
        })?;
        if let Some(referenced) = expr.step_index() {
            check_backward_reference(index, referenced, &raw)?;
        }
    }

    Ok(PreparedStep {
        index,
        action: step.action.clone(),
        params: step.params.clone(),
        condition,
        time_after,
        time_before,
        days: step.days.clone(),
        delay,
    })
}

fn parse_bound(
    step: usize,
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<NaiveTime>, EngineError> {
    raw.map(|value| {
        parse_time_bound(value).map_err(|detail| EngineError::InvalidTimeBound {
            step,
            field,
            value: value.to_string(),
            detail,
        })
    })
    .transpose()
}

fn check_backward_reference(
    step: usize,
    referenced: usize,
    reference: &str,
) -> Result<(), EngineError> {
    if referenced >= step {
        let detail = if referenced == step {
            "a step cannot reference its own output".to_string()
        } else {
            format!("step {referenced} runs after step {step}")
        };
        return Err(EngineError::InvalidStepReference {
            step,
            reference: reference.to_string(),
            detail,
        });
    }
    Ok(())
}

fn params_as_object(params: &IndexMap<String, Value>) -> serde_json::Map<String, Value> {
    params.iter().map(|(key, value)| (key.clone(), value.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::EchoProvider;
    use serde_json::json;

    fn definition(yaml_text: &str) -> WorkflowDefinition {
        serde_yaml::from_str(yaml_text).expect("test workflow parses")
    }

    struct OnlyNotify;
    impl ActionProvider for OnlyNotify {
        fn contains(&self, action: &str) -> bool {
            action == "notify"
        }
        fn invoke(
            &self,
            _action: &str,
            _params: &IndexMap<String, Value>,
        ) -> Result<baton_types::ResultFields, baton_types::ActionError> {
            Ok(baton_types::ResultFields::new())
        }
    }

    #[test]
    fn prepares_gating_fields_once() {
        let workflow = definition(
            r#"
name: gated
steps:
  - action: notify
    time_after: "09:00"
    time_before: "17:00"
    days: [thu]
    delay: 1.5
    if: "input.flag == 'on'"
"#,
        );
        let plan = prepare_plan(&workflow, &EchoProvider).expect("plan");
        let step = &plan.steps[0];
        assert_eq!(step.time_after, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(step.time_before, NaiveTime::from_hms_opt(17, 0, 0));
        assert_eq!(step.days, Some(vec![Weekday::Thu]));
        assert_eq!(step.delay, Some(Duration::from_millis(1500)));
        assert!(step.condition.is_some());
    }

    #[test]
    fn rejects_unknown_actions() {
        let workflow = definition(
            r#"
name: unknown
steps:
  - action: notify
  - action: levitate
"#,
        );
        let error = prepare_plan(&workflow, &OnlyNotify).expect_err("should fail");
        assert!(
            matches!(error, EngineError::UnknownAction { step: 1, ref action } if action == "levitate"),
            "unexpected error: {error}"
        );
    }

    #[test]
    fn rejects_malformed_conditions() {
        let workflow = definition(
            r#"
name: badif
steps:
  - action: notify
    if: "whenever you feel like it"
"#,
        );
        let error = prepare_plan(&workflow, &EchoProvider).expect_err("should fail");
        assert!(matches!(error, EngineError::MalformedCondition { step: 0, .. }));
    }

    #[test]
    fn rejects_forward_and_self_references_in_templates() {
        let forward = definition(
            r#"
name: forward
steps:
  - action: notify
    params:
      text: "{{ steps[1].text }}"
  - action: notify
"#,
        );
        let error = prepare_plan(&forward, &EchoProvider).expect_err("forward should fail");
        assert!(matches!(error, EngineError::InvalidStepReference { step: 0, .. }));

        let own = definition(
            r#"
name: self-ref
steps:
  - action: notify
    params:
      text: "{{ steps[0].text }}"
"#,
        );
        let error = prepare_plan(&own, &EchoProvider).expect_err("self reference should fail");
        assert!(error.to_string().contains("own output"), "unexpected error: {error}");
    }

    #[test]
    fn rejects_forward_references_in_conditions() {
        let workflow = definition(
            r#"
name: forward-if
steps:
  - action: notify
    if: "steps[2].status == 'ok'"
  - action: notify
"#,
        );
        let error = prepare_plan(&workflow, &EchoProvider).expect_err("should fail");
        assert!(matches!(error, EngineError::InvalidStepReference { step: 0, .. }));
    }

    #[test]
    fn rejects_malformed_placeholders() {
        let workflow = definition(
            r#"
name: badtpl
steps:
  - action: notify
    params:
      text: "{{ outputs.of.nowhere }}"
"#,
        );
        let error = prepare_plan(&workflow, &EchoProvider).expect_err("should fail");
        assert!(matches!(error, EngineError::MalformedPlaceholder { step: 0, .. }));
    }

    #[test]
    fn rejects_malformed_time_bounds() {
        let workflow = definition(
            r#"
name: badtime
steps:
  - action: notify
    time_after: "9am"
"#,
        );
        let error = prepare_plan(&workflow, &EchoProvider).expect_err("should fail");
        assert!(
            matches!(error, EngineError::InvalidTimeBound { step: 0, field: "time_after", .. }),
            "unexpected error: {error}"
        );
    }

    #[test]
    fn rejects_negative_delay() {
        let mut workflow = definition(
            r#"
name: delayed
steps:
  - action: notify
"#,
        );
        workflow.steps[0].delay = Some(-0.5);
        let error = prepare_plan(&workflow, &EchoProvider).expect_err("should fail");
        assert!(matches!(error, EngineError::InvalidDelay { step: 0, .. }));
    }

    #[test]
    fn rejects_invalid_shape_as_a_single_error() {
        let workflow = WorkflowDefinition {
            name: "Not A Slug".to_string(),
            description: None,
            inputs: Vec::new(),
            steps: Vec::new(),
        };
        let error = prepare_plan(&workflow, &EchoProvider).expect_err("should fail");
        assert!(matches!(error, EngineError::InvalidDefinition(_)));
    }

    #[test]
    fn backward_references_are_accepted() {
        let workflow = definition(
            r#"
name: chained
steps:
  - action: notify
  - action: notify
    params:
      text: "{{ steps[0].text }}"
    if: "steps[0].text != ''"
"#,
        );
        let plan = prepare_plan(&workflow, &EchoProvider).expect("plan");
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[1].params.get("text"), Some(&json!("{{ steps[0].text }}")));
    }
}
