//! Template resolution against a run context.
//!
//! Step parameters may embed `{{ ... }}` placeholders. This module parses
//! the recognized expressions, resolves them against the state accumulated
//! by the current run, and substitutes them into parameter values.
//!
//! ## Recognized expressions
//!
//! - `input.<name>`: a resolved runtime input
//! - `steps[<i>].<field>`: a field of step `i`'s recorded output
//! - `steps[<i>]`: the whole recorded output map of step `i`
//! - `timestamp` | `date` | `time`: derived from the clock captured at
//!   run start, formatted `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`, `HH:MM:SS`
//!
//! Substitution is textual when a placeholder sits inside a longer string.
//! A value that is wholly one placeholder is promoted to the referenced
//! value's native JSON type, so `{{ input.duration }}` used as a numeric
//! parameter stays a number. Every placeholder in a string resolves
//! against the same context snapshot.
//!
//! Unresolvable references fail with [`ResolveError`]; the dispatcher
//! turns that into a step-level `error` result rather than aborting the
//! run.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use baton_types::ResultFields;

/// Execution context for resolving templates and condition operands.
///
/// One context exists per run. It owns the merged inputs, the output slot
/// of every step processed so far, and the clock captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Resolved input values: runtime-supplied value, else the declared
    /// default. Extra runtime inputs pass through untouched.
    pub inputs: IndexMap<String, Value>,
    /// One slot per processed step, indexable by step position. `Some` for
    /// a step that produced output, `None` for a skipped or failed step.
    pub steps: Vec<Option<ResultFields>>,
    /// Wall-clock timestamp captured once at run start and used for the
    /// `timestamp`/`date`/`time` builtins and every time/day gate.
    pub now: NaiveDateTime,
}

impl RunContext {
    /// Creates a context with resolved inputs and a fixed run clock.
    pub fn new(inputs: IndexMap<String, Value>, now: NaiveDateTime) -> Self {
        Self { inputs, steps: Vec::new(), now }
    }

    /// Appends the output slot for the step just processed.
    pub fn record(&mut self, output: Option<ResultFields>) {
        self.steps.push(output);
    }
}

/// A parsed `{{ ... }}` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateExpr {
    /// `input.<name>`
    Input(String),
    /// `steps[<i>].<field>`
    StepField { index: usize, field: String },
    /// `steps[<i>]`
    Step { index: usize },
    /// `timestamp`
    Timestamp,
    /// `date`
    Date,
    /// `time`
    Time,
}

impl TemplateExpr {
    /// Parses the inner text of a placeholder.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        match trimmed {
            "timestamp" => return Ok(TemplateExpr::Timestamp),
            "date" => return Ok(TemplateExpr::Date),
            "time" => return Ok(TemplateExpr::Time),
            _ => {}
        }

        if let Some(name) = trimmed.strip_prefix("input.") {
            if name.is_empty() || !name.chars().all(is_identifier_character) {
                return Err(format!("'{name}' is not a valid input name"));
            }
            return Ok(TemplateExpr::Input(name.to_string()));
        }

        if let Some(rest) = trimmed.strip_prefix("steps[") {
            let Some(close) = rest.find(']') else {
                return Err("missing closing ']' in step reference".to_string());
            };
            let index: usize = rest[..close]
                .parse()
                .map_err(|_| format!("'{}' is not a step index", &rest[..close]))?;
            let remainder = &rest[close + 1..];
            if remainder.is_empty() {
                return Ok(TemplateExpr::Step { index });
            }
            let Some(field) = remainder.strip_prefix('.') else {
                return Err(format!("unexpected '{remainder}' after step index"));
            };
            if field.is_empty() || !field.chars().all(is_identifier_character) {
                return Err(format!("'{field}' is not a valid output field name"));
            }
            return Ok(TemplateExpr::StepField { index, field: field.to_string() });
        }

        Err(format!(
            "unsupported expression '{trimmed}'; supported are input.<name>, \
             steps[<i>].<field>, timestamp, date, time"
        ))
    }

    /// The step index this expression reads from, if any.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            TemplateExpr::StepField { index, .. } | TemplateExpr::Step { index } => Some(*index),
            _ => None,
        }
    }
}

/// Failure while resolving a template against the run context.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The referenced input or step field does not exist in this run.
    #[error("unresolved reference '{reference}': {detail}")]
    UnresolvedReference { reference: String, detail: String },
    /// The placeholder text is not a recognized expression.
    #[error("malformed placeholder '{placeholder}': {detail}")]
    MalformedPlaceholder { placeholder: String, detail: String },
}

/// Resolves every placeholder in a step's parameter map.
pub fn resolve_params(
    params: &IndexMap<String, Value>,
    context: &RunContext,
) -> Result<IndexMap<String, Value>, ResolveError> {
    let mut resolved = IndexMap::with_capacity(params.len());
    for (key, value) in params {
        resolved.insert(key.clone(), resolve_value(value, context)?);
    }
    Ok(resolved)
}

/// Recursively resolves placeholders in a JSON value.
///
/// Strings are interpolated; arrays and objects are walked element by
/// element; every other value passes through unchanged.
pub fn resolve_value(value: &Value, context: &RunContext) -> Result<Value, ResolveError> {
    match value {
        Value::String(text) => resolve_string(text, context),
        Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                resolved.push(resolve_value(item, context)?);
            }
            Ok(Value::Array(resolved))
        }
        Value::Object(map) => {
            let mut resolved = serde_json::Map::new();
            for (key, item) in map {
                resolved.insert(key.clone(), resolve_value(item, context)?);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

/// Interpolates one string value.
///
/// A string that is exactly one placeholder is promoted to the referenced
/// value's native type; otherwise each placeholder is substituted in place
/// and the surrounding text kept intact.
pub fn resolve_string(input: &str, context: &RunContext) -> Result<Value, ResolveError> {
    if let Some(inner) = whole_placeholder(input) {
        let expr = parse_placeholder(inner)?;
        return evaluate(&expr, context);
    }

    let mut output = String::new();
    let mut remaining = input;
    while let Some(start) = remaining.find("{{") {
        let (before, after) = remaining.split_at(start);
        output.push_str(before);

        let Some(end) = after.find("}}") else {
            return Err(ResolveError::MalformedPlaceholder {
                placeholder: after.to_string(),
                detail: "missing closing '}}'".to_string(),
            });
        };
        let expr = parse_placeholder(&after[2..end])?;
        let value = evaluate(&expr, context)?;
        output.push_str(&format_json_value(&value));
        remaining = &after[end + 2..];
    }

    if output.is_empty() && remaining == input {
        Ok(Value::String(input.to_string()))
    } else {
        output.push_str(remaining);
        Ok(Value::String(output))
    }
}

/// Returns the inner expression when the whole string is one placeholder.
fn whole_placeholder(input: &str) -> Option<&str> {
    let inner = input.strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.contains("{{") || inner.contains("}}") {
        return None;
    }
    Some(inner)
}

fn parse_placeholder(raw: &str) -> Result<TemplateExpr, ResolveError> {
    TemplateExpr::parse(raw).map_err(|detail| ResolveError::MalformedPlaceholder {
        placeholder: raw.trim().to_string(),
        detail,
    })
}

/// Evaluates a parsed expression to its native JSON value.
pub fn evaluate(expr: &TemplateExpr, context: &RunContext) -> Result<Value, ResolveError> {
    match expr {
        TemplateExpr::Input(name) => {
            context.inputs.get(name).cloned().ok_or_else(|| ResolveError::UnresolvedReference {
                reference: format!("input.{name}"),
                detail: "is not a declared input or supplied runtime value".to_string(),
            })
        }
        TemplateExpr::StepField { index, field } => {
            let fields = recorded_output(context, *index, &format!("steps[{index}].{field}"))?;
            fields.get(field).cloned().ok_or_else(|| ResolveError::UnresolvedReference {
                reference: format!("steps[{index}].{field}"),
                detail: format!("step {index} output has no field '{field}'"),
            })
        }
        TemplateExpr::Step { index } => {
            let fields = recorded_output(context, *index, &format!("steps[{index}]"))?;
            let mut map = serde_json::Map::new();
            for (key, value) in fields {
                map.insert(key.clone(), value.clone());
            }
            Ok(Value::Object(map))
        }
        TemplateExpr::Timestamp => {
            Ok(Value::String(context.now.format("%Y-%m-%d %H:%M:%S").to_string()))
        }
        TemplateExpr::Date => Ok(Value::String(context.now.format("%Y-%m-%d").to_string())),
        TemplateExpr::Time => Ok(Value::String(context.now.format("%H:%M:%S").to_string())),
    }
}

fn recorded_output<'a>(
    context: &'a RunContext,
    index: usize,
    reference: &str,
) -> Result<&'a ResultFields, ResolveError> {
    let slot = context.steps.get(index).ok_or_else(|| ResolveError::UnresolvedReference {
        reference: reference.to_string(),
        detail: format!("step {index} has not been processed yet"),
    })?;
    slot.as_ref().ok_or_else(|| ResolveError::UnresolvedReference {
        reference: reference.to_string(),
        detail: format!("step {index} recorded no output"),
    })
}

/// Formats a JSON value for textual substitution inside a longer string.
pub(crate) fn format_json_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Collects every placeholder found in a raw value, paired with its parse
/// outcome. Plan preparation uses this to reject malformed placeholders
/// and forward step references before any step runs.
pub(crate) fn scan_placeholders(value: &Value, found: &mut Vec<(String, Result<TemplateExpr, String>)>) {
    match value {
        Value::String(text) => {
            let mut remaining = text.as_str();
            while let Some(start) = remaining.find("{{") {
                let after = &remaining[start..];
                let Some(end) = after.find("}}") else {
                    found.push((after.to_string(), Err("missing closing '}}'".to_string())));
                    return;
                };
                let inner = after[2..end].trim();
                found.push((inner.to_string(), TemplateExpr::parse(inner)));
                remaining = &after[end + 2..];
            }
        }
        Value::Array(items) => {
            for item in items {
                scan_placeholders(item, found);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                scan_placeholders(item, found);
            }
        }
        _ => {}
    }
}

fn is_identifier_character(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '_' || character == '-'
}
