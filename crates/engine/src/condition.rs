//! The `if` gate's comparison language.
//!
//! A condition is one comparison: `<source>.<field> <op> <value>`, where
//! the source is `input` or `steps[<i>]` and the operator is one of
//! `==`, `!=`, `>`, `<`, `>=`, `<=`. Conditions are parsed into a small
//! AST once during plan preparation and evaluated per run without
//! re-parsing; a string that does not parse is a definition error, not a
//! runtime skip.
//!
//! Comparison semantics: both sides are first coerced to numbers; when
//! either side is non-numeric, `==`/`!=` fall back to string comparison
//! and the relational operators evaluate to false. A reference to a step
//! that recorded no output (skipped or failed) reads as emptiness, so
//! `!= ''` fails and `== ''` succeeds for it.

use serde_json::Value;

use crate::resolve::{RunContext, format_json_value};

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `input.<name>`
    Input(String),
    /// `steps[<i>].<field>`
    StepField { index: usize, field: String },
    /// A literal string, number, or boolean.
    Literal(Value),
}

/// Supported comparison operators, in scan order. Two-character operators
/// come first so `>=` never parses as `>` followed by garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Ne,
    Eq,
    Ge,
    Le,
    Gt,
    Lt,
}

impl CompareOp {
    const SCAN_ORDER: [(CompareOp, &'static str); 6] = [
        (CompareOp::Ne, "!="),
        (CompareOp::Eq, "=="),
        (CompareOp::Ge, ">="),
        (CompareOp::Le, "<="),
        (CompareOp::Gt, ">"),
        (CompareOp::Lt, "<"),
    ];

    fn symbol(self) -> &'static str {
        Self::SCAN_ORDER
            .iter()
            .find(|(op, _)| *op == self)
            .map(|(_, symbol)| *symbol)
            .expect("every operator has a symbol")
    }
}

/// A parsed condition, ready for repeated evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub left: Operand,
    pub op: CompareOp,
    pub right: Operand,
}

impl Comparison {
    /// The step indices this comparison reads from.
    pub fn step_indices(&self) -> impl Iterator<Item = usize> + '_ {
        [&self.left, &self.right].into_iter().filter_map(|operand| match operand {
            Operand::StepField { index, .. } => Some(*index),
            _ => None,
        })
    }
}

/// Parses a condition string into its AST.
pub fn parse_condition(raw: &str) -> Result<Comparison, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("condition cannot be empty".to_string());
    }

    for (op, symbol) in CompareOp::SCAN_ORDER {
        let Some(position) = find_operator(trimmed, symbol) else {
            continue;
        };
        let left_text = trimmed[..position].trim();
        let right_text = trimmed[position + symbol.len()..].trim();
        if left_text.is_empty() || right_text.is_empty() {
            return Err(format!("'{}' needs both a left and a right operand", op.symbol()));
        }
        let left = parse_reference(left_text).ok_or_else(|| {
            format!("left side '{left_text}' must be input.<name> or steps[<i>].<field>")
        })?;
        let right = parse_literal_or_reference(right_text)?;
        return Ok(Comparison { left, op, right });
    }

    Err("missing comparison operator (==, !=, >, <, >=, <=)".to_string())
}

/// Finds an operator outside quoted literals.
fn find_operator(expression: &str, operator: &str) -> Option<usize> {
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    for (index, character) in expression.char_indices() {
        match character {
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                continue;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                continue;
            }
            _ => {}
        }
        if !in_single_quote && !in_double_quote && expression[index..].starts_with(operator) {
            return Some(index);
        }
    }

    None
}

fn parse_reference(text: &str) -> Option<Operand> {
    if let Some(name) = text.strip_prefix("input.") {
        if name.is_empty() || !name.chars().all(is_identifier_character) {
            return None;
        }
        return Some(Operand::Input(name.to_string()));
    }
    if let Some(rest) = text.strip_prefix("steps[") {
        let close = rest.find(']')?;
        let index: usize = rest[..close].parse().ok()?;
        let field = rest[close + 1..].strip_prefix('.')?;
        if field.is_empty() || !field.chars().all(is_identifier_character) {
            return None;
        }
        return Some(Operand::StepField { index, field: field.to_string() });
    }
    None
}

/// Right sides accept quoted strings, numbers, booleans, a second
/// reference, or a bare word treated as a string literal.
fn parse_literal_or_reference(text: &str) -> Result<Operand, String> {
    if let Some(inner) = strip_quotes(text) {
        return Ok(Operand::Literal(Value::String(inner.to_string())));
    }
    match text {
        "true" => return Ok(Operand::Literal(Value::Bool(true))),
        "false" => return Ok(Operand::Literal(Value::Bool(false))),
        _ => {}
    }
    if let Ok(integer) = text.parse::<i64>() {
        return Ok(Operand::Literal(Value::from(integer)));
    }
    if let Ok(float) = text.parse::<f64>() {
        let number = serde_json::Number::from_f64(float)
            .ok_or_else(|| format!("'{text}' is not a finite number"))?;
        return Ok(Operand::Literal(Value::Number(number)));
    }
    if let Some(reference) = parse_reference(text) {
        return Ok(reference);
    }
    if text.contains(char::is_whitespace) {
        return Err(format!("'{text}' is not a recognized literal or reference"));
    }
    Ok(Operand::Literal(Value::String(text.to_string())))
}

fn strip_quotes(text: &str) -> Option<&str> {
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return Some(&text[1..text.len() - 1]);
        }
    }
    None
}

/// Evaluates a parsed comparison against the run context.
pub fn eval_comparison(comparison: &Comparison, context: &RunContext) -> bool {
    let left = resolve_operand(&comparison.left, context);
    let right = resolve_operand(&comparison.right, context);

    if let (Some(left_number), Some(right_number)) = (as_number(&left), as_number(&right)) {
        return match comparison.op {
            CompareOp::Eq => left_number == right_number,
            CompareOp::Ne => left_number != right_number,
            CompareOp::Gt => left_number > right_number,
            CompareOp::Lt => left_number < right_number,
            CompareOp::Ge => left_number >= right_number,
            CompareOp::Le => left_number <= right_number,
        };
    }

    let left_text = left.as_ref().map(format_json_value).unwrap_or_default();
    let right_text = right.as_ref().map(format_json_value).unwrap_or_default();
    match comparison.op {
        CompareOp::Eq => left_text == right_text,
        CompareOp::Ne => left_text != right_text,
        // Relational comparison is only defined for numbers.
        _ => false,
    }
}

/// Resolves an operand to its current value; `None` stands for emptiness
/// (an unknown input, or a step that recorded no output).
fn resolve_operand(operand: &Operand, context: &RunContext) -> Option<Value> {
    match operand {
        Operand::Input(name) => context.inputs.get(name).cloned(),
        Operand::StepField { index, field } => context
            .steps
            .get(*index)
            .and_then(|slot| slot.as_ref())
            .and_then(|fields| fields.get(field))
            .cloned(),
        Operand::Literal(value) => Some(value.clone()),
    }
}

fn as_number(value: &Option<Value>) -> Option<f64> {
    match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn is_identifier_character(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '_' || character == '-'
}
