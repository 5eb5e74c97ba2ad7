//! Structural predicates over untrusted wire values
//!
//! Used while parsing half-typed editor input, so every predicate answers
//! `false` on a type mismatch instead of failing.

use mbql_registry::registry;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::expr::FieldRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Literal,
    Operator,
    Function,
    Dimension,
    BooleanLiteral,
    Metric,
    Segment,
    Case,
}

/// First matching node kind, checked in the same order as [`is_expression`]
pub fn classify(expr: &JsonValue) -> Option<NodeKind> {
    if is_literal(expr) {
        Some(NodeKind::Literal)
    } else if is_operator(expr) {
        Some(NodeKind::Operator)
    } else if is_function(expr) {
        Some(NodeKind::Function)
    } else if is_dimension(expr) {
        Some(NodeKind::Dimension)
    } else if is_boolean_literal(expr) {
        Some(NodeKind::BooleanLiteral)
    } else if is_metric(expr) {
        Some(NodeKind::Metric)
    } else if is_segment(expr) {
        Some(NodeKind::Segment)
    } else if is_case(expr) {
        Some(NodeKind::Case)
    } else {
        None
    }
}

pub fn is_expression(expr: &JsonValue) -> bool {
    classify(expr).is_some()
}

/// String or number. Booleans are classified separately.
pub fn is_literal(expr: &JsonValue) -> bool {
    is_string_literal(expr) || is_number_literal(expr)
}

pub fn is_string_literal(expr: &JsonValue) -> bool {
    expr.is_string()
}

pub fn is_number_literal(expr: &JsonValue) -> bool {
    expr.is_number()
}

pub fn is_boolean_literal(expr: &JsonValue) -> bool {
    expr.is_boolean()
}

/// Last element is a plain object
pub fn has_options(expr: &JsonValue) -> bool {
    matches!(
        expr.as_array().and_then(|items| items.last()),
        Some(JsonValue::Object(_))
    )
}

pub fn is_operator(expr: &JsonValue) -> bool {
    is_call(expr, |name| registry().is_operator(name))
}

pub fn is_function(expr: &JsonValue) -> bool {
    is_call(expr, |name| registry().is_function(name))
}

fn is_call(expr: &JsonValue, known: impl Fn(&str) -> bool) -> bool {
    let Some(items) = expr.as_array() else {
        return false;
    };
    let Some(name) = items.first().and_then(JsonValue::as_str) else {
        return false;
    };
    if !known(name) {
        return false;
    }
    let end = if has_options(expr) && items.len() > 1 {
        items.len() - 1
    } else {
        items.len()
    };
    items[1..end].iter().all(is_expression)
}

/// `field`, `expression` or `aggregation` reference
pub fn is_dimension(expr: &JsonValue) -> bool {
    FieldRef::from_wire(expr).is_ok()
}

pub fn is_metric(expr: &JsonValue) -> bool {
    is_reference(expr, "metric")
}

pub fn is_segment(expr: &JsonValue) -> bool {
    is_reference(expr, "segment")
}

fn is_reference(expr: &JsonValue, head: &str) -> bool {
    matches!(
        expr.as_array().map(Vec::as_slice),
        Some([JsonValue::String(name), JsonValue::Number(_)]) if name == head
    )
}

/// Only the head is checked; branches are validated on conversion.
pub fn is_case(expr: &JsonValue) -> bool {
    matches!(
        expr.as_array().and_then(|items| items.first()),
        Some(JsonValue::String(name)) if name == "case"
    )
}
