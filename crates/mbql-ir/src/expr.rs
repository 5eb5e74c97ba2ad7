//! Expression trees and their array-shaped wire form
//!
//! On the wire every non-literal node is a JSON array whose first element
//! names the clause: `["+", 1, ["field", 10, null]]`. Inside the crate the
//! same tree is the closed [`Expression`] sum type. [`Expression::from_wire`]
//! is the only way in and [`Expression::to_wire`] the only way out.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Number, Value as JsonValue};
use thiserror::Error;

/// Trailing key-value record of a clause
pub type Options = Map<String, JsonValue>;

#[derive(Debug, Error, PartialEq)]
pub enum WireError {
    #[error("Not an expression: {0}")]
    NotAnExpression(String),

    #[error("Unknown clause: {0}")]
    UnknownClause(String),

    #[error("Malformed {clause} clause: {reason}")]
    Malformed { clause: String, reason: String },
}

impl WireError {
    fn malformed(clause: &str, reason: impl Into<String>) -> Self {
        WireError::Malformed {
            clause: clause.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(Number),
    Boolean(bool),
}

impl Literal {
    /// Integral values are kept as integers so they render without a
    /// fractional part. Non-finite values have no literal form.
    pub fn from_f64(value: f64) -> Option<Literal> {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            return Some(Literal::Number(Number::from(value as i64)));
        }
        Number::from_f64(value).map(Literal::Number)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Identifier of a column inside a `field` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldId {
    /// Database field id
    Id(i64),
    /// Column name, used for native results and later stages
    Name(String),
}

/// Structured pointer to a column
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRef {
    Field { id: FieldId, options: Option<Options> },
    Expression { name: String, options: Option<Options> },
    Aggregation { index: usize, options: Option<Options> },
}

/// Options that select a bucketing of the column rather than another column
const BUCKETING_OPTIONS: &[&str] = &["temporal-unit", "binning", "base-type", "effective-type"];

impl FieldRef {
    pub fn field(id: i64) -> Self {
        FieldRef::Field {
            id: FieldId::Id(id),
            options: None,
        }
    }

    pub fn named(name: impl Into<String>, base_type: &str) -> Self {
        let mut options = Options::new();
        options.insert("base-type".to_string(), json!(base_type));
        FieldRef::Field {
            id: FieldId::Name(name.into()),
            options: Some(options),
        }
    }

    pub fn aggregation(index: usize) -> Self {
        FieldRef::Aggregation { index, options: None }
    }

    pub fn options(&self) -> Option<&Options> {
        match self {
            FieldRef::Field { options, .. }
            | FieldRef::Expression { options, .. }
            | FieldRef::Aggregation { options, .. } => options.as_ref(),
        }
    }

    fn options_mut(&mut self) -> &mut Option<Options> {
        match self {
            FieldRef::Field { options, .. }
            | FieldRef::Expression { options, .. }
            | FieldRef::Aggregation { options, .. } => options,
        }
    }

    pub fn option(&self, key: &str) -> Option<&JsonValue> {
        self.options().and_then(|options| options.get(key))
    }

    pub fn with_option(mut self, key: &str, value: JsonValue) -> Self {
        self.options_mut()
            .get_or_insert_with(Options::new)
            .insert(key.to_string(), value);
        self
    }

    pub fn without_option(mut self, key: &str) -> Self {
        let options = self.options_mut();
        if let Some(map) = options {
            map.remove(key);
            if map.is_empty() {
                *options = None;
            }
        }
        self
    }

    pub fn temporal_unit(&self) -> Option<&str> {
        self.option("temporal-unit").and_then(JsonValue::as_str)
    }

    pub fn with_temporal_unit(self, unit: &str) -> Self {
        self.with_option("temporal-unit", json!(unit))
    }

    /// Field id through which this column is implicitly joined
    pub fn source_field(&self) -> Option<i64> {
        self.option("source-field").and_then(JsonValue::as_i64)
    }

    /// True when both refs point at the same column, ignoring bucketing and
    /// type hints.
    pub fn same_column(&self, other: &FieldRef) -> bool {
        let identity_matches = match (self, other) {
            (FieldRef::Field { id: a, .. }, FieldRef::Field { id: b, .. }) => a == b,
            (FieldRef::Expression { name: a, .. }, FieldRef::Expression { name: b, .. }) => a == b,
            (FieldRef::Aggregation { index: a, .. }, FieldRef::Aggregation { index: b, .. }) => {
                a == b
            }
            _ => false,
        };
        identity_matches && self.identity_options() == other.identity_options()
    }

    fn identity_options(&self) -> Options {
        self.options()
            .map(|options| {
                options
                    .iter()
                    .filter(|(key, _)| !BUCKETING_OPTIONS.contains(&key.as_str()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn from_wire(value: &JsonValue) -> Result<FieldRef, WireError> {
        let items = value
            .as_array()
            .ok_or_else(|| WireError::NotAnExpression(value.to_string()))?;
        let head = items
            .first()
            .and_then(JsonValue::as_str)
            .ok_or_else(|| WireError::NotAnExpression(value.to_string()))?;

        if !(2..=3).contains(&items.len()) {
            return Err(WireError::malformed(head, "expected 2 or 3 elements"));
        }
        let options = match items.get(2) {
            None | Some(JsonValue::Null) if head == "field" => None,
            None => None,
            Some(JsonValue::Object(map)) => Some(map.clone()),
            Some(_) => return Err(WireError::malformed(head, "options must be an object")),
        };

        match head {
            "field" => {
                let id = match &items[1] {
                    JsonValue::Number(n) => FieldId::Id(
                        n.as_i64()
                            .ok_or_else(|| WireError::malformed(head, "field id must be an integer"))?,
                    ),
                    JsonValue::String(name) => FieldId::Name(name.clone()),
                    _ => return Err(WireError::malformed(head, "expected an id or a name")),
                };
                Ok(FieldRef::Field { id, options })
            }
            "expression" => {
                let name = items[1]
                    .as_str()
                    .ok_or_else(|| WireError::malformed(head, "expected a name"))?;
                Ok(FieldRef::Expression {
                    name: name.to_string(),
                    options,
                })
            }
            "aggregation" => {
                let index = items[1]
                    .as_u64()
                    .ok_or_else(|| WireError::malformed(head, "expected a non-negative index"))?;
                Ok(FieldRef::Aggregation {
                    index: index as usize,
                    options,
                })
            }
            other => Err(WireError::UnknownClause(other.to_string())),
        }
    }

    pub fn to_wire(&self) -> JsonValue {
        match self {
            FieldRef::Field { id, options } => {
                let id = match id {
                    FieldId::Id(id) => json!(id),
                    FieldId::Name(name) => json!(name),
                };
                let options = options
                    .as_ref()
                    .map(|o| JsonValue::Object(o.clone()))
                    .unwrap_or(JsonValue::Null);
                json!(["field", id, options])
            }
            FieldRef::Expression { name, options } => match options {
                Some(options) => json!(["expression", name, options]),
                None => json!(["expression", name]),
            },
            FieldRef::Aggregation { index, options } => match options {
                Some(options) => json!(["aggregation", index, options]),
                None => json!(["aggregation", index]),
            },
        }
    }
}

/// Operator or function application
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expression>,
    pub options: Option<Options>,
}

impl Call {
    pub fn new(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Self {
            name: name.into(),
            args,
            options: None,
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    pub branches: Vec<(Expression, Expression)>,
    pub default: Option<Box<Expression>>,
}

/// Expression types
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Operator(Call),
    Function(Call),
    Dimension(FieldRef),
    Metric(i64),
    Segment(i64),
    Case(CaseExpr),
}

impl From<FieldRef> for Expression {
    fn from(field_ref: FieldRef) -> Self {
        Expression::Dimension(field_ref)
    }
}

impl Expression {
    pub fn string(value: impl Into<String>) -> Self {
        Expression::Literal(Literal::String(value.into()))
    }

    pub fn integer(value: i64) -> Self {
        Expression::Literal(Literal::Number(Number::from(value)))
    }

    /// `None` for NaN and infinities
    pub fn number(value: f64) -> Option<Self> {
        Literal::from_f64(value).map(Expression::Literal)
    }

    pub fn boolean(value: bool) -> Self {
        Expression::Literal(Literal::Boolean(value))
    }

    /// Operator when the registry knows `name` as one, function otherwise
    pub fn call(name: &str, args: Vec<Expression>) -> Self {
        let call = Call::new(name, args);
        if mbql_registry::registry().is_operator(name) {
            Expression::Operator(call)
        } else {
            Expression::Function(call)
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Expression::Operator(call) | Expression::Function(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_field_ref(&self) -> Option<&FieldRef> {
        match self {
            Expression::Dimension(field_ref) => Some(field_ref),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expression::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    /// Clause name for calls, `None` for everything else
    pub fn head(&self) -> Option<&str> {
        self.as_call().map(|call| call.name.as_str())
    }

    pub fn from_wire(value: &JsonValue) -> Result<Expression, WireError> {
        match value {
            JsonValue::String(s) => Ok(Expression::string(s.clone())),
            JsonValue::Number(n) => Ok(Expression::Literal(Literal::Number(n.clone()))),
            JsonValue::Bool(b) => Ok(Expression::boolean(*b)),
            JsonValue::Array(items) => {
                let head = items
                    .first()
                    .and_then(JsonValue::as_str)
                    .ok_or_else(|| WireError::NotAnExpression(value.to_string()))?;
                match head {
                    "metric" | "segment" => {
                        let id = match items.as_slice() {
                            [_, JsonValue::Number(n)] => n.as_i64().ok_or_else(|| {
                                WireError::malformed(head, "id must be an integer")
                            })?,
                            _ => return Err(WireError::malformed(head, "expected [head, id]")),
                        };
                        Ok(if head == "metric" {
                            Expression::Metric(id)
                        } else {
                            Expression::Segment(id)
                        })
                    }
                    "case" => parse_case(items),
                    "field" | "expression" | "aggregation" => {
                        FieldRef::from_wire(value).map(Expression::Dimension)
                    }
                    name => {
                        let registry = mbql_registry::registry();
                        let is_operator = registry.is_operator(name);
                        if !is_operator && !registry.is_function(name) {
                            return Err(WireError::UnknownClause(name.to_string()));
                        }
                        let call = parse_call(name, items)?;
                        Ok(if is_operator {
                            Expression::Operator(call)
                        } else {
                            Expression::Function(call)
                        })
                    }
                }
            }
            _ => Err(WireError::NotAnExpression(value.to_string())),
        }
    }

    pub fn to_wire(&self) -> JsonValue {
        match self {
            Expression::Literal(Literal::String(s)) => json!(s),
            Expression::Literal(Literal::Number(n)) => JsonValue::Number(n.clone()),
            Expression::Literal(Literal::Boolean(b)) => json!(b),
            Expression::Operator(call) | Expression::Function(call) => {
                let mut items = Vec::with_capacity(call.args.len() + 2);
                items.push(json!(call.name));
                items.extend(call.args.iter().map(Expression::to_wire));
                if let Some(options) = &call.options {
                    items.push(JsonValue::Object(options.clone()));
                }
                JsonValue::Array(items)
            }
            Expression::Dimension(field_ref) => field_ref.to_wire(),
            Expression::Metric(id) => json!(["metric", id]),
            Expression::Segment(id) => json!(["segment", id]),
            Expression::Case(case) => {
                let branches: Vec<JsonValue> = case
                    .branches
                    .iter()
                    .map(|(condition, value)| json!([condition.to_wire(), value.to_wire()]))
                    .collect();
                match &case.default {
                    Some(default) => json!(["case", branches, {"default": default.to_wire()}]),
                    None => json!(["case", branches]),
                }
            }
        }
    }
}

fn parse_call(name: &str, items: &[JsonValue]) -> Result<Call, WireError> {
    // skip options object at the end
    let (operands, options) = match items.split_last() {
        Some((JsonValue::Object(options), rest)) if !rest.is_empty() => {
            (&rest[1..], Some(options.clone()))
        }
        _ => (&items[1..], None),
    };

    let args = operands
        .iter()
        .map(Expression::from_wire)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| WireError::malformed(name, err.to_string()))?;

    Ok(Call {
        name: name.to_string(),
        args,
        options,
    })
}

fn parse_case(items: &[JsonValue]) -> Result<Expression, WireError> {
    let pairs = items
        .get(1)
        .and_then(JsonValue::as_array)
        .ok_or_else(|| WireError::malformed("case", "expected a list of branches"))?;

    let branches = pairs
        .iter()
        .map(|pair| match pair.as_array().map(Vec::as_slice) {
            Some([condition, value]) => {
                Ok((Expression::from_wire(condition)?, Expression::from_wire(value)?))
            }
            _ => Err(WireError::malformed("case", "branch must be [condition, value]")),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let default = match items.get(2) {
        None => None,
        Some(JsonValue::Object(options)) => match options.get("default") {
            Some(value) => Some(Box::new(Expression::from_wire(value)?)),
            None => None,
        },
        Some(_) => return Err(WireError::malformed("case", "options must be an object")),
    };
    if items.len() > 3 {
        return Err(WireError::malformed("case", "too many elements"));
    }

    Ok(Expression::Case(CaseExpr { branches, default }))
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Expression::from_wire(&value).map_err(D::Error::custom)
    }
}

impl Serialize for FieldRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        FieldRef::from_wire(&value).map_err(D::Error::custom)
    }
}
