//! Rendering expression trees back to editor source text
//!
//! Output compiles back to the same tree for every tree the compiler
//! produces. Clause options have no source form and are not rendered.

use mbql_ir::{Call, Expression, FieldRef, Literal, MetadataProvider, Query};
use mbql_registry::registry;
use thiserror::Error;

use crate::config::EditorConfig;
use crate::identifier::{
    format_dimension_name, format_metric_name, format_segment_name, format_string_literal,
};

#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    #[error("No column for reference {0}")]
    UnknownColumn(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(i64),

    #[error("Unknown segment: {0}")]
    UnknownSegment(i64),

    #[error("Unknown clause: {0}")]
    UnknownClause(String),

    #[error("{0} has no infix form with {1} operands")]
    Unsupported(String, usize),
}

// Binding strength, loosest first
const OR: u8 = 1;
const AND: u8 = 2;
const NOT: u8 = 3;
const COMPARISON: u8 = 4;
const ADDITIVE: u8 = 5;
const MULTIPLICATIVE: u8 = 6;
const UNARY: u8 = 7;
const ATOM: u8 = 8;

pub fn format_expression(
    expr: &Expression,
    provider: &dyn MetadataProvider,
    query: &Query,
    stage: usize,
    config: &EditorConfig,
) -> Result<String, FormatError> {
    let formatter = Formatter {
        provider,
        query,
        stage,
        config,
    };
    formatter.render(expr).map(|(text, _)| text)
}

struct Formatter<'a> {
    provider: &'a dyn MetadataProvider,
    query: &'a Query,
    stage: usize,
    config: &'a EditorConfig,
}

fn parenthesize(text: String, wrap: bool) -> String {
    if wrap {
        format!("({})", text)
    } else {
        text
    }
}

impl Formatter<'_> {
    fn render(&self, expr: &Expression) -> Result<(String, u8), FormatError> {
        match expr {
            Expression::Literal(Literal::String(s)) => {
                Ok((format_string_literal(s, &self.config.quotes), ATOM))
            }
            Expression::Literal(Literal::Number(n)) => {
                let text = n.to_string();
                let precedence = if text.starts_with('-') { UNARY } else { ATOM };
                Ok((text, precedence))
            }
            Expression::Literal(Literal::Boolean(b)) => {
                Ok((if *b { "True" } else { "False" }.to_string(), ATOM))
            }
            Expression::Dimension(field_ref) => Ok((self.dimension(field_ref)?, ATOM)),
            Expression::Metric(id) => {
                let metric = self
                    .provider
                    .available_metrics(self.query, self.stage)
                    .into_iter()
                    .find(|metric| metric.id == *id)
                    .ok_or(FormatError::UnknownMetric(*id))?;
                Ok((format_metric_name(&metric, &self.config.quotes), ATOM))
            }
            Expression::Segment(id) => {
                let segment = self
                    .provider
                    .available_segments(self.query, self.stage)
                    .into_iter()
                    .find(|segment| segment.id == *id)
                    .ok_or(FormatError::UnknownSegment(*id))?;
                Ok((format_segment_name(&segment, &self.config.quotes), ATOM))
            }
            Expression::Operator(call) => self.operator(call),
            Expression::Function(call) => {
                let args = self.arguments(&call.args)?;
                Ok((format!("{}({})", self.function_name(&call.name)?, args), ATOM))
            }
            Expression::Case(case) => {
                let mut parts = Vec::with_capacity(case.branches.len() * 2 + 1);
                for (condition, value) in case.branches.iter() {
                    parts.push(self.render(condition)?.0);
                    parts.push(self.render(value)?.0);
                }
                if let Some(default) = &case.default {
                    parts.push(self.render(default)?.0);
                }
                Ok((format!("case({})", parts.join(", ")), ATOM))
            }
        }
    }

    fn dimension(&self, field_ref: &FieldRef) -> Result<String, FormatError> {
        let column = self
            .provider
            .column_for_ref(self.query, self.stage, field_ref)
            .ok_or_else(|| FormatError::UnknownColumn(field_ref.to_wire().to_string()))?;
        Ok(format_dimension_name(&column.display_name, self.config))
    }

    fn function_name(&self, name: &str) -> Result<String, FormatError> {
        registry()
            .get(name)
            .map(|sig| sig.display_name.clone())
            .ok_or_else(|| FormatError::UnknownClause(name.to_string()))
    }

    fn arguments(&self, args: &[Expression]) -> Result<String, FormatError> {
        let rendered = args
            .iter()
            .map(|arg| self.render(arg).map(|(text, _)| text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rendered.join(", "))
    }

    fn operator(&self, call: &Call) -> Result<(String, u8), FormatError> {
        let args = &call.args;
        let (keyword, precedence) = match (call.name.as_str(), args.len()) {
            ("or", _) => (" OR ", OR),
            ("and", _) => (" AND ", AND),
            ("not", 1) => {
                let (operand, binding) = self.render(&args[0])?;
                return Ok((format!("NOT {}", parenthesize(operand, binding < NOT)), NOT));
            }
            ("-", 1) => {
                let (operand, binding) = self.render(&args[0])?;
                return Ok((format!("-{}", parenthesize(operand, binding < ATOM)), UNARY));
            }
            ("=" | "!=" | "<" | ">" | "<=" | ">=", 2) => {
                let (left, left_binding) = self.render(&args[0])?;
                let (right, right_binding) = self.render(&args[1])?;
                return Ok((
                    format!(
                        "{} {} {}",
                        parenthesize(left, left_binding <= COMPARISON),
                        call.name,
                        parenthesize(right, right_binding <= COMPARISON)
                    ),
                    COMPARISON,
                ));
            }
            ("+", _) => (" + ", ADDITIVE),
            ("-", _) => (" - ", ADDITIVE),
            ("*", _) => (" * ", MULTIPLICATIVE),
            ("/", _) => (" / ", MULTIPLICATIVE),
            (name, count) => return Err(FormatError::Unsupported(name.to_string(), count)),
        };
        if args.len() < 2 {
            return Err(FormatError::Unsupported(call.name.clone(), args.len()));
        }

        // left-associative: only the first operand may bind equally loosely
        let mut parts = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let (text, binding) = self.render(arg)?;
            let wrap = if i == 0 && precedence > AND {
                binding < precedence
            } else {
                binding <= precedence
            };
            parts.push(parenthesize(text, wrap));
        }
        Ok((parts.join(keyword), precedence))
    }
}
