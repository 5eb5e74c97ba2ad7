//! Pest-based compiler from editor source text to expression trees

use mbql_ir::{CaseExpr, Expression, Literal, MetadataProvider, Query};
use mbql_registry::{registry, RegistryError};
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;
use tracing::debug;

use crate::config::EditorConfig;
use crate::quote::{unquote, QuoteError};
use crate::resolve::{resolve_dimension, resolve_metric, resolve_segment, DimensionLookup};

#[derive(Parser)]
#[grammar = "expression.pest"]
pub struct ExpressionParser;

type Pair<'i> = pest::iterators::Pair<'i, Rule>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Pest error: {0}")]
    Pest(#[from] pest::error::Error<Rule>),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Unknown field, segment or metric: {0}")]
    UnknownIdentifier(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Quote(#[from] QuoteError),
}

/// Where identifiers are resolved
#[derive(Clone, Copy)]
pub struct CompileContext<'a> {
    pub provider: &'a dyn MetadataProvider,
    pub query: &'a Query,
    pub stage: usize,
    pub config: &'a EditorConfig,
    /// Long display name of the expression being edited
    pub reference: Option<&'a str>,
}

impl<'a> CompileContext<'a> {
    pub fn new(provider: &'a dyn MetadataProvider, query: &'a Query, stage: usize) -> Self {
        Self {
            provider,
            query,
            stage,
            config: EditorConfig::standard(),
            reference: None,
        }
    }
}

/// Compile editor source text into an expression tree
pub fn compile(source: &str, ctx: &CompileContext<'_>) -> Result<Expression, CompileError> {
    let mut pairs = ExpressionParser::parse(Rule::expression, source)?;
    let root = pairs
        .next()
        .ok_or_else(|| CompileError::Syntax("Empty input".to_string()))?;
    let expr = root
        .into_inner()
        .next()
        .ok_or_else(|| CompileError::Syntax("Empty expression".to_string()))?;

    let compiled = Compiler { ctx }.expr(expr)?;
    debug!(source, "compiled expression");
    Ok(compiled)
}

struct Compiler<'c, 'a> {
    ctx: &'c CompileContext<'a>,
}

fn next_operand<'i>(inner: &mut pest::iterators::Pairs<'i, Rule>) -> Result<Pair<'i>, CompileError> {
    inner
        .next()
        .ok_or_else(|| CompileError::Syntax("Missing operand".to_string()))
}

impl Compiler<'_, '_> {
    fn expr(&self, pair: Pair<'_>) -> Result<Expression, CompileError> {
        match pair.as_rule() {
            Rule::expr | Rule::primary => {
                let mut inner = pair.into_inner();
                self.expr(next_operand(&mut inner)?)
            }
            Rule::or_expr | Rule::and_expr => {
                let operator = if pair.as_rule() == Rule::or_expr { "or" } else { "and" };
                // operands and keywords alternate; keep the operands
                let mut operands = pair
                    .into_inner()
                    .filter(|p| !matches!(p.as_rule(), Rule::or_op | Rule::and_op))
                    .map(|p| self.expr(p))
                    .collect::<Result<Vec<_>, _>>()?;
                if operands.len() == 1 {
                    return Ok(operands.remove(0));
                }
                Ok(Expression::call(operator, operands))
            }
            Rule::not_expr => {
                let mut inner = pair.into_inner();
                let first = next_operand(&mut inner)?;
                if first.as_rule() == Rule::not_op {
                    let operand = self.expr(next_operand(&mut inner)?)?;
                    return Ok(Expression::call("not", vec![operand]));
                }
                self.expr(first)
            }
            Rule::cmp_expr => {
                let mut inner = pair.into_inner();
                let left = self.expr(next_operand(&mut inner)?)?;
                match inner.next() {
                    Some(op) => {
                        let right = self.expr(next_operand(&mut inner)?)?;
                        Ok(Expression::call(op.as_str(), vec![left, right]))
                    }
                    None => Ok(left),
                }
            }
            Rule::add_expr | Rule::mul_expr => {
                let mut inner = pair.into_inner();
                let mut left = self.expr(next_operand(&mut inner)?)?;
                while let Some(op) = inner.next() {
                    let right = self.expr(next_operand(&mut inner)?)?;
                    left = Expression::call(op.as_str(), vec![left, right]);
                }
                Ok(left)
            }
            Rule::unary_expr => {
                let mut inner = pair.into_inner();
                let first = next_operand(&mut inner)?;
                if first.as_rule() == Rule::neg_op {
                    let operand = self.expr(next_operand(&mut inner)?)?;
                    return Ok(negate(operand));
                }
                self.expr(first)
            }
            Rule::literal => {
                let mut inner = pair.into_inner();
                self.literal(next_operand(&mut inner)?)
            }
            Rule::func_call => self.func_call(pair),
            Rule::identifier => {
                let mut inner = pair.into_inner();
                self.identifier(next_operand(&mut inner)?)
            }
            other => Err(CompileError::Syntax(format!("Cannot compile {:?}", other))),
        }
    }

    fn literal(&self, pair: Pair<'_>) -> Result<Expression, CompileError> {
        let text = pair.as_str();
        match pair.as_rule() {
            Rule::boolean => Ok(Expression::boolean(text.eq_ignore_ascii_case("true"))),
            Rule::string => Ok(Expression::string(unquote(text)?)),
            Rule::number => parse_number(text),
            other => Err(CompileError::Syntax(format!("Invalid literal: {:?}", other))),
        }
    }

    fn func_call(&self, pair: Pair<'_>) -> Result<Expression, CompileError> {
        let mut inner = pair.into_inner();
        let name = next_operand(&mut inner)?.as_str();
        let args = match inner.next() {
            Some(arg_list) => arg_list
                .into_inner()
                .map(|p| self.expr(p))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        if name.eq_ignore_ascii_case("case") {
            return case_expression(args);
        }
        let mbql_name = registry()
            .mbql_name(name)
            .ok_or_else(|| CompileError::UnknownFunction(name.to_string()))?;
        registry().lookup(mbql_name, args.len())?;
        Ok(Expression::call(mbql_name, args))
    }

    fn identifier(&self, pair: Pair<'_>) -> Result<Expression, CompileError> {
        let name = match pair.as_rule() {
            Rule::bracket_identifier => unquote(pair.as_str())?,
            _ => pair.as_str().to_string(),
        };
        let ctx = self.ctx;
        let lookup = DimensionLookup {
            reference: ctx.reference,
            separators: &ctx.config.separators,
        };

        if let Some(column) = resolve_dimension(&name, lookup, ctx.provider, ctx.query, ctx.stage) {
            return Ok(Expression::Dimension(column.field_ref));
        }
        resolve_segment(&name, ctx.provider, ctx.query, ctx.stage)
            .or_else(|| resolve_metric(&name, ctx.provider, ctx.query, ctx.stage))
            .ok_or(CompileError::UnknownIdentifier(name))
    }
}

fn parse_number(text: &str) -> Result<Expression, CompileError> {
    let is_integer = text.bytes().all(|b| b.is_ascii_digit());
    if is_integer {
        if let Ok(value) = text.parse::<i64>() {
            return Ok(Expression::integer(value));
        }
    }
    text.parse::<f64>()
        .ok()
        .and_then(Expression::number)
        .ok_or_else(|| CompileError::InvalidNumber(text.to_string()))
}

/// Negative number literals fold into the literal
fn negate(operand: Expression) -> Expression {
    if let Expression::Literal(Literal::Number(n)) = &operand {
        if let Some(value) = n.as_i64().and_then(i64::checked_neg) {
            return Expression::integer(value);
        }
        if let Some(negated) = n.as_f64().and_then(|value| Expression::number(-value)) {
            return negated;
        }
    }
    Expression::call("-", vec![operand])
}

/// `case(cond, value, cond, value, default?)`
fn case_expression(mut args: Vec<Expression>) -> Result<Expression, CompileError> {
    if args.len() < 2 {
        return Err(RegistryError::ArityMismatch {
            clause: "case".to_string(),
            expected: "2+".to_string(),
            actual: args.len(),
        }
        .into());
    }
    let default = if args.len() % 2 == 1 { args.pop().map(Box::new) } else { None };

    let mut branches = Vec::with_capacity(args.len() / 2);
    let mut iter = args.into_iter();
    while let (Some(condition), Some(value)) = (iter.next(), iter.next()) {
        branches.push((condition, value));
    }
    Ok(Expression::Case(CaseExpr { branches, default }))
}
