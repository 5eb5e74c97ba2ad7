//! Per-type filter builders
//!
//! Each column type gets a [`FilterKind`]: an operator vocabulary, a value
//! type, and a lossless mapping between `(operator, column, values)` and a
//! [`FilterClause`]. [`FilterEditor`] tracks a filter while it is edited.

pub mod coordinate;
pub mod date;
mod editor;
pub mod number;
pub mod time;

use std::fmt::Debug;

use mbql_ir::{ColumnMetadata, Expression, FilterClause, MetadataProvider, Query};
use thiserror::Error;

pub use coordinate::{
    second_column_candidates, CoordinateFilter, CoordinateOperator, CoordinateTarget,
};
pub use date::{
    DateFilterValue, DateUnit, DateValue, ExcludeDates, ExcludeUnit, RelativeDate, RelativeValue,
    SpecificDateFilter, SpecificDateOperator,
};
pub use editor::{EditorStatus, FilterEditor};
pub use number::{NumberFilter, NumberOperator};
pub use time::{format_time_of_day, parse_time_of_day, TimeFilter, TimeOperator};

#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("{operator} expects {expected} values, got {actual}")]
    InvalidArity {
        operator: String,
        expected: String,
        actual: usize,
    },

    #[error("Missing value at position {0}")]
    MissingValue(usize),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Column {0} does not support this filter")]
    UnsupportedColumn(String),
}

/// Operator of one filter kind
pub trait FilterOperator: Copy + Eq + Debug + 'static {
    fn wire_name(&self) -> &'static str;

    fn from_wire_name(name: &str) -> Option<Self>;

    fn value_count(&self) -> usize;

    /// `=` and `!=` take one or more values
    fn has_multiple_values(&self) -> bool {
        false
    }

    fn accepts_count(&self, count: usize) -> bool {
        if self.has_multiple_values() {
            count >= self.value_count()
        } else {
            count == self.value_count()
        }
    }
}

/// Decomposed filter clause
#[derive(Debug, Clone, PartialEq)]
pub struct FilterParts<O, T, V> {
    pub operator: O,
    pub target: T,
    pub values: Vec<V>,
}

pub trait FilterKind: Clone + Debug + PartialEq {
    type Operator: FilterOperator;
    /// Column (or columns) the filter applies to
    type Target: Clone + Debug + PartialEq;
    type Value: Clone + Debug + PartialEq;

    fn operators() -> &'static [Self::Operator];

    /// Operator selected for a new filter
    fn default_operator() -> Self::Operator;

    /// Fills new value slots when the operator changes
    fn default_value() -> Option<Self::Value> {
        None
    }

    fn is_valid_value(_value: &Self::Value) -> bool {
        true
    }

    fn supports(target: &Self::Target) -> bool;

    /// Operators that need more than one column check the target here
    fn supports_operator(_target: &Self::Target, _operator: Self::Operator) -> bool {
        true
    }

    fn build(
        operator: Self::Operator,
        target: &Self::Target,
        values: &[Self::Value],
    ) -> Result<FilterClause, FilterError>;

    /// [`FilterKind::build`] over editor slots, failing on the first empty one
    fn build_from_slots(
        operator: Self::Operator,
        target: &Self::Target,
        values: &[Option<Self::Value>],
    ) -> Result<FilterClause, FilterError> {
        let values = values
            .iter()
            .enumerate()
            .map(|(position, value)| value.clone().ok_or(FilterError::MissingValue(position)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(operator, target, &values)
    }

    fn decompose(
        provider: &dyn MetadataProvider,
        query: &Query,
        stage: usize,
        clause: &FilterClause,
    ) -> Option<FilterParts<Self::Operator, Self::Target, Self::Value>>;

    /// Arity matches and every slot holds a valid value
    fn is_valid(operator: Self::Operator, values: &[Option<Self::Value>]) -> bool {
        operator.accepts_count(values.len())
            && values
                .iter()
                .all(|value| value.as_ref().is_some_and(Self::is_valid_value))
    }
}

/// Arity and value checks shared by every `build`
pub(crate) fn check_values<O: FilterOperator, V>(
    operator: O,
    values: &[V],
    is_valid_value: impl Fn(&V) -> bool,
) -> Result<(), FilterError> {
    if !operator.accepts_count(values.len()) {
        let expected = if operator.has_multiple_values() {
            format!("{}+", operator.value_count())
        } else {
            operator.value_count().to_string()
        };
        return Err(FilterError::InvalidArity {
            operator: operator.wire_name().to_string(),
            expected,
            actual: values.len(),
        });
    }
    if let Some(position) = values.iter().position(|value| !is_valid_value(value)) {
        return Err(FilterError::InvalidValue(format!(
            "{} value {}",
            operator.wire_name(),
            position
        )));
    }
    Ok(())
}

/// `(operator, column, operands)` of a clause whose first operand is a column
pub(crate) fn split_clause<'c>(
    provider: &dyn MetadataProvider,
    query: &Query,
    stage: usize,
    clause: &'c FilterClause,
) -> Option<(&'c str, ColumnMetadata, &'c [Expression])> {
    let operator = clause.operator()?;
    let (first, rest) = clause.args().split_first()?;
    let column = provider.column_for_ref(query, stage, first.as_field_ref()?)?;
    Some((operator, column, rest))
}

pub(crate) fn number_values(args: &[Expression]) -> Option<Vec<f64>> {
    args.iter()
        .map(|arg| arg.as_literal().and_then(|literal| literal.as_f64()))
        .collect()
}

pub(crate) fn number_operands(values: &[f64]) -> Result<Vec<Expression>, FilterError> {
    values
        .iter()
        .map(|value| {
            Expression::number(*value)
                .ok_or_else(|| FilterError::InvalidValue(value.to_string()))
        })
        .collect()
}
