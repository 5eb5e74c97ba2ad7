//! Time-of-day filters

use chrono::{NaiveTime, Timelike};
use mbql_ir::{ColumnMetadata, Expression, FilterClause, MetadataProvider, Query};
use serde::{Deserialize, Serialize};

use crate::{check_values, split_clause, FilterError, FilterKind, FilterOperator, FilterParts};

/// Wire format of time literals
const TIME_FORMAT: &str = "%H:%M:%S%.3f";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeOperator {
    #[serde(rename = "<")]
    Before,
    #[serde(rename = ">")]
    After,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "is-null")]
    IsNull,
    #[serde(rename = "not-null")]
    NotNull,
}

const OPERATORS: &[TimeOperator] = &[
    TimeOperator::Before,
    TimeOperator::After,
    TimeOperator::Between,
    TimeOperator::IsNull,
    TimeOperator::NotNull,
];

impl FilterOperator for TimeOperator {
    fn wire_name(&self) -> &'static str {
        match self {
            TimeOperator::Before => "<",
            TimeOperator::After => ">",
            TimeOperator::Between => "between",
            TimeOperator::IsNull => "is-null",
            TimeOperator::NotNull => "not-null",
        }
    }

    fn from_wire_name(name: &str) -> Option<Self> {
        OPERATORS.iter().copied().find(|op| op.wire_name() == name)
    }

    fn value_count(&self) -> usize {
        match self {
            TimeOperator::IsNull | TimeOperator::NotNull => 0,
            TimeOperator::Between => 2,
            TimeOperator::Before | TimeOperator::After => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFilter;

impl FilterKind for TimeFilter {
    type Operator = TimeOperator;
    type Target = ColumnMetadata;
    type Value = NaiveTime;

    fn operators() -> &'static [TimeOperator] {
        OPERATORS
    }

    fn default_operator() -> TimeOperator {
        TimeOperator::Before
    }

    /// Midnight
    fn default_value() -> Option<NaiveTime> {
        Some(NaiveTime::MIN)
    }

    fn supports(column: &ColumnMetadata) -> bool {
        column.is_time()
    }

    fn build(
        operator: TimeOperator,
        column: &ColumnMetadata,
        values: &[NaiveTime],
    ) -> Result<FilterClause, FilterError> {
        if !Self::supports(column) {
            return Err(FilterError::UnsupportedColumn(column.display_name.clone()));
        }
        check_values(operator, values, Self::is_valid_value)?;

        let mut args = vec![Expression::Dimension(column.field_ref.clone())];
        args.extend(
            values
                .iter()
                .map(|value| Expression::string(value.format(TIME_FORMAT).to_string())),
        );
        Ok(FilterClause::new(Expression::call(operator.wire_name(), args)))
    }

    fn decompose(
        provider: &dyn MetadataProvider,
        query: &Query,
        stage: usize,
        clause: &FilterClause,
    ) -> Option<FilterParts<TimeOperator, ColumnMetadata, NaiveTime>> {
        let (name, column, rest) = split_clause(provider, query, stage, clause)?;
        let operator = TimeOperator::from_wire_name(name)?;
        if !Self::supports(&column) || !operator.accepts_count(rest.len()) {
            return None;
        }
        let values = rest
            .iter()
            .map(|arg| arg.as_literal().and_then(|l| l.as_str()).and_then(parse_time_literal))
            .collect::<Option<Vec<_>>>()?;
        Some(FilterParts {
            operator,
            target: column,
            values,
        })
    }
}

fn parse_time_literal(text: &str) -> Option<NaiveTime> {
    ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
}

/// Normalises typed `HH:MM` text
///
/// Hours above 23 keep only their first digit, minutes above 59 clamp to 59
/// and missing minutes read as zero. `None` when either part is not a number.
pub fn parse_time_of_day(text: &str) -> Option<NaiveTime> {
    let mut parts = text.trim().splitn(2, ':');
    let hours_text = parts.next()?.trim();
    let minutes_text = parts.next().map(str::trim).unwrap_or("");

    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(hours_text) || !(minutes_text.is_empty() || digits(minutes_text)) {
        return None;
    }

    // digits only, so a failed parse is an overflow
    let mut hours: u32 = hours_text.parse().unwrap_or(u32::MAX);
    if hours > 23 {
        hours = hours_text[..1].parse().ok()?;
    }
    let minutes: u32 = if minutes_text.is_empty() {
        0
    } else {
        minutes_text.parse::<u32>().map(|m| m.min(59)).unwrap_or(59)
    };
    NaiveTime::from_hms_opt(hours, minutes, 0)
}

/// `HH:MM` as shown in the editor
pub fn format_time_of_day(time: &NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}
