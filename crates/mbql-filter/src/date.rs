//! Date and date-time filters
//!
//! Three forms share one column:
//! - specific dates: `["<", ref, "2024-01-31"]`, with a `minute` temporal unit
//!   on the ref when a value carries a time;
//! - relative intervals: `["time-interval", ref, -30, "day", {"include-current": true}]`;
//! - excluded date parts: `["!=", ref+{"temporal-unit": "day-of-week"}, 1, 7]`.
//!
//! [`parts`] reads any of them back into a [`DateFilterValue`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use mbql_ir::{
    Call, ColumnMetadata, Expression, FieldRef, FilterClause, MetadataProvider, Options, Query,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::trace;

use crate::{check_values, split_clause, FilterError, FilterKind, FilterOperator, FilterParts};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecificDateOperator {
    #[serde(rename = "=")]
    On,
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

const OPERATORS: &[SpecificDateOperator] = &[
    SpecificDateOperator::On,
    SpecificDateOperator::Before,
    SpecificDateOperator::After,
    SpecificDateOperator::Between,
    SpecificDateOperator::IsNull,
    SpecificDateOperator::NotNull,
];

impl FilterOperator for SpecificDateOperator {
    fn wire_name(&self) -> &'static str {
        match self {
            SpecificDateOperator::On => "=",
            SpecificDateOperator::Before => "<",
            SpecificDateOperator::After => ">",
            SpecificDateOperator::Between => "between",
            SpecificDateOperator::IsNull => "is-null",
            SpecificDateOperator::NotNull => "not-null",
        }
    }

    fn from_wire_name(name: &str) -> Option<Self> {
        OPERATORS.iter().copied().find(|op| op.wire_name() == name)
    }

    fn value_count(&self) -> usize {
        match self {
            SpecificDateOperator::IsNull | SpecificDateOperator::NotNull => 0,
            SpecificDateOperator::Between => 2,
            _ => 1,
        }
    }
}

/// Calendar date with an optional time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateValue {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
}

impl DateValue {
    pub fn date(date: NaiveDate) -> Self {
        Self { date, time: None }
    }

    pub fn date_time(date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            date,
            time: Some(time),
        }
    }

    pub fn has_time(&self) -> bool {
        self.time.is_some()
    }

    fn to_literal(self, with_time: bool) -> String {
        if with_time {
            NaiveDateTime::new(self.date, self.time.unwrap_or(NaiveTime::MIN))
                .format(DATE_TIME_FORMAT)
                .to_string()
        } else {
            self.date.format(DATE_FORMAT).to_string()
        }
    }

    fn parse(text: &str) -> Option<Self> {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT) {
            return Some(Self::date_time(date_time.date(), date_time.time()));
        }
        NaiveDate::parse_from_str(text, DATE_FORMAT).ok().map(Self::date)
    }
}

/// Temporal-unit option dropped from the column ref
fn bare_ref(field_ref: &FieldRef) -> FieldRef {
    field_ref.clone().without_option("temporal-unit")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecificDateFilter;

impl FilterKind for SpecificDateFilter {
    type Operator = SpecificDateOperator;
    type Target = ColumnMetadata;
    type Value = DateValue;

    fn operators() -> &'static [SpecificDateOperator] {
        OPERATORS
    }

    fn default_operator() -> SpecificDateOperator {
        SpecificDateOperator::On
    }

    fn supports(column: &ColumnMetadata) -> bool {
        column.is_date_or_datetime()
    }

    fn build(
        operator: SpecificDateOperator,
        column: &ColumnMetadata,
        values: &[DateValue],
    ) -> Result<FilterClause, FilterError> {
        if !Self::supports(column) {
            return Err(FilterError::UnsupportedColumn(column.display_name.clone()));
        }
        check_values(operator, values, Self::is_valid_value)?;

        let field_ref = bare_ref(&column.field_ref);
        let with_time = values.iter().any(DateValue::has_time);
        let field_ref = match (values.is_empty(), with_time) {
            (true, _) => field_ref,
            (false, true) => field_ref.with_temporal_unit("minute"),
            (false, false) => field_ref.with_temporal_unit("day"),
        };

        let mut args = vec![Expression::Dimension(field_ref)];
        args.extend(
            values
                .iter()
                .map(|value| Expression::string(value.to_literal(with_time))),
        );
        Ok(FilterClause::new(Expression::call(operator.wire_name(), args)))
    }

    fn decompose(
        provider: &dyn MetadataProvider,
        query: &Query,
        stage: usize,
        clause: &FilterClause,
    ) -> Option<FilterParts<SpecificDateOperator, ColumnMetadata, DateValue>> {
        let (name, column, rest) = split_clause(provider, query, stage, clause)?;
        let operator = SpecificDateOperator::from_wire_name(name)?;
        if !Self::supports(&column) || !operator.accepts_count(rest.len()) {
            return None;
        }
        let unit = clause.args().first()?.as_field_ref()?.temporal_unit();
        if !matches!(unit, None | Some("day") | Some("minute")) {
            return None;
        }
        let values = rest
            .iter()
            .map(|arg| arg.as_literal().and_then(|l| l.as_str()).and_then(DateValue::parse))
            .collect::<Option<Vec<_>>>()?;
        Some(FilterParts {
            operator,
            target: column,
            values,
        })
    }
}

/// Unit of a relative interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl DateUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateUnit::Minute => "minute",
            DateUnit::Hour => "hour",
            DateUnit::Day => "day",
            DateUnit::Week => "week",
            DateUnit::Month => "month",
            DateUnit::Quarter => "quarter",
            DateUnit::Year => "year",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        serde_json::from_value(json!(name)).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelativeValue {
    /// The unit containing now, e.g. this month
    Current,
    /// Negative for the past, positive for the future
    Offset(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeDate {
    pub value: RelativeValue,
    pub unit: DateUnit,
    /// Whether the interval also covers the current unit
    #[serde(default)]
    pub include_current: bool,
}

impl RelativeDate {
    pub fn current(unit: DateUnit) -> Self {
        Self {
            value: RelativeValue::Current,
            unit,
            include_current: false,
        }
    }

    pub fn offset(offset: i64, unit: DateUnit) -> Self {
        Self {
            value: RelativeValue::Offset(offset),
            unit,
            include_current: false,
        }
    }

    pub fn including_current(self) -> Self {
        Self {
            include_current: true,
            ..self
        }
    }
}

/// Date part a filter can exclude values of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExcludeUnit {
    HourOfDay,
    DayOfWeek,
    MonthOfYear,
    QuarterOfYear,
}

impl ExcludeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExcludeUnit::HourOfDay => "hour-of-day",
            ExcludeUnit::DayOfWeek => "day-of-week",
            ExcludeUnit::MonthOfYear => "month-of-year",
            ExcludeUnit::QuarterOfYear => "quarter-of-year",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        serde_json::from_value(json!(name)).ok()
    }

    /// Valid values: hours from 0, days of week, months and quarters from 1
    pub fn range(&self) -> std::ops::RangeInclusive<i64> {
        match self {
            ExcludeUnit::HourOfDay => 0..=23,
            ExcludeUnit::DayOfWeek => 1..=7,
            ExcludeUnit::MonthOfYear => 1..=12,
            ExcludeUnit::QuarterOfYear => 1..=4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeDates {
    pub unit: ExcludeUnit,
    pub values: Vec<i64>,
}

/// Any date filter on one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DateFilterValue {
    Specific {
        operator: SpecificDateOperator,
        values: Vec<DateValue>,
    },
    Relative(RelativeDate),
    Exclude(ExcludeDates),
}

impl DateFilterValue {
    pub fn build(&self, column: &ColumnMetadata) -> Result<FilterClause, FilterError> {
        match self {
            DateFilterValue::Specific { operator, values } => {
                SpecificDateFilter::build(*operator, column, values)
            }
            DateFilterValue::Relative(relative) => build_relative(column, relative),
            DateFilterValue::Exclude(exclude) => build_exclude(column, exclude),
        }
    }
}

fn build_relative(
    column: &ColumnMetadata,
    relative: &RelativeDate,
) -> Result<FilterClause, FilterError> {
    if !column.is_date_or_datetime() {
        return Err(FilterError::UnsupportedColumn(column.display_name.clone()));
    }
    let value = match relative.value {
        RelativeValue::Current => Expression::string("current"),
        RelativeValue::Offset(0) => {
            return Err(FilterError::InvalidValue("relative offset must not be 0".to_string()))
        }
        RelativeValue::Offset(offset) => Expression::integer(offset),
    };
    let args = vec![
        Expression::Dimension(bare_ref(&column.field_ref)),
        value,
        Expression::string(relative.unit.as_str()),
    ];
    let mut call = Call::new("time-interval", args);
    if relative.include_current && relative.value != RelativeValue::Current {
        let mut options = Options::new();
        options.insert("include-current".to_string(), JsonValue::Bool(true));
        call = call.with_options(options);
    }
    Ok(FilterClause::new(Expression::Function(call)))
}

fn build_exclude(
    column: &ColumnMetadata,
    exclude: &ExcludeDates,
) -> Result<FilterClause, FilterError> {
    if !column.is_date_or_datetime() {
        return Err(FilterError::UnsupportedColumn(column.display_name.clone()));
    }
    if exclude.values.is_empty() {
        return Err(FilterError::InvalidArity {
            operator: "!=".to_string(),
            expected: "1+".to_string(),
            actual: 0,
        });
    }
    let range = exclude.unit.range();
    if let Some(value) = exclude.values.iter().find(|value| !range.contains(value)) {
        return Err(FilterError::InvalidValue(format!(
            "{} is not a valid {}",
            value,
            exclude.unit.as_str()
        )));
    }

    let field_ref = bare_ref(&column.field_ref).with_temporal_unit(exclude.unit.as_str());
    let mut args = vec![Expression::Dimension(field_ref)];
    args.extend(exclude.values.iter().map(|value| Expression::integer(*value)));
    Ok(FilterClause::new(Expression::call("!=", args)))
}

fn relative_parts(clause: &FilterClause) -> Option<RelativeDate> {
    let call = clause.expression().as_call()?;
    let [_, value, unit] = call.args.as_slice() else {
        return None;
    };
    let value = match value.as_literal()? {
        literal if literal.as_str() == Some("current") => RelativeValue::Current,
        literal => {
            let offset = literal.as_f64()?;
            if offset.fract() != 0.0 || offset == 0.0 {
                return None;
            }
            RelativeValue::Offset(offset as i64)
        }
    };
    let unit = DateUnit::parse(unit.as_literal()?.as_str()?)?;
    let include_current = call
        .options
        .as_ref()
        .and_then(|options| options.get("include-current"))
        .and_then(JsonValue::as_bool)
        .unwrap_or(false);
    Some(RelativeDate {
        value,
        unit,
        include_current,
    })
}

fn exclude_parts(clause: &FilterClause) -> Option<ExcludeDates> {
    let (first, rest) = clause.args().split_first()?;
    let unit = ExcludeUnit::parse(first.as_field_ref()?.temporal_unit()?)?;
    let values = rest
        .iter()
        .map(|arg| {
            let value = arg.as_literal()?.as_f64()?;
            (value.fract() == 0.0).then_some(value as i64)
        })
        .collect::<Option<Vec<_>>>()?;
    if values.is_empty() || !values.iter().all(|value| unit.range().contains(value)) {
        return None;
    }
    Some(ExcludeDates { unit, values })
}

/// Column and value of any date filter, `None` for other clauses
pub fn parts(
    provider: &dyn MetadataProvider,
    query: &Query,
    stage: usize,
    clause: &FilterClause,
) -> Option<(ColumnMetadata, DateFilterValue)> {
    let (name, column, _) = split_clause(provider, query, stage, clause)?;
    if !column.is_date_or_datetime() {
        return None;
    }
    let value = match name {
        "time-interval" => DateFilterValue::Relative(relative_parts(clause)?),
        "!=" => DateFilterValue::Exclude(exclude_parts(clause)?),
        _ => {
            let parts = SpecificDateFilter::decompose(provider, query, stage, clause)?;
            DateFilterValue::Specific {
                operator: parts.operator,
                values: parts.values,
            }
        }
    };
    trace!(column = %column.name, ?value, "Decomposed date filter");
    Some((column, value))
}
