use mbql_filter::{FilterKind, FilterOperator, NumberFilter, NumberOperator};
use mbql_ir::{ColumnMetadata, Expression, FilterClause, Query};
use tracing::trace;

use super::{selected, value_expression, DrillInput, DrillKind};
use crate::{DrillDescriptor, DrillError, DrillOffer, DrillType};

const NULL_OPERATORS: &[&str] = &["is-null", "not-null"];
const ORDERED_OPERATORS: &[&str] = &["<", ">", "=", "!="];
const EQUALITY_OPERATORS: &[&str] = &["=", "!="];

/// Filter on the clicked cell's value
pub struct QuickFilter;

impl DrillKind for QuickFilter {
    fn drill_type(&self) -> DrillType {
        DrillType::QuickFilter
    }

    fn applies(&self, input: &DrillInput<'_>) -> Option<DrillOffer> {
        let value = input.click.value.as_ref()?;
        let column = input.column();
        if !input.is_editable()
            || column.is_primary_key()
            || column.is_foreign_key()
            || column.is_structured()
        {
            return None;
        }

        let operators = if value.is_null() {
            NULL_OPERATORS
        } else {
            value_expression(value)?;
            // numeric columns only compare numbers
            let ordered = if column.is_numeric() {
                value.is_number()
            } else {
                column.is_date_or_datetime()
            };
            if ordered {
                ORDERED_OPERATORS
            } else {
                EQUALITY_OPERATORS
            }
        };
        Some(DrillOffer::new().with_choices(operators.iter().copied()))
    }

    fn apply(&self, input: &DrillInput<'_>, descriptor: &DrillDescriptor) -> Result<Query, DrillError> {
        let operator = selected(descriptor)?;

        // aggregated results are filtered on a new stage over them
        let (query, stage, column) = if input.is_aggregated() {
            let query = input.query.append_stage();
            let stage = query.last_stage_index();
            let column = input
                .provider
                .visible_columns(&query, stage)
                .into_iter()
                .find(|candidate| candidate.name == input.column().name)
                .ok_or_else(|| {
                    DrillError::InvalidDrillDescriptor(format!(
                        "column {} is not visible on the new stage",
                        input.column().name
                    ))
                })?;
            trace!(stage, column = %column.name, "Quick filter on appended stage");
            (query, stage, column)
        } else {
            (input.query.clone(), input.stage, input.column().clone())
        };

        let clause = filter_clause(operator, &column, input.click.value.as_ref())?;
        Ok(query.filter(stage, clause)?)
    }
}

fn filter_clause(
    operator: &str,
    column: &ColumnMetadata,
    value: Option<&serde_json::Value>,
) -> Result<FilterClause, DrillError> {
    let invalid = || DrillError::InvalidDrillDescriptor(format!("operator {}", operator));
    let column_arg = Expression::Dimension(column.field_ref.clone());

    if NULL_OPERATORS.contains(&operator) {
        return Ok(FilterClause::new(Expression::call(operator, vec![column_arg])));
    }

    let value = value.ok_or_else(invalid)?;
    if let (true, Some(number)) = (column.is_numeric(), value.as_f64()) {
        let number_operator = NumberOperator::from_wire_name(operator).ok_or_else(invalid)?;
        return Ok(NumberFilter::build(number_operator, column, &[number])?);
    }
    let literal = value_expression(value).ok_or_else(invalid)?;
    Ok(FilterClause::new(Expression::call(operator, vec![column_arg, literal])))
}
