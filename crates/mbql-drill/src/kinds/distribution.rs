use mbql_ir::{AggregationClause, BreakoutClause, Query};
use serde_json::json;

use super::{DrillInput, DrillKind};
use crate::{DrillDescriptor, DrillError, DrillOffer, DrillType};

/// Row count per value of the clicked column
pub struct Distribution;

impl DrillKind for Distribution {
    fn drill_type(&self) -> DrillType {
        DrillType::Distribution
    }

    fn applies(&self, input: &DrillInput<'_>) -> Option<DrillOffer> {
        let column = input.column();
        let applies = input.click.is_header()
            && input.is_editable()
            && !input.is_aggregated()
            && !column.is_primary_key()
            && !column.is_structured()
            && !column.is_long_text();
        applies.then(DrillOffer::new)
    }

    fn apply(&self, input: &DrillInput<'_>, _descriptor: &DrillDescriptor) -> Result<Query, DrillError> {
        let column = input.column();
        let breakout = if column.is_date_or_datetime() {
            column.field_ref.clone().with_temporal_unit("month")
        } else if column.is_numeric() && !column.is_foreign_key() {
            column
                .field_ref
                .clone()
                .with_option("binning", json!({"strategy": "default"}))
        } else {
            column.field_ref.clone()
        };

        let query = input
            .query
            .aggregate(input.stage, AggregationClause::new("count", None))?
            .breakout(input.stage, BreakoutClause::new(breakout))?;
        Ok(query)
    }
}
