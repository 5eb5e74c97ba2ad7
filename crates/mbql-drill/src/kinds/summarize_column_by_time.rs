use mbql_ir::{AggregationClause, BreakoutClause, Query};
use serde_json::json;

use super::{payload_ref, DrillInput, DrillKind};
use crate::{DrillDescriptor, DrillError, DrillOffer, DrillType};

/// Sum of the clicked column by month of the first date column
pub struct SummarizeColumnByTime;

impl DrillKind for SummarizeColumnByTime {
    fn drill_type(&self) -> DrillType {
        DrillType::SummarizeColumnByTime
    }

    fn applies(&self, input: &DrillInput<'_>) -> Option<DrillOffer> {
        let column = input.column();
        if !input.click.is_header()
            || !input.is_editable()
            || input.is_aggregated()
            || !column.is_summable()
            || column.is_structured()
        {
            return None;
        }
        let date_column = input
            .provider
            .breakoutable_columns(input.query, input.stage)
            .into_iter()
            .find(|candidate| candidate.is_date_or_datetime())?;
        Some(DrillOffer::new().with_payload(json!({"breakout": date_column.field_ref})))
    }

    fn apply(&self, input: &DrillInput<'_>, descriptor: &DrillDescriptor) -> Result<Query, DrillError> {
        let date_ref = payload_ref(descriptor, "breakout")?.with_temporal_unit("month");
        let query = input
            .query
            .aggregate(
                input.stage,
                AggregationClause::new("sum", Some(input.column().field_ref.clone())),
            )?
            .breakout(input.stage, BreakoutClause::new(date_ref))?;
        Ok(query)
    }
}
