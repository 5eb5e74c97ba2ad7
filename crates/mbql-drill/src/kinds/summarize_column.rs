use mbql_ir::{AggregationClause, Query};

use super::{selected, DrillInput, DrillKind};
use crate::{DrillDescriptor, DrillError, DrillOffer, DrillType};

const AGGREGATIONS: &[&str] = &["sum", "avg", "distinct"];

/// One summary of the clicked column
pub struct SummarizeColumn;

impl DrillKind for SummarizeColumn {
    fn drill_type(&self) -> DrillType {
        DrillType::SummarizeColumn
    }

    fn applies(&self, input: &DrillInput<'_>) -> Option<DrillOffer> {
        let applies = input.click.is_header()
            && input.is_editable()
            && !input.is_aggregated()
            && input.column().is_summable();
        applies.then(|| DrillOffer::new().with_choices(AGGREGATIONS.iter().copied()))
    }

    fn apply(&self, input: &DrillInput<'_>, descriptor: &DrillDescriptor) -> Result<Query, DrillError> {
        let operator = selected(descriptor)?;
        if !AGGREGATIONS.contains(&operator) {
            return Err(DrillError::InvalidDrillDescriptor(format!("aggregation {}", operator)));
        }
        let clause = AggregationClause::new(operator, Some(input.column().field_ref.clone()));
        Ok(input.query.aggregate(input.stage, clause)?)
    }
}
