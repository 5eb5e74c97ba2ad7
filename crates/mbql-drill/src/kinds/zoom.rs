use mbql_ir::{FilterClause, Query};

use super::{equals_clicked, value_expression, DrillInput, DrillKind};
use crate::{DrillDescriptor, DrillError, DrillOffer, DrillType};

/// Single record behind the clicked primary key
pub struct Zoom;

impl DrillKind for Zoom {
    fn drill_type(&self) -> DrillType {
        DrillType::Zoom
    }

    fn applies(&self, input: &DrillInput<'_>) -> Option<DrillOffer> {
        let value = input.click.cell_value()?;
        if !input.column().is_primary_key()
            || !input.is_editable()
            || input.is_aggregated()
            || value_expression(value).is_none()
        {
            return None;
        }
        // composite keys do not identify a record by one value
        let keys = input.provider.primary_keys(input.query, input.stage);
        (keys.len() == 1).then(DrillOffer::new)
    }

    fn apply(&self, input: &DrillInput<'_>, _descriptor: &DrillDescriptor) -> Result<Query, DrillError> {
        let clause = FilterClause::new(equals_clicked(input)?);
        let query = input
            .query
            .remove_aggregations_and_breakouts(input.stage)?
            .filter(input.stage, clause)?;
        Ok(query)
    }
}
