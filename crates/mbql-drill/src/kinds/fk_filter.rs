use mbql_ir::{FilterClause, Query};

use super::{equals_clicked, value_expression, DrillInput, DrillKind};
use crate::{DrillDescriptor, DrillError, DrillOffer, DrillType};

/// Rows sharing the clicked foreign key
pub struct FkFilter;

impl DrillKind for FkFilter {
    fn drill_type(&self) -> DrillType {
        DrillType::FkFilter
    }

    fn applies(&self, input: &DrillInput<'_>) -> Option<DrillOffer> {
        let value = input.click.cell_value()?;
        let applies = input.column().is_foreign_key()
            && input.is_editable()
            && !input.is_aggregated()
            && value_expression(value).is_some();
        applies.then(DrillOffer::new)
    }

    fn apply(&self, input: &DrillInput<'_>, _descriptor: &DrillDescriptor) -> Result<Query, DrillError> {
        let clause = FilterClause::new(equals_clicked(input)?);
        Ok(input.query.filter(input.stage, clause)?)
    }
}
