use mbql_ir::{Direction, OrderBy, Query};

use super::{selected, DrillInput, DrillKind};
use crate::{DrillDescriptor, DrillError, DrillOffer, DrillType};

/// Order the results by the clicked column
pub struct Sort;

impl DrillKind for Sort {
    fn drill_type(&self) -> DrillType {
        DrillType::Sort
    }

    fn applies(&self, input: &DrillInput<'_>) -> Option<DrillOffer> {
        let column = input.column();
        if !input.click.is_header() || !input.is_editable() || column.is_structured() {
            return None;
        }
        let current = input
            .query
            .orderings(input.stage)
            .ok()?
            .iter()
            .find(|order| order.column().same_column(&column.field_ref))
            .map(OrderBy::direction);

        let choices: Vec<&str> = [Direction::Asc, Direction::Desc]
            .into_iter()
            .filter(|direction| Some(*direction) != current)
            .map(|direction| direction.as_str())
            .collect();
        Some(DrillOffer::new().with_choices(choices))
    }

    fn apply(&self, input: &DrillInput<'_>, descriptor: &DrillDescriptor) -> Result<Query, DrillError> {
        let direction = match selected(descriptor)? {
            "asc" => Direction::Asc,
            "desc" => Direction::Desc,
            other => {
                return Err(DrillError::InvalidDrillDescriptor(format!("direction {}", other)))
            }
        };
        let order = OrderBy(direction, input.column().field_ref.clone());
        Ok(input.query.order_by(input.stage, order)?)
    }
}
