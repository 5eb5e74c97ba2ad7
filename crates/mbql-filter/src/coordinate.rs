//! Latitude/longitude filters

use mbql_ir::{ColumnMetadata, Expression, FilterClause, MetadataProvider, Query};
use serde::{Deserialize, Serialize};

use crate::{
    check_values, number_operands, number_values, split_clause, FilterError, FilterKind,
    FilterOperator, FilterParts,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordinateOperator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    /// Bounding box over a latitude and a longitude column
    #[serde(rename = "inside")]
    Inside,
}

const OPERATORS: &[CoordinateOperator] = &[
    CoordinateOperator::Equal,
    CoordinateOperator::NotEqual,
    CoordinateOperator::Greater,
    CoordinateOperator::Less,
    CoordinateOperator::Between,
    CoordinateOperator::GreaterOrEqual,
    CoordinateOperator::LessOrEqual,
    CoordinateOperator::Inside,
];

impl FilterOperator for CoordinateOperator {
    fn wire_name(&self) -> &'static str {
        match self {
            CoordinateOperator::Equal => "=",
            CoordinateOperator::NotEqual => "!=",
            CoordinateOperator::Greater => ">",
            CoordinateOperator::Less => "<",
            CoordinateOperator::Between => "between",
            CoordinateOperator::GreaterOrEqual => ">=",
            CoordinateOperator::LessOrEqual => "<=",
            CoordinateOperator::Inside => "inside",
        }
    }

    fn from_wire_name(name: &str) -> Option<Self> {
        OPERATORS.iter().copied().find(|op| op.wire_name() == name)
    }

    fn value_count(&self) -> usize {
        match self {
            CoordinateOperator::Inside => 4,
            CoordinateOperator::Between => 2,
            _ => 1,
        }
    }

    fn has_multiple_values(&self) -> bool {
        matches!(self, CoordinateOperator::Equal | CoordinateOperator::NotEqual)
    }
}

/// Column being filtered, plus the paired column for `inside`
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateTarget {
    pub column: ColumnMetadata,
    pub second_column: Option<ColumnMetadata>,
}

impl CoordinateTarget {
    pub fn new(column: ColumnMetadata) -> Self {
        Self {
            column,
            second_column: None,
        }
    }

    pub fn with_second_column(self, second_column: ColumnMetadata) -> Self {
        Self {
            second_column: Some(second_column),
            ..self
        }
    }

    /// `(latitude, longitude)` when the two columns form such a pair
    fn lat_lon(&self) -> Option<(&ColumnMetadata, &ColumnMetadata)> {
        let second = self.second_column.as_ref()?;
        if self.column.is_latitude() && second.is_longitude() {
            Some((&self.column, second))
        } else if self.column.is_longitude() && second.is_latitude() {
            Some((second, &self.column))
        } else {
            None
        }
    }
}

/// Columns that can pair with `column` in an `inside` filter
///
/// A latitude pairs with longitudes and the other way round.
pub fn second_column_candidates(
    provider: &dyn MetadataProvider,
    query: &Query,
    stage: usize,
    column: &ColumnMetadata,
) -> Vec<ColumnMetadata> {
    provider
        .filterable_columns(query, stage)
        .into_iter()
        .filter(|candidate| {
            (column.is_latitude() && candidate.is_longitude())
                || (column.is_longitude() && candidate.is_latitude())
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateFilter;

impl FilterKind for CoordinateFilter {
    type Operator = CoordinateOperator;
    type Target = CoordinateTarget;
    type Value = f64;

    fn operators() -> &'static [CoordinateOperator] {
        OPERATORS
    }

    fn default_operator() -> CoordinateOperator {
        CoordinateOperator::Between
    }

    fn is_valid_value(value: &f64) -> bool {
        value.is_finite()
    }

    fn supports(target: &CoordinateTarget) -> bool {
        target.column.is_coordinate()
    }

    fn supports_operator(target: &CoordinateTarget, operator: CoordinateOperator) -> bool {
        operator != CoordinateOperator::Inside || target.lat_lon().is_some()
    }

    fn build(
        operator: CoordinateOperator,
        target: &CoordinateTarget,
        values: &[f64],
    ) -> Result<FilterClause, FilterError> {
        if !Self::supports(target) {
            return Err(FilterError::UnsupportedColumn(target.column.display_name.clone()));
        }
        check_values(operator, values, Self::is_valid_value)?;

        let mut args = if operator == CoordinateOperator::Inside {
            let (latitude, longitude) = target.lat_lon().ok_or_else(|| {
                FilterError::UnsupportedColumn(format!(
                    "{} (inside needs a latitude and a longitude column)",
                    target.column.display_name
                ))
            })?;
            vec![
                Expression::Dimension(latitude.field_ref.clone()),
                Expression::Dimension(longitude.field_ref.clone()),
            ]
        } else {
            vec![Expression::Dimension(target.column.field_ref.clone())]
        };
        args.extend(number_operands(values)?);
        Ok(FilterClause::new(Expression::call(operator.wire_name(), args)))
    }

    fn decompose(
        provider: &dyn MetadataProvider,
        query: &Query,
        stage: usize,
        clause: &FilterClause,
    ) -> Option<FilterParts<CoordinateOperator, CoordinateTarget, f64>> {
        let (name, column, rest) = split_clause(provider, query, stage, clause)?;
        let operator = CoordinateOperator::from_wire_name(name)?;
        if !column.is_coordinate() {
            return None;
        }

        let (target, rest) = if operator == CoordinateOperator::Inside {
            let (second, rest) = rest.split_first()?;
            let second = provider.column_for_ref(query, stage, second.as_field_ref()?)?;
            let target = CoordinateTarget::new(column).with_second_column(second);
            target.lat_lon()?;
            (target, rest)
        } else {
            (CoordinateTarget::new(column), rest)
        };
        if !operator.accepts_count(rest.len()) {
            return None;
        }
        Some(FilterParts {
            operator,
            target,
            values: number_values(rest)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EditorStatus, FilterEditor};
    use mbql_ir::{FieldRef, Metadata};
    use serde_json::json;

    fn metadata() -> Metadata {
        serde_json::from_value(json!({
            "databases": [{
                "id": 1,
                "name": "Sample",
                "tables": [{
                    "id": 40,
                    "name": "PEOPLE",
                    "display_name": "People",
                    "fields": [
                        {"id": 401, "name": "LATITUDE", "display_name": "Latitude",
                         "base_type": "type/Float", "semantic_type": "type/Latitude"},
                        {"id": 402, "name": "LONGITUDE", "display_name": "Longitude",
                         "base_type": "type/Float", "semantic_type": "type/Longitude"},
                        {"id": 403, "name": "AGE", "display_name": "Age", "base_type": "type/Integer"}
                    ]
                }]
            }]
        }))
        .unwrap()
    }

    fn column(metadata: &Metadata, id: i64) -> ColumnMetadata {
        metadata
            .column_for_ref(&Query::table(1, 40), 0, &FieldRef::field(id))
            .unwrap()
    }

    #[test]
    fn test_inside_wire_shape() {
        let metadata = metadata();
        let query = Query::table(1, 40);
        let target = CoordinateTarget::new(column(&metadata, 401))
            .with_second_column(column(&metadata, 402));

        let clause = CoordinateFilter::build(
            CoordinateOperator::Inside,
            &target,
            &[45.0, -120.5, 30.0, -100.0],
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&clause).unwrap(),
            json!(["inside", ["field", 401, null], ["field", 402, null], 45, -120.5, 30, -100])
        );

        let parts = CoordinateFilter::decompose(&metadata, &query, 0, &clause).unwrap();
        assert_eq!(parts.operator, CoordinateOperator::Inside);
        assert_eq!(parts.target, target);
        assert_eq!(parts.values, vec![45.0, -120.5, 30.0, -100.0]);
    }

    #[test]
    fn test_inside_from_longitude_orders_columns() {
        let metadata = metadata();
        let target = CoordinateTarget::new(column(&metadata, 402))
            .with_second_column(column(&metadata, 401));
        let clause =
            CoordinateFilter::build(CoordinateOperator::Inside, &target, &[1.0, 2.0, 0.0, 3.0])
                .unwrap();
        assert_eq!(clause.args()[0], FieldRef::field(401).into());
        assert_eq!(clause.args()[1], FieldRef::field(402).into());
    }

    #[test]
    fn test_inside_needs_second_column() {
        let metadata = metadata();
        let target = CoordinateTarget::new(column(&metadata, 401));
        assert!(matches!(
            CoordinateFilter::build(CoordinateOperator::Inside, &target, &[1.0, 2.0, 0.0, 3.0]),
            Err(FilterError::UnsupportedColumn(_))
        ));

        let editor = FilterEditor::<CoordinateFilter>::for_target(target)
            .with_operator(CoordinateOperator::Inside)
            .with_values(vec![Some(1.0), Some(2.0), Some(0.0), Some(3.0)]);
        assert_eq!(editor.status(), EditorStatus::Invalid);
        assert!(editor.commit().is_none());

        let paired = editor.with_target(
            CoordinateTarget::new(column(&metadata, 401)).with_second_column(column(&metadata, 402)),
        );
        assert_eq!(paired.status(), EditorStatus::Valid);
        assert!(paired.commit().is_some());
    }

    #[test]
    fn test_simple_operators_round_trip() {
        let metadata = metadata();
        let query = Query::table(1, 40);
        let target = CoordinateTarget::new(column(&metadata, 401));

        for &operator in CoordinateFilter::operators() {
            if operator == CoordinateOperator::Inside {
                continue;
            }
            let values: Vec<f64> = match operator.value_count() {
                2 => vec![10.0, 20.0],
                _ if operator.has_multiple_values() => vec![1.5, 2.5, 3.5],
                _ => vec![7.25],
            };
            let clause = CoordinateFilter::build(operator, &target, &values).unwrap();
            let parts = CoordinateFilter::decompose(&metadata, &query, 0, &clause).unwrap();
            assert_eq!(parts.operator, operator);
            assert_eq!(parts.values, values);
            assert_eq!(parts.target, target);
        }
    }

    #[test]
    fn test_rejects_plain_numbers() {
        let metadata = metadata();
        let age = CoordinateTarget::new(column(&metadata, 403));
        assert!(!CoordinateFilter::supports(&age));
        assert!(matches!(
            CoordinateFilter::build(CoordinateOperator::Greater, &age, &[18.0]),
            Err(FilterError::UnsupportedColumn(_))
        ));
    }

    #[test]
    fn test_second_column_candidates() {
        let metadata = metadata();
        let query = Query::table(1, 40);

        let candidates = second_column_candidates(&metadata, &query, 0, &column(&metadata, 401));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "LONGITUDE");

        let candidates = second_column_candidates(&metadata, &query, 0, &column(&metadata, 403));
        assert!(candidates.is_empty());
    }
}
