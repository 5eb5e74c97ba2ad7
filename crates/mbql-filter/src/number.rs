//! Number filters

use mbql_ir::{ColumnMetadata, Expression, FilterClause, MetadataProvider, Query};
use serde::{Deserialize, Serialize};

use crate::{
    check_values, number_operands, number_values, split_clause, FilterError, FilterKind,
    FilterOperator, FilterParts,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumberOperator {
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
    #[serde(rename = "is-null")]
    IsNull,
    #[serde(rename = "not-null")]
    NotNull,
}

const OPERATORS: &[NumberOperator] = &[
    NumberOperator::Equal,
    NumberOperator::NotEqual,
    NumberOperator::Greater,
    NumberOperator::Less,
    NumberOperator::Between,
    NumberOperator::GreaterOrEqual,
    NumberOperator::LessOrEqual,
    NumberOperator::IsNull,
    NumberOperator::NotNull,
];

impl FilterOperator for NumberOperator {
    fn wire_name(&self) -> &'static str {
        match self {
            NumberOperator::Equal => "=",
            NumberOperator::NotEqual => "!=",
            NumberOperator::Greater => ">",
            NumberOperator::Less => "<",
            NumberOperator::Between => "between",
            NumberOperator::GreaterOrEqual => ">=",
            NumberOperator::LessOrEqual => "<=",
            NumberOperator::IsNull => "is-null",
            NumberOperator::NotNull => "not-null",
        }
    }

    fn from_wire_name(name: &str) -> Option<Self> {
        OPERATORS.iter().copied().find(|op| op.wire_name() == name)
    }

    fn value_count(&self) -> usize {
        match self {
            NumberOperator::IsNull | NumberOperator::NotNull => 0,
            NumberOperator::Between => 2,
            _ => 1,
        }
    }

    fn has_multiple_values(&self) -> bool {
        matches!(self, NumberOperator::Equal | NumberOperator::NotEqual)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFilter;

impl FilterKind for NumberFilter {
    type Operator = NumberOperator;
    type Target = ColumnMetadata;
    type Value = f64;

    fn operators() -> &'static [NumberOperator] {
        OPERATORS
    }

    fn default_operator() -> NumberOperator {
        NumberOperator::Equal
    }

    fn is_valid_value(value: &f64) -> bool {
        value.is_finite()
    }

    fn supports(column: &ColumnMetadata) -> bool {
        column.is_numeric()
    }

    fn build(
        operator: NumberOperator,
        column: &ColumnMetadata,
        values: &[f64],
    ) -> Result<FilterClause, FilterError> {
        if !Self::supports(column) {
            return Err(FilterError::UnsupportedColumn(column.display_name.clone()));
        }
        check_values(operator, values, Self::is_valid_value)?;

        let mut args = vec![Expression::Dimension(column.field_ref.clone())];
        args.extend(number_operands(values)?);
        Ok(FilterClause::new(Expression::call(operator.wire_name(), args)))
    }

    fn decompose(
        provider: &dyn MetadataProvider,
        query: &Query,
        stage: usize,
        clause: &FilterClause,
    ) -> Option<FilterParts<NumberOperator, ColumnMetadata, f64>> {
        let (name, column, rest) = split_clause(provider, query, stage, clause)?;
        let operator = NumberOperator::from_wire_name(name)?;
        if !Self::supports(&column) || !operator.accepts_count(rest.len()) {
            return None;
        }
        Some(FilterParts {
            operator,
            target: column,
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
                    "id": 10,
                    "name": "ORDERS",
                    "display_name": "Orders",
                    "fields": [
                        {"id": 102, "name": "TOTAL", "display_name": "Total", "base_type": "type/Float"},
                        {"id": 107, "name": "SOURCE", "display_name": "Source", "base_type": "type/Text"}
                    ]
                }]
            }]
        }))
        .unwrap()
    }

    fn column(metadata: &Metadata, id: i64) -> ColumnMetadata {
        metadata
            .column_for_ref(&Query::table(1, 10), 0, &FieldRef::field(id))
            .unwrap()
    }

    #[test]
    fn test_is_valid() {
        assert!(!NumberFilter::is_valid(NumberOperator::Between, &[Some(5.0)]));
        assert!(NumberFilter::is_valid(NumberOperator::Between, &[Some(1.0), Some(5.0)]));
        assert!(NumberFilter::is_valid(NumberOperator::IsNull, &[]));
        assert!(!NumberFilter::is_valid(NumberOperator::IsNull, &[Some(1.0)]));
        assert!(NumberFilter::is_valid(NumberOperator::Equal, &[Some(1.0), Some(2.0), Some(3.0)]));
        assert!(!NumberFilter::is_valid(NumberOperator::Equal, &[]));
        assert!(!NumberFilter::is_valid(NumberOperator::Greater, &[None]));
        assert!(!NumberFilter::is_valid(NumberOperator::Greater, &[Some(f64::NAN)]));
    }

    #[test]
    fn test_build_decompose_every_operator() {
        let metadata = metadata();
        let query = Query::table(1, 10);
        let total = column(&metadata, 102);

        for &operator in NumberFilter::operators() {
            let values: Vec<f64> = match operator.value_count() {
                0 => vec![],
                1 if operator.has_multiple_values() => vec![10.0, 20.5],
                1 => vec![10.0],
                _ => vec![1.0, 99.5],
            };
            let clause = NumberFilter::build(operator, &total, &values).unwrap();
            let parts = NumberFilter::decompose(&metadata, &query, 0, &clause).unwrap();
            assert_eq!(parts.operator, operator);
            assert_eq!(parts.values, values);
            assert_eq!(parts.target, total);
        }
    }

    #[test]
    fn test_wire_shape() {
        let metadata = metadata();
        let total = column(&metadata, 102);
        let clause = NumberFilter::build(NumberOperator::Between, &total, &[1.0, 2.5]).unwrap();
        assert_eq!(
            serde_json::to_value(&clause).unwrap(),
            json!(["between", ["field", 102, null], 1, 2.5])
        );
    }

    #[test]
    fn test_build_errors() {
        let metadata = metadata();
        let total = column(&metadata, 102);
        let source = column(&metadata, 107);

        assert!(matches!(
            NumberFilter::build(NumberOperator::Between, &total, &[5.0]),
            Err(FilterError::InvalidArity { actual: 1, .. })
        ));
        assert!(matches!(
            NumberFilter::build(NumberOperator::Equal, &source, &[5.0]),
            Err(FilterError::UnsupportedColumn(_))
        ));
        assert!(matches!(
            NumberFilter::build(NumberOperator::Less, &total, &[f64::INFINITY]),
            Err(FilterError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_decompose_rejects_other_shapes() {
        let metadata = metadata();
        let query = Query::table(1, 10);
        let text = FilterClause::new(Expression::call(
            "=",
            vec![FieldRef::field(107).into(), Expression::string("Web")],
        ));
        assert!(NumberFilter::decompose(&metadata, &query, 0, &text).is_none());

        let contains = FilterClause::new(Expression::call(
            "contains",
            vec![FieldRef::field(102).into(), Expression::integer(1)],
        ));
        assert!(NumberFilter::decompose(&metadata, &query, 0, &contains).is_none());
    }

    #[test]
    fn test_operator_switch_keeps_values() {
        let metadata = metadata();
        let total = column(&metadata, 102);

        let editor = FilterEditor::<NumberFilter>::for_target(total);
        assert_eq!(editor.status(), EditorStatus::Editing);
        assert_eq!(editor.operator(), Some(NumberOperator::Equal));

        let editor = editor.with_value(0, Some(10.0)).with_value(1, Some(20.0));
        assert_eq!(editor.status(), EditorStatus::Valid);

        let between = editor.with_operator(NumberOperator::Between);
        assert_eq!(between.values(), &[Some(10.0), Some(20.0)]);

        let greater = between.with_operator(NumberOperator::Greater);
        assert_eq!(greater.values(), &[Some(10.0)]);

        let between_again = greater.with_operator(NumberOperator::Between);
        assert_eq!(between_again.values(), &[Some(10.0), None]);
        assert_eq!(between_again.status(), EditorStatus::Invalid);
        assert!(between_again.commit().is_none());

        let committed = between_again.with_value(1, Some(30.0)).commit().unwrap();
        assert_eq!(committed.operator(), Some("between"));
    }

    #[test]
    fn test_editor_from_clause() {
        let metadata = metadata();
        let query = Query::table(1, 10);
        let clause = NumberFilter::build(NumberOperator::NotNull, &column(&metadata, 102), &[]).unwrap();
        let editor = FilterEditor::<NumberFilter>::from_clause(&metadata, &query, 0, &clause).unwrap();
        assert_eq!(editor.status(), EditorStatus::Valid);
        assert_eq!(editor.commit(), Some(clause));

        assert_eq!(FilterEditor::<NumberFilter>::new().status(), EditorStatus::Uninitialized);
    }
}
