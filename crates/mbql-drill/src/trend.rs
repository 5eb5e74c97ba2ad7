//! Last value of a time series and its change from the previous period

use mbql_ir::ColumnMetadata;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{ClickContext, RowValue};

/// Relative change going from `a` to `b`, e.g. `0.5` for +50%
///
/// Growth from zero is infinite and falling to zero is always -100%.
/// Negative starting points are mirrored so that moving towards zero
/// counts as an increase.
pub fn compute_change(a: f64, b: f64) -> f64 {
    if a == 0.0 {
        return if b > 0.0 {
            f64::INFINITY
        } else if b < 0.0 {
            f64::NEG_INFINITY
        } else {
            0.0
        };
    }
    if b == 0.0 {
        return -1.0;
    }
    if a > 0.0 {
        return (b - a) / a;
    }
    if b < 0.0 {
        compute_change(-b, -a)
    } else {
        -compute_change(b, a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Comparison {
    /// No earlier row has a value
    Missing,
    Same {
        previous: f64,
        date: Option<JsonValue>,
    },
    Changed {
        previous: f64,
        date: Option<JsonValue>,
        change: f64,
        direction: Direction,
    },
}

/// Compares the last row's metric with the last earlier row that has one
///
/// `dimension` is the date column; its value on the earlier row is reported
/// with the comparison.
pub fn compare_previous(
    rows: &[Vec<JsonValue>],
    metric: usize,
    dimension: Option<usize>,
) -> Comparison {
    let Some((last, earlier)) = rows.split_last() else {
        return Comparison::Missing;
    };
    let Some(current) = last.get(metric).and_then(JsonValue::as_f64) else {
        return Comparison::Missing;
    };
    let Some((previous, row)) = earlier.iter().rev().find_map(|row| {
        row.get(metric)
            .and_then(JsonValue::as_f64)
            .map(|value| (value, row))
    }) else {
        return Comparison::Missing;
    };
    let date = dimension
        .and_then(|index| row.get(index))
        .filter(|value| !value.is_null())
        .cloned();

    let change = compute_change(previous, current);
    if change == 0.0 {
        Comparison::Same { previous, date }
    } else {
        Comparison::Changed {
            previous,
            date,
            change,
            direction: if change < 0.0 { Direction::Down } else { Direction::Up },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub value: f64,
    /// Date of the last row, when the results have a date column
    pub date: Option<JsonValue>,
    /// Click on the last row, for drilling from the headline value
    pub clicked: ClickContext,
    pub comparison: Comparison,
}

/// Headline value of `metric_name` over rows ordered by date
///
/// `None` when the column is missing or the last row has no value.
pub fn compute_trend(
    cols: &[ColumnMetadata],
    rows: &[Vec<JsonValue>],
    metric_name: &str,
) -> Option<Trend> {
    let metric = cols.iter().position(|col| col.name == metric_name)?;
    let dimension = cols.iter().position(ColumnMetadata::is_date_or_datetime);

    let last = rows.last()?;
    let value = last.get(metric).and_then(JsonValue::as_f64)?;
    let date = dimension.and_then(|index| last.get(index).cloned());

    let row = cols
        .iter()
        .zip(last.iter())
        .map(|(column, value)| RowValue {
            column: column.clone(),
            value: value.clone(),
        })
        .collect();
    let clicked = match (dimension, &date) {
        (Some(index), Some(date)) => ClickContext::cell(cols[index].clone(), date.clone()),
        _ => ClickContext::cell(cols[metric].clone(), JsonValue::from(value)),
    }
    .with_row(row);

    Some(Trend {
        value,
        date,
        clicked,
        comparison: compare_previous(rows, metric, dimension),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbql_ir::{BaseType, FieldRef};
    use serde_json::json;

    fn column(name: &str, base_type: BaseType) -> ColumnMetadata {
        ColumnMetadata {
            name: name.to_string(),
            display_name: name.to_string(),
            long_display_name: name.to_string(),
            base_type,
            effective_type: None,
            semantic_type: None,
            id: None,
            table_id: None,
            fk_target_field_id: None,
            fk_field_id: None,
            field_ref: FieldRef::named(name, base_type.as_str()),
        }
    }

    #[test]
    fn test_compute_change() {
        assert_eq!(compute_change(0.0, 0.0), 0.0);
        assert_eq!(compute_change(0.0, 5.0), f64::INFINITY);
        assert_eq!(compute_change(0.0, -5.0), f64::NEG_INFINITY);
        assert_eq!(compute_change(10.0, 0.0), -1.0);
        assert_eq!(compute_change(-10.0, 0.0), -1.0);
        assert_eq!(compute_change(10.0, 15.0), 0.5);
        assert_eq!(compute_change(10.0, -10.0), -2.0);
        // moving from -10 towards -5 is an increase
        assert_eq!(compute_change(-10.0, -5.0), 1.0);
        assert_eq!(compute_change(-10.0, -5.0), compute_change(5.0, 10.0));
        assert_eq!(compute_change(-10.0, 5.0), -compute_change(5.0, -10.0));
    }

    #[test]
    fn test_compare_previous_skips_empty_rows() {
        let rows = vec![
            vec![json!("2024-01-01"), json!(100)],
            vec![json!("2024-02-01"), JsonValue::Null],
            vec![json!("2024-03-01"), json!(150)],
        ];
        assert_eq!(
            compare_previous(&rows, 1, Some(0)),
            Comparison::Changed {
                previous: 100.0,
                date: Some(json!("2024-01-01")),
                change: 0.5,
                direction: Direction::Up
            }
        );

        let flat = vec![vec![json!(1), json!(7)], vec![json!(2), json!(7)]];
        assert_eq!(
            compare_previous(&flat, 1, None),
            Comparison::Same {
                previous: 7.0,
                date: None
            }
        );

        let single = vec![vec![json!(1), json!(7)]];
        assert_eq!(compare_previous(&single, 1, Some(0)), Comparison::Missing);
    }

    #[test]
    fn test_compute_trend() {
        let cols = vec![column("CREATED_AT", BaseType::DateTime), column("sum", BaseType::Float)];
        let rows = vec![
            vec![json!("2024-01-01"), json!(80)],
            vec![json!("2024-02-01"), json!(40)],
        ];

        let trend = compute_trend(&cols, &rows, "sum").unwrap();
        assert_eq!(trend.value, 40.0);
        assert_eq!(trend.date, Some(json!("2024-02-01")));
        assert_eq!(trend.clicked.column.name, "CREATED_AT");
        assert_eq!(trend.clicked.row.as_ref().map(Vec::len), Some(2));
        assert!(matches!(
            trend.comparison,
            Comparison::Changed { direction: Direction::Down, .. }
        ));

        assert!(compute_trend(&cols, &rows, "avg").is_none());
        let empty_last = vec![vec![json!("2024-01-01"), JsonValue::Null]];
        assert!(compute_trend(&cols, &empty_last, "sum").is_none());
    }
}
