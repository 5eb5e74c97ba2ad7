//! Queries and expressions read from wire JSON
//!
//! Run with: cargo test --package mbql-ir --test wire_format

use mbql_ir::classify::{self, NodeKind};
use mbql_ir::{Direction, Expression, FieldRef, Query, WireError};
use serde_json::json;

#[test]
fn test_query_from_wire() {
    let query: Query = serde_json::from_value(json!({
        "database": 1,
        "source": {"type": "table", "table_id": 10},
        "stages": [
            {
                "filters": [["and", [">", ["field", 102, null], 10], ["segment", 2]]],
                "aggregations": [["sum", ["field", 102, null]]],
                "breakouts": [["field", 103, {"temporal-unit": "month"}]],
                "order-by": [["desc", ["aggregation", 0]]]
            },
            {
                "filters": [[">", ["field", "sum", {"base-type": "type/Float"}], 100]],
                "limit": 10
            }
        ]
    }))
    .unwrap();

    assert_eq!(query.stage_count(), 2);
    assert_eq!(query.source_table(), Some(10));
    assert_eq!(query.filters(0).unwrap()[0].operator(), Some("and"));
    assert_eq!(
        query.breakouts(0).unwrap()[0].column().temporal_unit(),
        Some("month")
    );
    let order = &query.orderings(0).unwrap()[0];
    assert_eq!(order.direction(), Direction::Desc);
    assert_eq!(order.column(), &FieldRef::aggregation(0));
    assert_eq!(query.stage(1).unwrap().limit, Some(10));
}

#[test]
fn test_query_with_bad_expression_is_rejected() {
    let result: Result<Query, _> = serde_json::from_value(json!({
        "database": 1,
        "source": {"type": "table", "table_id": 10},
        "stages": [{"filters": [["bogus-op", ["field", 1, null]]]}]
    }));
    let err = result.unwrap_err().to_string();
    assert!(err.contains("bogus-op"), "{}", err);
}

#[test]
fn test_classifier_matches_conversion_on_nested_trees() {
    let cases = [
        (json!(["case", [[["=", ["field", 1, null], "A"], 1]], {"default": 0}]), Some(NodeKind::Case)),
        (json!(["coalesce", ["field", 1, null], 0]), Some(NodeKind::Function)),
        (json!(["-", ["field", 1, null]]), Some(NodeKind::Operator)),
        (json!(["expression", "Profit"]), Some(NodeKind::Dimension)),
        (json!(["metric", 1]), Some(NodeKind::Metric)),
        (json!(null), None),
    ];
    for (wire, kind) in cases {
        assert_eq!(classify::classify(&wire), kind, "{}", wire);
        assert_eq!(Expression::from_wire(&wire).is_ok(), kind.is_some(), "{}", wire);
    }
}

#[test]
fn test_metric_with_extra_element() {
    assert!(matches!(
        Expression::from_wire(&json!(["metric", 1, 2])),
        Err(WireError::Malformed { .. })
    ));
    assert!(!classify::is_metric(&json!(["metric", 1, 2])));
}

#[test]
fn test_fingerprint_ignores_construction_path() {
    let built = Query::table(1, 10).append_stage();
    let parsed: Query = serde_json::from_value(json!({
        "database": 1,
        "source": {"type": "table", "table_id": 10},
        "stages": [{}, {}]
    }))
    .unwrap();
    assert_eq!(built.fingerprint(), parsed.fingerprint());
}
