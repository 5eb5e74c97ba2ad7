//! Drill availability and application against the sample database
//!
//! Run with: cargo test --package mbql-drill --test drills

mod common;

use common::*;
use mbql_drill::{apply, available, ClickContext, DrillDescriptor, DrillError, DrillType};
use mbql_ir::{AggregationClause, BreakoutClause, Direction, FieldRef, Metadata, OrderBy, Query};
use serde_json::json;

fn drill_types(descriptors: &[DrillDescriptor]) -> Vec<DrillType> {
    descriptors.iter().map(DrillDescriptor::drill_type).collect()
}

fn find(
    metadata: &Metadata,
    query: &Query,
    stage: usize,
    click: &ClickContext,
    drill_type: DrillType,
) -> Option<DrillDescriptor> {
    available(metadata, query, stage, click)
        .into_iter()
        .find(|descriptor| descriptor.drill_type() == drill_type)
}

fn pk_cell(metadata: &Metadata) -> ClickContext {
    ClickContext::cell(column(metadata, &orders(), 0, "ID"), json!(10))
}

#[test]
fn test_header_drills_in_registration_order() {
    let metadata = sample();
    let click = ClickContext::header(column(&metadata, &orders(), 0, "TOTAL"));

    assert_eq!(
        drill_types(&available(&metadata, &orders(), 0, &click)),
        vec![
            DrillType::Distribution,
            DrillType::Sort,
            DrillType::SummarizeColumn,
            DrillType::SummarizeColumnByTime,
        ]
    );
}

#[test]
fn test_available_is_deterministic() {
    let metadata = sample();
    let click = ClickContext::cell(column(&metadata, &orders(), 0, "TOTAL"), json!(42.5));
    assert_eq!(
        available(&metadata, &orders(), 0, &click),
        available(&metadata, &orders(), 0, &click)
    );
}

#[test]
fn test_zoom_with_single_pk() {
    let metadata = sample();
    let click = pk_cell(&metadata).with_row(vec![]);
    let drill = find(&metadata, &orders(), 0, &click, DrillType::Zoom).unwrap();
    assert!(drill.choices().is_empty());

    let query = apply(&metadata, &orders(), 0, &drill).unwrap();
    assert_eq!(
        serde_json::to_value(query.filters(0).unwrap()).unwrap(),
        json!([["=", ["field", ORDERS_ID, null], 10]])
    );
}

#[test]
fn test_zoom_unavailable() {
    let metadata = sample();

    // header
    let header = ClickContext::header(column(&metadata, &orders(), 0, "ID"));
    assert!(find(&metadata, &orders(), 0, &header, DrillType::Zoom).is_none());

    // empty cell
    let empty = ClickContext::cell(column(&metadata, &orders(), 0, "ID"), json!(null));
    assert!(find(&metadata, &orders(), 0, &empty, DrillType::Zoom).is_none());

    // foreign key
    let fk = ClickContext::cell(column(&metadata, &orders(), 0, "PRODUCT_ID"), json!(5));
    assert!(find(&metadata, &orders(), 0, &fk, DrillType::Zoom).is_none());

    // two primary keys
    let two_pks = sample_with_two_pks();
    assert!(find(&two_pks, &orders(), 0, &pk_cell(&metadata), DrillType::Zoom).is_none());

    // not editable
    let hidden = sample_not_editable();
    assert!(available(&hidden, &orders(), 0, &pk_cell(&metadata)).is_empty());

    // native query
    let native = Query::native(DB, "SELECT * FROM ORDERS");
    assert!(find(&metadata, &native, 0, &pk_cell(&metadata), DrillType::Zoom).is_none());

    // aggregated stage
    let counted = orders()
        .aggregate(0, AggregationClause::new("count", None))
        .unwrap()
        .breakout(0, BreakoutClause::new(FieldRef::field(ORDERS_TOTAL)))
        .unwrap();
    let total = ClickContext::cell(column(&metadata, &counted, 0, "TOTAL"), json!(10));
    assert!(find(&metadata, &counted, 0, &total, DrillType::Zoom).is_none());
}

#[test]
fn test_fk_filter() {
    let metadata = sample();
    let click = ClickContext::cell(column(&metadata, &orders(), 0, "PRODUCT_ID"), json!(14));
    let descriptors = available(&metadata, &orders(), 0, &click);
    assert_eq!(drill_types(&descriptors), vec![DrillType::FkFilter]);

    let query = apply(&metadata, &orders(), 0, &descriptors[0]).unwrap();
    assert_eq!(
        serde_json::to_value(query.filters(0).unwrap()).unwrap(),
        json!([["=", ["field", ORDERS_PRODUCT_ID, null], 14]])
    );
}

#[test]
fn test_summarize_column_by_time() {
    let metadata = sample();
    let click = ClickContext::header(column(&metadata, &orders(), 0, "TOTAL"));
    let drill = find(&metadata, &orders(), 0, &click, DrillType::SummarizeColumnByTime).unwrap();

    let query = apply(&metadata, &orders(), 0, &drill).unwrap();
    assert_eq!(query.aggregations(0).unwrap().len(), 1);
    assert_eq!(query.breakouts(0).unwrap().len(), 1);
    assert_eq!(
        serde_json::to_value(query.stage(0).unwrap()).unwrap(),
        json!({
            "aggregations": [["sum", ["field", ORDERS_TOTAL, null]]],
            "breakouts": [["field", ORDERS_CREATED_AT, {"temporal-unit": "month"}]]
        })
    );
}

#[test]
fn test_summarize_column_by_time_unavailable() {
    let metadata = sample();

    let created_at = ClickContext::header(column(&metadata, &orders(), 0, "CREATED_AT"));
    assert!(find(&metadata, &orders(), 0, &created_at, DrillType::SummarizeColumnByTime).is_none());

    let cell = ClickContext::cell(column(&metadata, &orders(), 0, "TOTAL"), json!(10));
    assert!(find(&metadata, &orders(), 0, &cell, DrillType::SummarizeColumnByTime).is_none());

    let null_cell = ClickContext::cell(column(&metadata, &orders(), 0, "TOTAL"), json!(null));
    assert!(find(&metadata, &orders(), 0, &null_cell, DrillType::SummarizeColumnByTime).is_none());

    let details = ClickContext::header(column(&metadata, &orders(), 0, "DETAILS"));
    assert!(find(&metadata, &orders(), 0, &details, DrillType::SummarizeColumnByTime).is_none());

    let no_dates = sample_without_dates();
    let total = ClickContext::header(column(&no_dates, &orders(), 0, "TOTAL"));
    assert!(find(&no_dates, &orders(), 0, &total, DrillType::SummarizeColumnByTime).is_none());

    let hidden = sample_not_editable();
    let total = ClickContext::header(column(&metadata, &orders(), 0, "TOTAL"));
    assert!(find(&hidden, &orders(), 0, &total, DrillType::SummarizeColumnByTime).is_none());
}

#[test]
fn test_distribution_breakouts() {
    let metadata = sample();

    let total = ClickContext::header(column(&metadata, &orders(), 0, "TOTAL"));
    let drill = find(&metadata, &orders(), 0, &total, DrillType::Distribution).unwrap();
    let query = apply(&metadata, &orders(), 0, &drill).unwrap();
    assert_eq!(
        serde_json::to_value(query.stage(0).unwrap()).unwrap(),
        json!({
            "aggregations": [["count"]],
            "breakouts": [["field", ORDERS_TOTAL, {"binning": {"strategy": "default"}}]]
        })
    );

    let created_at = ClickContext::header(column(&metadata, &orders(), 0, "CREATED_AT"));
    let drill = find(&metadata, &orders(), 0, &created_at, DrillType::Distribution).unwrap();
    let query = apply(&metadata, &orders(), 0, &drill).unwrap();
    assert_eq!(
        query.breakouts(0).unwrap()[0].column().temporal_unit(),
        Some("month")
    );

    let id = ClickContext::header(column(&metadata, &orders(), 0, "ID"));
    assert!(find(&metadata, &orders(), 0, &id, DrillType::Distribution).is_none());
}

#[test]
fn test_sort_offers_remaining_direction() {
    let metadata = sample();
    let click = ClickContext::header(column(&metadata, &orders(), 0, "TOTAL"));

    let drill = find(&metadata, &orders(), 0, &click, DrillType::Sort).unwrap();
    assert_eq!(drill.choices(), &["asc".to_string(), "desc".to_string()]);
    assert_eq!(drill.selected(), Some("asc"));

    let sorted = apply(&metadata, &orders(), 0, &drill).unwrap();
    let drill = find(&metadata, &sorted, 0, &click, DrillType::Sort).unwrap();
    assert_eq!(drill.choices(), &["desc".to_string()]);

    let resorted = apply(&metadata, &sorted, 0, &drill.select("desc")).unwrap();
    assert_eq!(
        resorted.orderings(0).unwrap(),
        &[OrderBy(Direction::Desc, FieldRef::field(ORDERS_TOTAL))]
    );
}

#[test]
fn test_summarize_column_choices() {
    let metadata = sample();
    let click = ClickContext::header(column(&metadata, &orders(), 0, "QUANTITY"));
    let drill = find(&metadata, &orders(), 0, &click, DrillType::SummarizeColumn).unwrap();
    assert_eq!(drill.choices(), &["sum", "avg", "distinct"].map(String::from));

    let query = apply(&metadata, &orders(), 0, &drill.select("avg")).unwrap();
    assert_eq!(query.aggregations(0).unwrap()[0].operator(), Some("avg"));
}

#[test]
fn test_quick_filter_choices() {
    let metadata = sample();

    let total = ClickContext::cell(column(&metadata, &orders(), 0, "TOTAL"), json!(42.5));
    let drill = find(&metadata, &orders(), 0, &total, DrillType::QuickFilter).unwrap();
    assert_eq!(drill.choices(), &["<", ">", "=", "!="].map(String::from));

    let empty = ClickContext::cell(column(&metadata, &orders(), 0, "TOTAL"), json!(null));
    let drill = find(&metadata, &orders(), 0, &empty, DrillType::QuickFilter).unwrap();
    assert_eq!(drill.choices(), &["is-null", "not-null"].map(String::from));
    let query = apply(&metadata, &orders(), 0, &drill.select("not-null")).unwrap();
    assert_eq!(
        serde_json::to_value(query.filters(0).unwrap()).unwrap(),
        json!([["not-null", ["field", ORDERS_TOTAL, null]]])
    );

    let products = Query::table(DB, PRODUCTS);
    let category = ClickContext::cell(column(&metadata, &products, 0, "CATEGORY"), json!("Widget"));
    let drill = find(&metadata, &products, 0, &category, DrillType::QuickFilter).unwrap();
    assert_eq!(drill.choices(), &["=", "!="].map(String::from));
    let query = apply(&metadata, &products, 0, &drill.select("!=")).unwrap();
    assert_eq!(
        serde_json::to_value(query.filters(0).unwrap()).unwrap(),
        json!([["!=", ["field", 203, null], "Widget"]])
    );
}

#[test]
fn test_quick_filter_on_aggregated_stage_appends_stage() {
    let metadata = sample();
    let counted = orders()
        .aggregate(0, AggregationClause::new("count", None))
        .unwrap()
        .breakout(
            0,
            BreakoutClause::new(FieldRef::field(ORDERS_CREATED_AT).with_temporal_unit("month")),
        )
        .unwrap();
    let click = ClickContext::cell(column(&metadata, &counted, 0, "count"), json!(12));
    let drill = find(&metadata, &counted, 0, &click, DrillType::QuickFilter).unwrap();

    let query = apply(&metadata, &counted, 0, &drill.select(">")).unwrap();
    assert_eq!(query.stage_count(), 2);
    assert!(query.filters(0).unwrap().is_empty());
    assert_eq!(
        serde_json::to_value(query.filters(1).unwrap()).unwrap(),
        json!([[">", ["field", "count", {"base-type": "type/BigInteger"}], 12]])
    );
}

#[test]
fn test_quick_filter_on_numeric_column_with_text_value() {
    let metadata = sample();
    let click = ClickContext::cell(column(&metadata, &orders(), 0, "TOTAL"), json!("10"));
    let drill = find(&metadata, &orders(), 0, &click, DrillType::QuickFilter).unwrap();
    assert_eq!(drill.choices(), &["=", "!="].map(String::from));

    for choice in drill.choices() {
        let query = apply(&metadata, &orders(), 0, &drill.select(choice.as_str())).unwrap();
        assert_eq!(
            serde_json::to_value(query.filters(0).unwrap()).unwrap(),
            json!([[choice, ["field", ORDERS_TOTAL, null], "10"]])
        );
    }
}

#[test]
fn test_stale_descriptor_is_rejected() {
    let metadata = sample();
    let click = pk_cell(&metadata);
    let drill = find(&metadata, &orders(), 0, &click, DrillType::Zoom).unwrap();

    let changed = orders()
        .aggregate(0, AggregationClause::new("count", None))
        .unwrap();
    assert!(matches!(
        apply(&metadata, &changed, 0, &drill),
        Err(DrillError::InvalidDrillDescriptor(_))
    ));
    assert!(matches!(
        apply(&sample_with_two_pks(), &orders(), 0, &drill),
        Err(DrillError::InvalidDrillDescriptor(_))
    ));
}

#[test]
fn test_unknown_choice_is_rejected() {
    let metadata = sample();
    let click = ClickContext::header(column(&metadata, &orders(), 0, "TOTAL"));
    let drill = find(&metadata, &orders(), 0, &click, DrillType::Sort).unwrap();

    assert!(matches!(
        apply(&metadata, &orders(), 0, &drill.select("sideways")),
        Err(DrillError::InvalidDrillDescriptor(_))
    ));
}

#[test]
fn test_descriptor_wire_form_is_public_parts_only() {
    let metadata = sample();
    let click = ClickContext::header(column(&metadata, &orders(), 0, "TOTAL"));
    let drill = find(&metadata, &orders(), 0, &click, DrillType::Sort).unwrap();
    assert_eq!(
        serde_json::to_value(&drill).unwrap(),
        json!({"type": "drill-thru/sort", "choices": ["asc", "desc"], "selected": "asc"})
    );
}
