//! Multi-stage query values
//!
//! Stages are shared between a query and every query derived from it, so
//! adding one clause clones one stage and bumps reference counts for the rest.

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

use crate::expr::{Call, Expression, FieldRef};
use crate::{DatabaseId, TableId};

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("Stage {index} out of range (query has {count} stages)")]
    StageOutOfRange { index: usize, count: usize },

    #[error("Stage {0} of a native query cannot hold structured clauses")]
    NativeStage(usize),
}

/// Where the first stage reads from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuerySource {
    Table { table_id: TableId },
    Native { native: String },
}

/// Boolean expression restricting the rows of a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterClause(Expression);

impl FilterClause {
    pub fn new(expr: Expression) -> Self {
        Self(expr)
    }

    pub fn expression(&self) -> &Expression {
        &self.0
    }

    pub fn into_expression(self) -> Expression {
        self.0
    }

    /// Head of the clause, e.g. `"between"`
    pub fn operator(&self) -> Option<&str> {
        self.0.head()
    }

    pub fn args(&self) -> &[Expression] {
        self.0.as_call().map(|call| call.args.as_slice()).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregationClause(Expression);

impl AggregationClause {
    /// `["count"]`, `["sum", ref]`, ...
    pub fn new(operator: &str, column: Option<FieldRef>) -> Self {
        let args = column.into_iter().map(Expression::Dimension).collect();
        Self(Expression::Function(Call::new(operator, args)))
    }

    pub fn from_expression(expr: Expression) -> Self {
        Self(expr)
    }

    pub fn expression(&self) -> &Expression {
        &self.0
    }

    pub fn operator(&self) -> Option<&str> {
        self.0.head()
    }

    pub fn column(&self) -> Option<&FieldRef> {
        self.0
            .as_call()
            .and_then(|call| call.args.first())
            .and_then(Expression::as_field_ref)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreakoutClause(FieldRef);

impl BreakoutClause {
    pub fn new(column: FieldRef) -> Self {
        Self(column)
    }

    pub fn column(&self) -> &FieldRef {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// `["asc", ref]` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy(pub Direction, pub FieldRef);

impl OrderBy {
    pub fn direction(&self) -> Direction {
        self.0
    }

    pub fn column(&self) -> &FieldRef {
        &self.1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterClause>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregations: Vec<AggregationClause>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakouts: Vec<BreakoutClause>,

    #[serde(default, rename = "order-by", skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl Stage {
    pub fn is_aggregated(&self) -> bool {
        !self.aggregations.is_empty() || !self.breakouts.is_empty()
    }
}

/// Top-level query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub database: DatabaseId,
    pub source: QuerySource,

    #[serde(default = "initial_stages", deserialize_with = "non_empty_stages")]
    stages: Vec<Arc<Stage>>,
}

fn initial_stages() -> Vec<Arc<Stage>> {
    vec![Arc::new(Stage::default())]
}

fn non_empty_stages<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Arc<Stage>>, D::Error> {
    let stages = Vec::<Arc<Stage>>::deserialize(deserializer)?;
    Ok(if stages.is_empty() { initial_stages() } else { stages })
}

impl Query {
    pub fn table(database: DatabaseId, table_id: TableId) -> Self {
        Self {
            database,
            source: QuerySource::Table { table_id },
            stages: initial_stages(),
        }
    }

    pub fn native(database: DatabaseId, native: impl Into<String>) -> Self {
        Self {
            database,
            source: QuerySource::Native {
                native: native.into(),
            },
            stages: initial_stages(),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self.source, QuerySource::Native { .. })
    }

    pub fn source_table(&self) -> Option<TableId> {
        match self.source {
            QuerySource::Table { table_id } => Some(table_id),
            QuerySource::Native { .. } => None,
        }
    }

    pub fn stages(&self) -> &[Arc<Stage>] {
        &self.stages
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn last_stage_index(&self) -> usize {
        self.stages.len() - 1
    }

    pub fn stage(&self, index: usize) -> Result<&Stage, QueryError> {
        self.stages
            .get(index)
            .map(Arc::as_ref)
            .ok_or(QueryError::StageOutOfRange {
                index,
                count: self.stages.len(),
            })
    }

    /// Stage reads structured columns (not the raw native result)
    pub fn is_structured_stage(&self, index: usize) -> bool {
        index < self.stages.len() && !(self.is_native() && index == 0)
    }

    pub fn filters(&self, stage: usize) -> Result<&[FilterClause], QueryError> {
        Ok(&self.stage(stage)?.filters)
    }

    pub fn aggregations(&self, stage: usize) -> Result<&[AggregationClause], QueryError> {
        Ok(&self.stage(stage)?.aggregations)
    }

    pub fn breakouts(&self, stage: usize) -> Result<&[BreakoutClause], QueryError> {
        Ok(&self.stage(stage)?.breakouts)
    }

    pub fn orderings(&self, stage: usize) -> Result<&[OrderBy], QueryError> {
        Ok(&self.stage(stage)?.order_by)
    }

    pub fn filter(&self, stage: usize, clause: FilterClause) -> Result<Query, QueryError> {
        self.update_stage(stage, |s| s.filters.push(clause))
    }

    pub fn aggregate(&self, stage: usize, clause: AggregationClause) -> Result<Query, QueryError> {
        self.update_stage(stage, |s| s.aggregations.push(clause))
    }

    pub fn breakout(&self, stage: usize, clause: BreakoutClause) -> Result<Query, QueryError> {
        self.update_stage(stage, |s| s.breakouts.push(clause))
    }

    /// Adds an ordering, replacing any existing ordering on the same column
    pub fn order_by(&self, stage: usize, order: OrderBy) -> Result<Query, QueryError> {
        self.update_stage(stage, |s| {
            s.order_by.retain(|existing| !existing.column().same_column(order.column()));
            s.order_by.push(order);
        })
    }

    pub fn remove_aggregations_and_breakouts(&self, stage: usize) -> Result<Query, QueryError> {
        self.update_stage(stage, |s| {
            s.aggregations.clear();
            s.breakouts.clear();
            // orderings on aggregation outputs no longer resolve
            s.order_by
                .retain(|order| !matches!(order.column(), FieldRef::Aggregation { .. }));
        })
    }

    pub fn append_stage(&self) -> Query {
        let mut query = self.clone();
        query.stages.push(Arc::new(Stage::default()));
        query
    }

    fn update_stage(
        &self,
        index: usize,
        update: impl FnOnce(&mut Stage),
    ) -> Result<Query, QueryError> {
        self.stage(index)?;
        if !self.is_structured_stage(index) {
            return Err(QueryError::NativeStage(index));
        }
        let mut query = self.clone();
        update(Arc::make_mut(&mut query.stages[index]));
        Ok(query)
    }

    /// Calculate fingerprint (SHA-256) of the canonical JSON form
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("query should always serialize");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn total() -> FieldRef {
        FieldRef::field(12)
    }

    #[test]
    fn test_adding_a_clause_leaves_the_original_untouched() {
        let query = Query::table(1, 2);
        let filtered = query
            .filter(0, FilterClause::new(Expression::call(">", vec![total().into(), Expression::integer(10)])))
            .unwrap();

        assert!(query.filters(0).unwrap().is_empty());
        assert_eq!(filtered.filters(0).unwrap().len(), 1);
        assert_eq!(filtered.filters(0).unwrap()[0].operator(), Some(">"));
    }

    #[test]
    fn test_untouched_stages_are_shared() {
        let query = Query::table(1, 2).append_stage();
        let updated = query
            .aggregate(1, AggregationClause::new("count", None))
            .unwrap();

        assert!(Arc::ptr_eq(&query.stages()[0], &updated.stages()[0]));
        assert!(!Arc::ptr_eq(&query.stages()[1], &updated.stages()[1]));
    }

    #[test]
    fn test_stage_out_of_range() {
        let query = Query::table(1, 2);
        assert_eq!(
            query.filters(3).unwrap_err(),
            QueryError::StageOutOfRange { index: 3, count: 1 }
        );
    }

    #[test]
    fn test_native_first_stage_is_read_only() {
        let query = Query::native(1, "SELECT * FROM ORDERS");
        let clause = AggregationClause::new("count", None);

        assert_eq!(query.aggregate(0, clause.clone()).unwrap_err(), QueryError::NativeStage(0));
        assert!(query.append_stage().aggregate(1, clause).is_ok());
    }

    #[test]
    fn test_order_by_replaces_same_column() {
        let query = Query::table(1, 2)
            .order_by(0, OrderBy(Direction::Asc, total()))
            .unwrap()
            .order_by(0, OrderBy(Direction::Desc, total().with_temporal_unit("month")))
            .unwrap();

        let orderings = query.orderings(0).unwrap();
        assert_eq!(orderings.len(), 1);
        assert_eq!(orderings[0].direction(), Direction::Desc);
    }

    #[test]
    fn test_remove_aggregations_and_breakouts() {
        let query = Query::table(1, 2)
            .aggregate(0, AggregationClause::new("sum", Some(total())))
            .unwrap()
            .breakout(0, BreakoutClause::new(FieldRef::field(14).with_temporal_unit("month")))
            .unwrap()
            .order_by(0, OrderBy(Direction::Desc, FieldRef::aggregation(0)))
            .unwrap();
        assert!(query.stage(0).unwrap().is_aggregated());

        let raw = query.remove_aggregations_and_breakouts(0).unwrap();
        assert!(!raw.stage(0).unwrap().is_aggregated());
        assert!(raw.orderings(0).unwrap().is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let query = Query::table(1, 2)
            .filter(0, FilterClause::new(Expression::call("between", vec![
                total().into(),
                Expression::integer(1),
                Expression::integer(5),
            ])))
            .unwrap()
            .aggregate(0, AggregationClause::new("sum", Some(total())))
            .unwrap();

        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["source"], json!({"type": "table", "table_id": 2}));
        assert_eq!(json["stages"][0]["filters"][0], json!(["between", ["field", 12, null], 1, 5]));
        assert_eq!(json["stages"][0]["aggregations"][0], json!(["sum", ["field", 12, null]]));

        let parsed: Query = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, query);
        assert_eq!(parsed.fingerprint(), query.fingerprint());
    }

    #[test]
    fn test_missing_stages_default_to_one() {
        let parsed: Query = serde_json::from_value(json!({
            "database": 1,
            "source": {"type": "native", "native": "SELECT 1"},
        }))
        .unwrap();
        assert_eq!(parsed.stage_count(), 1);
        assert!(parsed.is_native());
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let query1 = Query::table(1, 2);
        let query2 = query1.clone();
        assert_eq!(query1.fingerprint(), query2.fingerprint());
        assert_ne!(query1.fingerprint(), query1.append_stage().fingerprint());
    }
}
