//! MBQL Intermediate Representation (IR)
//!
//! Expression trees, multi-stage queries and the column metadata they are
//! resolved against. All types serialize to the canonical wire JSON and are
//! immutable: every transformation returns a new value.

pub mod classify;
mod column;
mod expr;
mod metadata;
mod query;
mod types;

pub use column::ColumnMetadata;
pub use expr::{CaseExpr, Call, Expression, FieldId, FieldRef, Literal, Options, WireError};
pub use metadata::{
    Database, Field, Metadata, MetadataProvider, Metric, Segment, Table, JOIN_SEPARATOR,
};
pub use query::{
    AggregationClause, BreakoutClause, Direction, FilterClause, OrderBy, Query, QueryError,
    QuerySource, Stage,
};
pub use types::*;

pub type DatabaseId = i64;
pub type TableId = i64;
