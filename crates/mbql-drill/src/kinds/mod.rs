//! Registered drill kinds
//!
//! Kinds are consulted in registration order, which is also the order of
//! the descriptors returned by [`crate::available`].

mod distribution;
mod fk_filter;
mod quick_filter;
mod sort;
mod summarize_column;
mod summarize_column_by_time;
mod zoom;

use mbql_ir::{ColumnMetadata, Expression, FieldRef, Literal, MetadataProvider, Query};
use once_cell::sync::Lazy;
use serde_json::Value as JsonValue;

use crate::{ClickContext, DrillDescriptor, DrillError, DrillOffer, DrillType};

/// Everything a drill kind looks at
#[derive(Clone, Copy)]
pub struct DrillInput<'a> {
    pub provider: &'a dyn MetadataProvider,
    pub query: &'a Query,
    pub stage: usize,
    pub click: &'a ClickContext,
}

impl<'a> DrillInput<'a> {
    pub fn column(&self) -> &'a ColumnMetadata {
        &self.click.column
    }

    pub fn is_editable(&self) -> bool {
        self.provider.is_editable(self.query) && self.query.is_structured_stage(self.stage)
    }

    pub fn is_aggregated(&self) -> bool {
        self.query
            .stage(self.stage)
            .map(|stage| stage.is_aggregated())
            .unwrap_or(false)
    }
}

pub trait DrillKind: Send + Sync {
    fn drill_type(&self) -> DrillType;

    /// Offer for this click, `None` when the kind does not apply
    fn applies(&self, input: &DrillInput<'_>) -> Option<DrillOffer>;

    /// New query for a descriptor previously offered by this kind
    fn apply(&self, input: &DrillInput<'_>, descriptor: &DrillDescriptor) -> Result<Query, DrillError>;
}

static KINDS: Lazy<Vec<Box<dyn DrillKind>>> = Lazy::new(|| {
    vec![
        Box::new(distribution::Distribution),
        Box::new(fk_filter::FkFilter),
        Box::new(zoom::Zoom),
        Box::new(quick_filter::QuickFilter),
        Box::new(sort::Sort),
        Box::new(summarize_column::SummarizeColumn),
        Box::new(summarize_column_by_time::SummarizeColumnByTime),
    ]
});

/// Process-wide drill kinds in registration order
pub fn kinds() -> &'static [Box<dyn DrillKind>] {
    &KINDS
}

pub fn kind(drill_type: DrillType) -> Option<&'static dyn DrillKind> {
    kinds()
        .iter()
        .find(|kind| kind.drill_type() == drill_type)
        .map(Box::as_ref)
}

/// Literal for a clicked scalar; arrays and objects have none
pub(crate) fn value_expression(value: &JsonValue) -> Option<Expression> {
    match value {
        JsonValue::String(s) => Some(Expression::string(s.clone())),
        JsonValue::Number(n) => Some(Expression::Literal(Literal::Number(n.clone()))),
        JsonValue::Bool(b) => Some(Expression::boolean(*b)),
        _ => None,
    }
}

/// `["=", ref, value]` on the clicked column
pub(crate) fn equals_clicked(input: &DrillInput<'_>) -> Result<Expression, DrillError> {
    let value = input
        .click
        .cell_value()
        .and_then(value_expression)
        .ok_or_else(|| DrillError::InvalidDrillDescriptor("clicked value is not a scalar".into()))?;
    Ok(Expression::call(
        "=",
        vec![Expression::Dimension(input.column().field_ref.clone()), value],
    ))
}

/// `payload[key]` read back as a column ref
pub(crate) fn payload_ref(descriptor: &DrillDescriptor, key: &str) -> Result<FieldRef, DrillError> {
    let value = descriptor
        .payload()
        .get(key)
        .ok_or_else(|| DrillError::InvalidDrillDescriptor(format!("missing {}", key)))?;
    FieldRef::from_wire(value).map_err(|err| DrillError::InvalidDrillDescriptor(err.to_string()))
}

/// Selected choice, required for kinds that offer choices
pub(crate) fn selected(descriptor: &DrillDescriptor) -> Result<&str, DrillError> {
    descriptor
        .selected()
        .ok_or_else(|| DrillError::InvalidDrillDescriptor("no choice selected".into()))
}
