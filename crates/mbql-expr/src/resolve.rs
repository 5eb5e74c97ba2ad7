//! Name to reference resolution for metrics, segments and columns
//!
//! Absence is `None`: the caller decides whether an unresolved name is an
//! error.

use mbql_ir::{ColumnMetadata, Expression, MetadataProvider, Query};
use tracing::trace;

use crate::config::{EditorConfig, SeparatorConfig};
use crate::identifier::display_name_with_separator;

/// Extra inputs for [`resolve_dimension`]
#[derive(Debug, Clone, Copy)]
pub struct DimensionLookup<'a> {
    /// Long display name of the column being defined, never matched against itself
    pub reference: Option<&'a str>,
    pub separators: &'a SeparatorConfig,
}

impl Default for DimensionLookup<'static> {
    fn default() -> Self {
        Self {
            reference: None,
            separators: &EditorConfig::standard().separators,
        }
    }
}

pub fn resolve_metric(
    name: &str,
    provider: &dyn MetadataProvider,
    query: &Query,
    stage: usize,
) -> Option<Expression> {
    let name = name.to_lowercase();
    provider
        .available_metrics(query, stage)
        .into_iter()
        .find(|metric| metric.name.to_lowercase() == name)
        .map(|metric| Expression::Metric(metric.id))
}

/// Segment by name, falling back to a boolean column of the same name
pub fn resolve_segment(
    name: &str,
    provider: &dyn MetadataProvider,
    query: &Query,
    stage: usize,
) -> Option<Expression> {
    let lowered = name.to_lowercase();
    if let Some(segment) = provider
        .available_segments(query, stage)
        .into_iter()
        .find(|segment| segment.name.to_lowercase() == lowered)
    {
        return Some(Expression::Segment(segment.id));
    }

    provider
        .filterable_columns(query, stage)
        .into_iter()
        .find(|column| {
            column.is_boolean()
                && (column.name.to_lowercase() == lowered
                    || column.display_name.to_lowercase() == lowered)
        })
        .map(|column| Expression::Dimension(column.field_ref))
}

pub fn resolve_dimension(
    name: &str,
    lookup: DimensionLookup<'_>,
    provider: &dyn MetadataProvider,
    query: &Query,
    stage: usize,
) -> Option<ColumnMetadata> {
    let default_separator = lookup.separators.default.as_str();
    let wanted = name.to_lowercase();

    provider
        .expressionable_columns(query, stage)
        .into_iter()
        .filter(|column| {
            lookup.reference.map_or(true, |reference| {
                display_name_with_separator(&column.long_display_name, default_separator)
                    != reference
            })
        })
        .find(|column| {
            let matched = lookup.separators.symbols.iter().any(|separator| {
                display_name_with_separator(&column.display_name, separator).to_lowercase()
                    == wanted
            });
            trace!(column = %column.display_name, matched, "dimension candidate");
            matched
        })
}
