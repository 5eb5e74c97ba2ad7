//! Rendering of identifiers, metric/segment names and column names

use mbql_ir::{Metric, Segment, JOIN_SEPARATOR};
use mbql_registry::registry;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{EditorConfig, QuoteConfig};
use crate::quote::quote;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9A-Za-z_]+$").unwrap());

/// Bare name when it is a plain word that is not reserved, quoted otherwise
pub fn format_identifier(name: &str, quotes: &QuoteConfig) -> String {
    if !quotes.identifier_always_quoted && WORD.is_match(name) && !is_reserved_word(name) {
        return name.to_string();
    }
    quote(name, quotes.identifier_quote_default)
}

pub fn is_reserved_word(word: &str) -> bool {
    registry().is_reserved_word(word)
}

pub fn format_string_literal(value: &str, quotes: &QuoteConfig) -> String {
    quote(value, quotes.literal_quote_default)
}

pub fn format_metric_name(metric: &Metric, quotes: &QuoteConfig) -> String {
    format_identifier(&metric.name, quotes)
}

pub fn format_segment_name(segment: &Segment, quotes: &QuoteConfig) -> String {
    format_identifier(&segment.name, quotes)
}

/// Column display name with the configured join-path separator, quoted as needed
pub fn format_dimension_name(display_name: &str, config: &EditorConfig) -> String {
    format_identifier(
        &display_name_with_separator(display_name, &config.separators.default),
        &config.quotes,
    )
}

/// Replaces the first canonical join-path separator with `separator`
pub fn display_name_with_separator(display_name: &str, separator: &str) -> String {
    display_name.replacen(JOIN_SEPARATOR, separator, 1)
}
