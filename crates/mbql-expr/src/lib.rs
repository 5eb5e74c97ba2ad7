//! MBQL expression source text: quoting, identifiers, name resolution,
//! compiling and rendering

pub mod compile;
pub mod config;
pub mod format;
pub mod identifier;
pub mod quote;
pub mod resolve;

pub use compile::{compile, CompileContext, CompileError};
pub use config::{EditorConfig, QuoteConfig, SeparatorConfig};
pub use format::{format_expression, FormatError};
pub use identifier::{
    display_name_with_separator, format_dimension_name, format_identifier, format_metric_name,
    format_segment_name, format_string_literal, is_reserved_word,
};
pub use quote::{escape_raw, quote, unescape_raw, unquote, QuoteError, QuoteKind};
pub use resolve::{resolve_dimension, resolve_metric, resolve_segment, DimensionLookup};

/// Structural predicates over wire values
pub use mbql_ir::classify;
