//! Editor quoting and join-path separator settings

use mbql_ir::JOIN_SEPARATOR;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::quote::QuoteKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
    pub literal_quote_default: QuoteKind,
    pub identifier_quote_default: QuoteKind,
    pub identifier_always_quoted: bool,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            literal_quote_default: QuoteKind::Double,
            identifier_quote_default: QuoteKind::Bracket,
            identifier_always_quoted: true,
        }
    }
}

/// Join-path separators accepted in identifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparatorConfig {
    pub symbols: Vec<String>,
    pub default: String,
}

impl Default for SeparatorConfig {
    fn default() -> Self {
        Self {
            symbols: vec![".".to_string(), JOIN_SEPARATOR.to_string()],
            default: JOIN_SEPARATOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub quotes: QuoteConfig,
    pub separators: SeparatorConfig,
}

static DEFAULT_EDITOR: Lazy<EditorConfig> = Lazy::new(EditorConfig::default);

impl EditorConfig {
    /// Shared default settings
    pub fn standard() -> &'static EditorConfig {
        &DEFAULT_EDITOR
    }
}
