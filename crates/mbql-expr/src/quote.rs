//! Quoting and escaping of literals and identifiers in expression source

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum QuoteError {
    #[error("Unknown quoting: {0}")]
    UnknownQuoteKind(String),

    #[error("Unterminated quoted text: {0}")]
    Unterminated(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteKind {
    /// `"text"`
    Double,
    /// `'text'`
    Single,
    /// `[text]`
    Bracket,
    Unquoted,
}

impl QuoteKind {
    pub fn from_char(quote: char) -> Result<Self, QuoteError> {
        match quote {
            '"' => Ok(QuoteKind::Double),
            '\'' => Ok(QuoteKind::Single),
            '[' => Ok(QuoteKind::Bracket),
            other => Err(QuoteError::UnknownQuoteKind(other.to_string())),
        }
    }

    fn delimiters(&self) -> Option<(char, char)> {
        match self {
            QuoteKind::Double => Some(('"', '"')),
            QuoteKind::Single => Some(('\'', '\'')),
            QuoteKind::Bracket => Some(('[', ']')),
            QuoteKind::Unquoted => None,
        }
    }
}

const BACKSLASH: char = '\\';

/// Control characters and their two-character escapes
const STRING_ESCAPES: &[(char, char)] = &[
    ('\u{8}', 'b'),
    ('\t', 't'),
    ('\n', 'n'),
    ('\u{c}', 'f'),
    ('\r', 'r'),
];

fn escape_for(ch: char) -> Option<char> {
    STRING_ESCAPES
        .iter()
        .find(|(raw, _)| *raw == ch)
        .map(|(_, code)| *code)
}

fn unescape_for(code: char) -> Option<char> {
    STRING_ESCAPES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(raw, _)| *raw)
}

pub fn quote(raw: &str, kind: QuoteKind) -> String {
    match kind {
        QuoteKind::Double | QuoteKind::Single => {
            let quote_char = if kind == QuoteKind::Double { '"' } else { '\'' };
            let mut out = String::with_capacity(raw.len() + 2);
            out.push(quote_char);
            for ch in raw.chars() {
                if ch == quote_char {
                    out.push(BACKSLASH);
                    out.push(ch);
                } else if ch == BACKSLASH {
                    out.push(BACKSLASH);
                    out.push(BACKSLASH);
                } else if let Some(code) = escape_for(ch) {
                    out.push(BACKSLASH);
                    out.push(code);
                } else {
                    out.push(ch);
                }
            }
            out.push(quote_char);
            out
        }
        QuoteKind::Bracket => format!("[{}]", escape_raw(raw)),
        QuoteKind::Unquoted => raw.to_string(),
    }
}

/// Inverse of [`quote`]; the quote kind is read from the first character
///
/// Text that does not start with `"`, `'` or `[` is an
/// [`QuoteError::UnknownQuoteKind`], so unquoted text is not accepted here
/// even though quoting it is the identity.
pub fn unquote(text: &str) -> Result<String, QuoteError> {
    let first = text
        .chars()
        .next()
        .ok_or_else(|| QuoteError::UnknownQuoteKind(String::new()))?;
    let kind = QuoteKind::from_char(first)?;
    let (open, close) = kind
        .delimiters()
        .ok_or_else(|| QuoteError::UnknownQuoteKind(first.to_string()))?;

    let inner = text
        .strip_prefix(open)
        .and_then(|rest| rest.strip_suffix(close))
        .ok_or_else(|| QuoteError::Unterminated(text.to_string()))?;

    if kind == QuoteKind::Bracket {
        return Ok(unescape_raw(inner));
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == BACKSLASH {
            let unescaped = match chars.peek() {
                Some(&next) if next == BACKSLASH || next == open => Some(next),
                Some(&next) => unescape_for(next),
                None => None,
            };
            if let Some(unescaped) = unescaped {
                out.push(unescaped);
                chars.next();
                continue;
            }
        }
        out.push(ch);
    }
    Ok(out)
}

/// Backslash-escape `[` and `]` without adding brackets
pub fn escape_raw(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch == '[' || ch == ']' {
            out.push(BACKSLASH);
        }
        out.push(ch);
    }
    out
}

/// Inverse of [`escape_raw`]
pub fn unescape_raw(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == BACKSLASH && matches!(chars.peek(), Some('[') | Some(']')) {
            continue;
        }
        out.push(ch);
    }
    out
}
