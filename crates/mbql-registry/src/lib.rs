//! Clause vocabulary shared by the classifier, the identifier formatter and
//! the expression compiler.
//!
//! Every operator and function the query engine accepts is registered once
//! here, with both its MBQL name (the head of the wire form, e.g. `"sum"`)
//! and the name users type in the expression editor (e.g. `"Sum"`).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Clause not found: {0}")]
    ClauseNotFound(String),

    #[error("Arity mismatch for {clause}: expected {expected}, got {actual}")]
    ArityMismatch {
        clause: String,
        expected: String,
        actual: usize,
    },
}

/// Where a clause may appear in expression source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClauseKind {
    /// Infix or prefix operator (`+`, `=`, `and`, `not`, ...)
    Operator,
    /// Row-level function (`concat`, `coalesce`, `between`, ...)
    Function,
    /// Aggregation function (`count`, `sum`, `avg`, ...)
    Aggregation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReturnType {
    Number,
    String,
    Boolean,
    DateTime,
    /// Same type as the arguments (`coalesce`, `case`, `min`, ...)
    Any,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClauseSignature {
    /// Head of the wire form
    pub name: String,
    /// Name used in expression source text
    pub display_name: String,
    pub kind: ClauseKind,
    pub min_args: usize,
    /// `None` for variadic clauses
    pub max_args: Option<usize>,
    pub return_type: ReturnType,
}

impl ClauseSignature {
    pub fn accepts_arity(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }
}

pub struct ClauseRegistry {
    clauses: HashMap<String, ClauseSignature>,
    // lower-cased display name -> MBQL name
    display_names: HashMap<String, String>,
    version: String,
}

static GLOBAL: Lazy<ClauseRegistry> = Lazy::new(ClauseRegistry::default);

/// Process-wide vocabulary, built on first use and read-only afterwards.
pub fn registry() -> &'static ClauseRegistry {
    &GLOBAL
}

use ClauseKind::{Aggregation as A, Function as F, Operator as O};
use ReturnType::{Any, Boolean, DateTime, Number, String as Str};

// (mbql name, display name, kind, min args, max args, return type)
const BUILTINS: &[(&str, &str, ClauseKind, usize, Option<usize>, ReturnType)] = &[
    // Arithmetic
    ("+", "+", O, 2, None, Any),
    ("-", "-", O, 1, None, Any),
    ("*", "*", O, 2, None, Number),
    ("/", "/", O, 2, None, Number),
    // Comparison
    ("=", "=", O, 2, None, Boolean),
    ("!=", "!=", O, 2, None, Boolean),
    ("<", "<", O, 2, Some(2), Boolean),
    (">", ">", O, 2, Some(2), Boolean),
    ("<=", "<=", O, 2, Some(2), Boolean),
    (">=", ">=", O, 2, Some(2), Boolean),
    // Logical
    ("and", "AND", O, 2, None, Boolean),
    ("or", "OR", O, 2, None, Boolean),
    ("not", "NOT", O, 1, Some(1), Boolean),
    // Aggregations
    ("count", "Count", A, 0, Some(1), Number),
    ("cum-count", "CumulativeCount", A, 0, Some(1), Number),
    ("sum", "Sum", A, 1, Some(1), Number),
    ("cum-sum", "CumulativeSum", A, 1, Some(1), Number),
    ("distinct", "Distinct", A, 1, Some(1), Number),
    ("stddev", "StandardDeviation", A, 1, Some(1), Number),
    ("avg", "Average", A, 1, Some(1), Number),
    ("median", "Median", A, 1, Some(1), Number),
    ("percentile", "Percentile", A, 2, Some(2), Number),
    ("min", "Min", A, 1, Some(1), Any),
    ("max", "Max", A, 1, Some(1), Any),
    ("share", "Share", A, 1, Some(1), Number),
    ("count-where", "CountIf", A, 1, Some(1), Number),
    ("sum-where", "SumIf", A, 2, Some(2), Number),
    ("var", "Variance", A, 1, Some(1), Number),
    // String functions
    ("lower", "lower", F, 1, Some(1), Str),
    ("upper", "upper", F, 1, Some(1), Str),
    ("substring", "substring", F, 3, Some(3), Str),
    ("regex-match-first", "regexextract", F, 2, Some(2), Str),
    ("concat", "concat", F, 1, None, Str),
    ("replace", "replace", F, 3, Some(3), Str),
    ("trim", "trim", F, 1, Some(1), Str),
    ("rtrim", "rtrim", F, 1, Some(1), Str),
    ("ltrim", "ltrim", F, 1, Some(1), Str),
    ("length", "length", F, 1, Some(1), Number),
    // Numeric functions
    ("abs", "abs", F, 1, Some(1), Number),
    ("floor", "floor", F, 1, Some(1), Number),
    ("ceil", "ceil", F, 1, Some(1), Number),
    ("round", "round", F, 1, Some(1), Number),
    ("sqrt", "sqrt", F, 1, Some(1), Number),
    ("power", "power", F, 2, Some(2), Number),
    ("log", "log", F, 1, Some(1), Number),
    ("exp", "exp", F, 1, Some(1), Number),
    // Conditionals
    ("coalesce", "coalesce", F, 2, None, Any),
    ("case", "case", F, 2, None, Any),
    // Filter functions
    ("between", "between", F, 3, Some(3), Boolean),
    ("interval", "interval", F, 3, Some(3), Boolean),
    ("time-interval", "timeInterval", F, 3, Some(3), Boolean),
    ("inside", "inside", F, 6, Some(6), Boolean),
    ("contains", "contains", F, 2, Some(2), Boolean),
    ("does-not-contain", "doesNotContain", F, 2, Some(2), Boolean),
    ("starts-with", "startsWith", F, 2, Some(2), Boolean),
    ("ends-with", "endsWith", F, 2, Some(2), Boolean),
    ("is-null", "isnull", F, 1, Some(1), Boolean),
    ("not-null", "notnull", F, 1, Some(1), Boolean),
    ("is-empty", "isempty", F, 1, Some(1), Boolean),
    ("not-empty", "notempty", F, 1, Some(1), Boolean),
    // Date functions
    ("datetime-add", "datetimeAdd", F, 3, Some(3), DateTime),
    ("datetime-subtract", "datetimeSubtract", F, 3, Some(3), DateTime),
    ("datetime-diff", "datetimeDiff", F, 3, Some(3), Number),
    ("get-year", "year", F, 1, Some(1), Number),
    ("get-quarter", "quarter", F, 1, Some(1), Number),
    ("get-month", "month", F, 1, Some(1), Number),
    ("get-week", "week", F, 1, Some(2), Number),
    ("get-day", "day", F, 1, Some(1), Number),
    ("get-day-of-week", "weekday", F, 1, Some(1), Number),
    ("get-hour", "hour", F, 1, Some(1), Number),
    ("get-minute", "minute", F, 1, Some(1), Number),
    ("get-second", "second", F, 1, Some(1), Number),
    ("convert-timezone", "convertTimezone", F, 2, Some(3), DateTime),
    ("now", "now", F, 0, Some(0), DateTime),
];

impl ClauseRegistry {
    pub fn new(version: impl Into<String>) -> Self {
        let mut registry = Self {
            clauses: HashMap::new(),
            display_names: HashMap::new(),
            version: version.into(),
        };
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        for &(name, display_name, kind, min_args, max_args, return_type) in BUILTINS {
            self.register(ClauseSignature {
                name: name.to_string(),
                display_name: display_name.to_string(),
                kind,
                min_args,
                max_args,
                return_type,
            });
        }
    }

    pub fn register(&mut self, sig: ClauseSignature) {
        self.display_names
            .insert(sig.display_name.to_lowercase(), sig.name.clone());
        self.clauses.insert(sig.name.clone(), sig);
    }

    pub fn get(&self, name: &str) -> Option<&ClauseSignature> {
        self.clauses.get(name)
    }

    pub fn lookup(&self, name: &str, arg_count: usize) -> Result<&ClauseSignature, RegistryError> {
        let sig = self
            .clauses
            .get(name)
            .ok_or_else(|| RegistryError::ClauseNotFound(name.to_string()))?;

        if !sig.accepts_arity(arg_count) {
            let expected = match sig.max_args {
                Some(max) if max == sig.min_args => max.to_string(),
                Some(max) => format!("{}..={}", sig.min_args, max),
                None => format!("{}+", sig.min_args),
            };
            return Err(RegistryError::ArityMismatch {
                clause: name.to_string(),
                expected,
                actual: arg_count,
            });
        }
        Ok(sig)
    }

    /// MBQL name for a name typed in the editor. Case-insensitive, ignores
    /// surrounding whitespace.
    pub fn mbql_name(&self, display_name: &str) -> Option<&str> {
        self.display_names
            .get(&display_name.trim().to_lowercase())
            .map(String::as_str)
    }

    pub fn is_operator(&self, name: &str) -> bool {
        matches!(self.clauses.get(name), Some(sig) if sig.kind == ClauseKind::Operator)
    }

    /// Row-level and aggregation functions
    pub fn is_function(&self, name: &str) -> bool {
        matches!(
            self.clauses.get(name),
            Some(sig) if matches!(sig.kind, ClauseKind::Function | ClauseKind::Aggregation)
        )
    }

    pub fn is_aggregation(&self, name: &str) -> bool {
        matches!(self.clauses.get(name), Some(sig) if sig.kind == ClauseKind::Aggregation)
    }

    /// Exact, case-sensitive match against every registered MBQL name and
    /// editor display name.
    pub fn is_reserved_word(&self, word: &str) -> bool {
        self.clauses.contains_key(word)
            || self
                .display_names
                .get(&word.to_lowercase())
                .and_then(|name| self.clauses.get(name))
                .is_some_and(|sig| sig.display_name == word)
    }

    pub fn clauses(&self) -> impl Iterator<Item = &ClauseSignature> {
        self.clauses.values()
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Default for ClauseRegistry {
    fn default() -> Self {
        Self::new("0.1.0")
    }
}
