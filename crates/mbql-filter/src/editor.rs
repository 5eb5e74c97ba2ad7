use mbql_ir::{FilterClause, MetadataProvider, Query};
use serde::Serialize;

use crate::{FilterKind, FilterOperator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditorStatus {
    /// No column or operator yet
    Uninitialized,
    /// Values not entered yet
    Editing,
    Valid,
    Invalid,
}

/// Filter under construction
///
/// Every transition returns a new editor; `commit` yields a clause only
/// while the editor is [`EditorStatus::Valid`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterEditor<K: FilterKind> {
    target: Option<K::Target>,
    operator: Option<K::Operator>,
    values: Vec<Option<K::Value>>,
    touched: bool,
}

impl<K: FilterKind> Default for FilterEditor<K> {
    fn default() -> Self {
        Self {
            target: None,
            operator: None,
            values: Vec::new(),
            touched: false,
        }
    }
}

impl<K: FilterKind> FilterEditor<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// New filter on `target` with the kind's default operator
    pub fn for_target(target: K::Target) -> Self {
        let editor = Self {
            target: Some(target),
            ..Self::default()
        };
        editor.with_operator(K::default_operator())
    }

    /// Editor holding an existing clause, `None` when the clause is not of this kind
    pub fn from_clause(
        provider: &dyn MetadataProvider,
        query: &Query,
        stage: usize,
        clause: &FilterClause,
    ) -> Option<Self> {
        let parts = K::decompose(provider, query, stage, clause)?;
        Some(Self {
            target: Some(parts.target),
            operator: Some(parts.operator),
            values: parts.values.into_iter().map(Some).collect(),
            touched: true,
        })
    }

    pub fn target(&self) -> Option<&K::Target> {
        self.target.as_ref()
    }

    pub fn operator(&self) -> Option<K::Operator> {
        self.operator
    }

    pub fn values(&self) -> &[Option<K::Value>] {
        &self.values
    }

    pub fn with_target(&self, target: K::Target) -> Self {
        Self {
            target: Some(target),
            ..self.clone()
        }
    }

    /// Switch operator, keeping previous values slot by slot
    ///
    /// Multi-valued operators keep every value entered so far. Fixed-arity
    /// operators keep the first `value_count` slots and fill the rest with
    /// the kind's default value.
    pub fn with_operator(&self, operator: K::Operator) -> Self {
        let values = if operator.has_multiple_values() {
            self.values.iter().filter(|value| value.is_some()).cloned().collect()
        } else {
            (0..operator.value_count())
                .map(|index| {
                    self.values
                        .get(index)
                        .cloned()
                        .flatten()
                        .or_else(K::default_value)
                })
                .collect()
        };
        Self {
            target: self.target.clone(),
            operator: Some(operator),
            values,
            touched: self.touched,
        }
    }

    pub fn with_values(&self, values: Vec<Option<K::Value>>) -> Self {
        Self {
            values,
            touched: true,
            ..self.clone()
        }
    }

    /// Set one slot, growing the value list when needed
    pub fn with_value(&self, index: usize, value: Option<K::Value>) -> Self {
        let mut values = self.values.clone();
        if values.len() <= index {
            values.resize(index + 1, None);
        }
        values[index] = value;
        self.with_values(values)
    }

    pub fn status(&self) -> EditorStatus {
        let (Some(target), Some(operator)) = (&self.target, self.operator) else {
            return EditorStatus::Uninitialized;
        };
        if K::supports(target)
            && K::supports_operator(target, operator)
            && K::is_valid(operator, &self.values)
        {
            EditorStatus::Valid
        } else if !self.touched {
            EditorStatus::Editing
        } else {
            EditorStatus::Invalid
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status() == EditorStatus::Valid
    }

    pub fn commit(&self) -> Option<FilterClause> {
        if !self.is_valid() {
            return None;
        }
        let (target, operator) = (self.target.as_ref()?, self.operator?);
        K::build_from_slots(operator, target, &self.values).ok()
    }
}
