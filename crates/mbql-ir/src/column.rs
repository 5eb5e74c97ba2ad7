//! Column metadata as seen from one query stage

use serde::{Deserialize, Serialize};

use crate::expr::FieldRef;
use crate::types::{BaseType, SemanticType};
use crate::TableId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub display_name: String,
    /// Display name prefixed with the join path, e.g. `Product → Category`
    pub long_display_name: String,
    pub base_type: BaseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_type: Option<BaseType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<SemanticType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<TableId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fk_target_field_id: Option<i64>,
    /// FK field through which the column is implicitly joined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fk_field_id: Option<i64>,
    pub field_ref: FieldRef,
}

impl ColumnMetadata {
    pub fn effective_type(&self) -> BaseType {
        self.effective_type.unwrap_or(self.base_type)
    }

    pub fn is_primary_key(&self) -> bool {
        self.semantic_type == Some(SemanticType::PrimaryKey)
    }

    pub fn is_foreign_key(&self) -> bool {
        self.semantic_type == Some(SemanticType::ForeignKey)
    }

    pub fn is_implicitly_joined(&self) -> bool {
        self.fk_field_id.is_some()
    }

    pub fn is_numeric(&self) -> bool {
        self.effective_type().is_numeric()
    }

    pub fn is_string(&self) -> bool {
        self.effective_type().is_text()
    }

    pub fn is_boolean(&self) -> bool {
        self.effective_type() == BaseType::Boolean
    }

    pub fn is_temporal(&self) -> bool {
        self.effective_type().is_temporal()
    }

    pub fn is_date_or_datetime(&self) -> bool {
        self.effective_type().is_date_or_datetime()
    }

    pub fn is_time(&self) -> bool {
        self.effective_type().is_time()
    }

    pub fn is_structured(&self) -> bool {
        self.effective_type().is_structured() || self.base_type.is_structured()
    }

    pub fn is_latitude(&self) -> bool {
        self.semantic_type == Some(SemanticType::Latitude)
    }

    pub fn is_longitude(&self) -> bool {
        self.semantic_type == Some(SemanticType::Longitude)
    }

    pub fn is_coordinate(&self) -> bool {
        self.is_latitude() || self.is_longitude()
    }

    /// Numbers that mean an amount: not keys, locations or encoded timestamps
    pub fn is_summable(&self) -> bool {
        self.is_numeric()
            && !self.semantic_type.is_some_and(|semantic| {
                semantic.is_entity() || semantic.is_location() || semantic.is_temporal()
            })
    }

    pub fn is_long_text(&self) -> bool {
        self.semantic_type.is_some_and(|semantic| semantic.is_long_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(base_type: BaseType, semantic_type: Option<SemanticType>) -> ColumnMetadata {
        ColumnMetadata {
            name: "C".to_string(),
            display_name: "C".to_string(),
            long_display_name: "C".to_string(),
            base_type,
            effective_type: None,
            semantic_type,
            id: Some(1),
            table_id: Some(1),
            fk_target_field_id: None,
            fk_field_id: None,
            field_ref: FieldRef::field(1),
        }
    }

    #[test]
    fn test_summable() {
        assert!(column(BaseType::Float, None).is_summable());
        assert!(column(BaseType::Integer, Some(SemanticType::Quantity)).is_summable());
        assert!(!column(BaseType::Integer, Some(SemanticType::PrimaryKey)).is_summable());
        assert!(!column(BaseType::Float, Some(SemanticType::Latitude)).is_summable());
        assert!(!column(BaseType::DateTime, None).is_summable());
    }

    #[test]
    fn test_effective_type_wins() {
        let mut col = column(BaseType::Text, None);
        col.effective_type = Some(BaseType::DateTime);
        assert!(col.is_date_or_datetime());
        assert!(!col.is_string());
    }

    #[test]
    fn test_structured() {
        assert!(column(BaseType::Json, None).is_structured());
        assert!(!column(BaseType::Text, None).is_structured());
    }
}
