use mbql_ir::ColumnMetadata;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// One cell of the clicked row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowValue {
    pub column: ColumnMetadata,
    pub value: JsonValue,
}

/// What the user clicked
///
/// `value` is `None` for a column header and `Some(null)` for an empty cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickContext {
    pub column: ColumnMetadata,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<Vec<RowValue>>,
}

/// Keeps an explicit `null` as `Some(Null)`; a missing key stays `None`
fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<JsonValue>, D::Error> {
    JsonValue::deserialize(deserializer).map(Some)
}

impl ClickContext {
    pub fn header(column: ColumnMetadata) -> Self {
        Self {
            column,
            value: None,
            row: None,
        }
    }

    pub fn cell(column: ColumnMetadata, value: JsonValue) -> Self {
        Self {
            column,
            value: Some(value),
            row: None,
        }
    }

    pub fn with_row(self, row: Vec<RowValue>) -> Self {
        Self {
            row: Some(row),
            ..self
        }
    }

    pub fn is_header(&self) -> bool {
        self.value.is_none()
    }

    pub fn is_cell(&self) -> bool {
        self.value.is_some()
    }

    /// Clicked value of a non-empty cell
    pub fn cell_value(&self) -> Option<&JsonValue> {
        self.value.as_ref().filter(|value| !value.is_null())
    }

    pub fn is_null_cell(&self) -> bool {
        matches!(self.value, Some(JsonValue::Null))
    }
}
