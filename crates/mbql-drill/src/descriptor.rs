use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use crate::ClickContext;

/// Fixed drill vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrillType {
    #[serde(rename = "drill-thru/distribution")]
    Distribution,
    #[serde(rename = "drill-thru/fk-filter")]
    FkFilter,
    #[serde(rename = "drill-thru/zoom")]
    Zoom,
    #[serde(rename = "drill-thru/quick-filter")]
    QuickFilter,
    #[serde(rename = "drill-thru/sort")]
    Sort,
    #[serde(rename = "drill-thru/summarize-column")]
    SummarizeColumn,
    #[serde(rename = "drill-thru/summarize-column-by-time")]
    SummarizeColumnByTime,
}

impl DrillType {
    pub const ALL: [DrillType; 7] = [
        DrillType::Distribution,
        DrillType::FkFilter,
        DrillType::Zoom,
        DrillType::QuickFilter,
        DrillType::Sort,
        DrillType::SummarizeColumn,
        DrillType::SummarizeColumnByTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DrillType::Distribution => "drill-thru/distribution",
            DrillType::FkFilter => "drill-thru/fk-filter",
            DrillType::Zoom => "drill-thru/zoom",
            DrillType::QuickFilter => "drill-thru/quick-filter",
            DrillType::Sort => "drill-thru/sort",
            DrillType::SummarizeColumn => "drill-thru/summarize-column",
            DrillType::SummarizeColumnByTime => "drill-thru/summarize-column-by-time",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|drill_type| drill_type.as_str() == name)
    }
}

impl fmt::Display for DrillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a drill kind offers for one click
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrillOffer {
    /// User choices, e.g. sort directions; empty when there is nothing to pick
    pub choices: Vec<String>,
    /// Kind-specific data the kind needs again in `apply`
    pub payload: JsonValue,
}

impl DrillOffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_choices<I, S>(self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn with_payload(self, payload: JsonValue) -> Self {
        Self { payload, ..self }
    }
}

/// Opaque token for one available drill
///
/// Bound to the query and click it was computed for; `apply` rejects it
/// once either changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillDescriptor {
    #[serde(rename = "type")]
    drill_type: DrillType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    choices: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected: Option<String>,
    #[serde(skip)]
    pub(crate) fingerprint: String,
    #[serde(skip)]
    pub(crate) stage: usize,
    #[serde(skip)]
    pub(crate) context: ClickContext,
    #[serde(skip)]
    pub(crate) payload: JsonValue,
}

impl DrillDescriptor {
    pub(crate) fn new(
        drill_type: DrillType,
        offer: DrillOffer,
        fingerprint: String,
        stage: usize,
        context: ClickContext,
    ) -> Self {
        Self {
            drill_type,
            selected: offer.choices.first().cloned(),
            choices: offer.choices,
            fingerprint,
            stage,
            context,
            payload: offer.payload,
        }
    }

    pub fn drill_type(&self) -> DrillType {
        self.drill_type
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Same drill with another choice selected; checked by `apply`
    pub fn select(&self, choice: impl Into<String>) -> Self {
        Self {
            selected: Some(choice.into()),
            ..self.clone()
        }
    }

    pub fn payload(&self) -> &JsonValue {
        &self.payload
    }

    pub fn context(&self) -> &ClickContext {
        &self.context
    }

    /// Same offer, ignoring which choice is selected
    pub(crate) fn same_offer(&self, other: &DrillDescriptor) -> bool {
        self.drill_type == other.drill_type
            && self.choices == other.choices
            && self.payload == other.payload
            && self.stage == other.stage
            && self.context == other.context
            && self.fingerprint == other.fingerprint
    }
}
