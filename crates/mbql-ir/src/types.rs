//! Type system for MBQL columns

use serde::{Deserialize, Serialize};

/// Storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    #[serde(rename = "type/Boolean")]
    Boolean,
    #[serde(rename = "type/Integer")]
    Integer,
    #[serde(rename = "type/BigInteger")]
    BigInteger,
    #[serde(rename = "type/Float")]
    Float,
    #[serde(rename = "type/Decimal")]
    Decimal,

    #[serde(rename = "type/Text")]
    Text,

    #[serde(rename = "type/Date")]
    Date,
    #[serde(rename = "type/DateTime")]
    DateTime,
    #[serde(rename = "type/DateTimeWithTZ")]
    DateTimeWithTz,
    #[serde(rename = "type/Time")]
    Time,

    // Structured
    #[serde(rename = "type/Structured")]
    Structured,
    #[serde(rename = "type/JSON")]
    Json,
    #[serde(rename = "type/Dictionary")]
    Dictionary,
    #[serde(rename = "type/Array")]
    Array,

    #[serde(rename = "type/*")]
    Unknown,
}

impl BaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseType::Boolean => "type/Boolean",
            BaseType::Integer => "type/Integer",
            BaseType::BigInteger => "type/BigInteger",
            BaseType::Float => "type/Float",
            BaseType::Decimal => "type/Decimal",
            BaseType::Text => "type/Text",
            BaseType::Date => "type/Date",
            BaseType::DateTime => "type/DateTime",
            BaseType::DateTimeWithTz => "type/DateTimeWithTZ",
            BaseType::Time => "type/Time",
            BaseType::Structured => "type/Structured",
            BaseType::Json => "type/JSON",
            BaseType::Dictionary => "type/Dictionary",
            BaseType::Array => "type/Array",
            BaseType::Unknown => "type/*",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            BaseType::Integer | BaseType::BigInteger | BaseType::Float | BaseType::Decimal
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, BaseType::Integer | BaseType::BigInteger)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, BaseType::Text)
    }

    pub fn is_temporal(&self) -> bool {
        self.is_date_or_datetime() || self.is_time()
    }

    pub fn is_date_or_datetime(&self) -> bool {
        matches!(self, BaseType::Date | BaseType::DateTime | BaseType::DateTimeWithTz)
    }

    pub fn is_time(&self) -> bool {
        matches!(self, BaseType::Time)
    }

    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            BaseType::Structured | BaseType::Json | BaseType::Dictionary | BaseType::Array
        )
    }
}

/// What a column means, independent of how it is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    #[serde(rename = "type/PK")]
    PrimaryKey,
    #[serde(rename = "type/FK")]
    ForeignKey,
    #[serde(rename = "type/Name")]
    Name,
    #[serde(rename = "type/Title")]
    Title,
    #[serde(rename = "type/Category")]
    Category,
    #[serde(rename = "type/Description")]
    Description,
    #[serde(rename = "type/Comment")]
    Comment,
    #[serde(rename = "type/Email")]
    Email,
    #[serde(rename = "type/URL")]
    Url,
    #[serde(rename = "type/Quantity")]
    Quantity,
    #[serde(rename = "type/Currency")]
    Currency,
    #[serde(rename = "type/Income")]
    Income,
    #[serde(rename = "type/Score")]
    Score,
    #[serde(rename = "type/Latitude")]
    Latitude,
    #[serde(rename = "type/Longitude")]
    Longitude,
    #[serde(rename = "type/City")]
    City,
    #[serde(rename = "type/State")]
    State,
    #[serde(rename = "type/Country")]
    Country,
    #[serde(rename = "type/ZipCode")]
    ZipCode,
    #[serde(rename = "type/CreationTimestamp")]
    CreationTimestamp,
    #[serde(rename = "type/UNIXTimestampSeconds")]
    UnixTimestampSeconds,
}

impl SemanticType {
    pub fn is_entity(&self) -> bool {
        matches!(self, SemanticType::PrimaryKey | SemanticType::ForeignKey)
    }

    pub fn is_location(&self) -> bool {
        matches!(
            self,
            SemanticType::Latitude
                | SemanticType::Longitude
                | SemanticType::City
                | SemanticType::State
                | SemanticType::Country
                | SemanticType::ZipCode
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            SemanticType::CreationTimestamp | SemanticType::UnixTimestampSeconds
        )
    }

    /// Long free-text columns that make poor grouping keys
    pub fn is_long_text(&self) -> bool {
        matches!(self, SemanticType::Description | SemanticType::Comment)
    }
}
