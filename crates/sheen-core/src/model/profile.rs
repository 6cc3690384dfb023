use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProductSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkinType {
    Oily,
    Dry,
    Combination,
    Sensitive,
    Normal,
    Mature,
}

impl SkinType {
    /// Scan order for extraction. The first hit wins.
    pub const ALL: [SkinType; 6] = [
        Self::Oily,
        Self::Dry,
        Self::Combination,
        Self::Sensitive,
        Self::Normal,
        Self::Mature,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Oily => "oily",
            Self::Dry => "dry",
            Self::Combination => "combination",
            Self::Sensitive => "sensitive",
            Self::Normal => "normal",
            Self::Mature => "mature",
        }
    }
}

impl std::fmt::Display for SkinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

impl std::str::FromStr for SkinType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.keyword() == lower)
            .ok_or_else(|| format!("unknown skin type: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Concern {
    Acne,
    Wrinkles,
    #[serde(rename = "fine lines")]
    FineLines,
    #[serde(rename = "dark spots")]
    DarkSpots,
    Dullness,
    Pores,
    Aging,
    Hydration,
    Brightening,
    Firming,
}

impl Concern {
    /// Scan order for extraction.
    pub const ALL: [Concern; 10] = [
        Self::Acne,
        Self::Wrinkles,
        Self::FineLines,
        Self::DarkSpots,
        Self::Dullness,
        Self::Pores,
        Self::Aging,
        Self::Hydration,
        Self::Brightening,
        Self::Firming,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Acne => "acne",
            Self::Wrinkles => "wrinkles",
            Self::FineLines => "fine lines",
            Self::DarkSpots => "dark spots",
            Self::Dullness => "dullness",
            Self::Pores => "pores",
            Self::Aging => "aging",
            Self::Hydration => "hydration",
            Self::Brightening => "brightening",
            Self::Firming => "firming",
        }
    }
}

impl std::fmt::Display for Concern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

impl std::str::FromStr for Concern {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.keyword() == lower)
            .ok_or_else(|| format!("unknown concern: {s}"))
    }
}

/// Declared and inferred facts about the person chatting.
///
/// Every field defaults, so a snapshot written by an older build deserializes
/// with the newer fields filled in. Field names are camelCase on disk and on
/// the wire; snake_case spellings are still accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    pub name: Option<String>,
    #[serde(alias = "skin_type")]
    pub skin_type: Option<SkinType>,
    pub concerns: Vec<Concern>,
    #[serde(alias = "selected_products")]
    pub selected_products: Vec<ProductSummary>,
    #[serde(alias = "session_started")]
    pub session_started: Option<DateTime<Utc>>,
    #[serde(alias = "total_messages")]
    pub total_messages: u64,
    pub age: Option<u32>,
}

impl UserProfile {
    /// A profile counts as returning once it has chatted at least once under a name.
    pub fn is_returning(&self) -> bool {
        self.name.is_some() && self.total_messages > 0
    }
}
