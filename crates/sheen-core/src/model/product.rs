use serde::{Deserialize, Serialize};

/// A catalog entry. Read-only: the catalog document is never written by Sheen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub brand: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

impl Product {
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            name: self.name.clone(),
            brand: self.brand.clone(),
            category: self.category.clone(),
        }
    }

    pub fn routine_payload(&self) -> RoutineProduct {
        RoutineProduct {
            name: self.name.clone(),
            brand: self.brand.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
        }
    }
}

/// Lightweight projection kept on the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub name: String,
    pub brand: String,
    pub category: String,
}

/// Product as sent for routine generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineProduct {
    pub name: String,
    pub brand: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
}
