use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SheenError};
use crate::model::Product;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    products: Vec<Product>,
}

/// The read-only product list.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

/// Active browse filters. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Read a `{ "products": [...] }` document.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SheenError::NotFound(format!("catalog {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        Ok(Self::new(file.products))
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn find(&self, id: u32) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Distinct categories in catalog order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for product in &self.products {
            if !seen.contains(&product.category.as_str()) {
                seen.push(&product.category);
            }
        }
        seen
    }

    /// Exact category match first, then a case-insensitive search over
    /// name, brand, description and category.
    pub fn filter(&self, filter: &ProductFilter) -> Vec<&Product> {
        let category = filter.category.as_deref().filter(|c| !c.is_empty());
        let term = filter
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        self.products
            .iter()
            .filter(|p| category.map_or(true, |c| p.category == c))
            .filter(|p| match term {
                Some(ref term) => {
                    p.name.to_lowercase().contains(term)
                        || p.brand.to_lowercase().contains(term)
                        || p.description.to_lowercase().contains(term)
                        || p.category.to_lowercase().contains(term)
                }
                None => true,
            })
            .collect()
    }
}

/// Summary line shown while a filter hides part of the catalog.
pub fn results_info(shown: usize, total: usize) -> Option<String> {
    if shown == total {
        None
    } else {
        Some(format!("Showing {shown} of {total} products"))
    }
}
