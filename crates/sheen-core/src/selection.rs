use serde::{Deserialize, Serialize};

use crate::model::{Product, ProductSummary, RoutineProduct};

/// Products the user picked, in pick order, unique by id.
///
/// Entries are copies taken at selection time; later catalog edits do not reach them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
    products: Vec<Product>,
}

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.products.iter().any(|p| p.id == id)
    }

    /// Add the product if absent, remove it if present.
    pub fn toggle(&mut self, product: &Product) -> Toggle {
        if self.contains(product.id) {
            self.remove(product.id);
            Toggle::Removed
        } else {
            self.products.push(product.clone());
            Toggle::Added
        }
    }

    /// Remove by id; the remaining order is kept. Returns whether anything was removed.
    pub fn remove(&mut self, id: u32) -> bool {
        let before = self.products.len();
        self.products.retain(|p| p.id != id);
        self.products.len() != before
    }

    pub fn clear(&mut self) {
        self.products.clear();
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn summaries(&self) -> Vec<ProductSummary> {
        self.products.iter().map(Product::summary).collect()
    }

    pub fn routine_payload(&self) -> Vec<RoutineProduct> {
        self.products.iter().map(Product::routine_payload).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: u32, name: &str) -> Product {
        Product {
            id,
            name: name.to_string(),
            brand: "CeraVe".to_string(),
            category: "cleanser".to_string(),
            description: format!("{name} description"),
            image: String::new(),
        }
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut selection = Selection::new();
        let a = product(1, "Foaming Cleanser");
        assert_eq!(selection.toggle(&a), Toggle::Added);
        assert!(selection.contains(1));
        assert_eq!(selection.toggle(&a), Toggle::Removed);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_toggle_roundtrip_preserves_order_of_rest() {
        let mut selection = Selection::new();
        let (a, b, c) = (product(1, "A"), product(2, "B"), product(3, "C"));
        selection.toggle(&a);
        selection.toggle(&b);
        selection.toggle(&c);
        let original = selection.clone();

        let d = product(4, "D");
        selection.toggle(&d);
        selection.toggle(&d);
        assert_eq!(selection, original);

        selection.toggle(&b);
        let ids: Vec<u32> = selection.products().iter().map(|p| p.id).collect();
        assert_eq!(ids, [1, 3]);
    }

    #[test]
    fn test_selection_is_a_copy() {
        let mut selection = Selection::new();
        let mut a = product(1, "Original");
        selection.toggle(&a);
        a.name = "Renamed in catalog".to_string();
        assert_eq!(selection.products()[0].name, "Original");
    }

    #[test]
    fn test_projections() {
        let mut selection = Selection::new();
        selection.toggle(&product(1, "A"));
        selection.toggle(&product(2, "B"));
        let summaries = selection.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].name, "B");
        let payload = selection.routine_payload();
        assert_eq!(payload[0].description, "A description");
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut selection = Selection::new();
        selection.toggle(&product(1, "A"));
        assert!(!selection.remove(99));
        assert_eq!(selection.len(), 1);
    }
}
