//! Read-only product catalog.
//!
//! The catalog ships bundled with the binary (`catalog/products.json`) and can
//! be replaced at startup with a file of the same shape (a JSON array of
//! products). It is loaded once and then shared immutably.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use gtm_shop_core::{Product, ProductError, ProductId};
use thiserror::Error;

const BUNDLED_CATALOG: &str = include_str!("../catalog/products.json");

/// Errors that can occur while loading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid product: {0}")]
    Product(#[from] ProductError),
    #[error("Duplicate product id: {0}")]
    DuplicateId(ProductId),
}

/// Immutable product catalog.
///
/// Cheap to clone.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Arc<Vec<Product>>,
}

impl Catalog {
    /// Load the catalog bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the bundled data is invalid.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    /// Load a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the file can't be read or holds invalid data.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&raw)?;
        tracing::info!(path = %path.display(), products = catalog.len(), "Loaded catalog");
        Ok(catalog)
    }

    /// Load from `path` if given, otherwise use the bundled catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the selected source is invalid.
    pub fn load_or_bundled(path: Option<&Path>) -> Result<Self, CatalogError> {
        path.map_or_else(Self::bundled, Self::load)
    }

    /// Parse and validate a catalog from a JSON array.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the JSON is malformed, a product fails
    /// validation, or an id appears twice.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let products: Vec<Product> = serde_json::from_str(raw)?;
        Self::from_products(products)
    }

    /// Build a catalog from products, validating each.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if a product fails validation or an id repeats.
    pub fn from_products(products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(products.len());
        for product in &products {
            product.validate()?;
            if !seen.insert(&product.id) {
                return Err(CatalogError::DuplicateId(product.id.clone()));
            }
        }

        Ok(Self {
            products: Arc::new(products),
        })
    }

    /// Look up a product by id.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// All products in catalog order.
    #[must_use]
    pub fn all(&self) -> &[Product] {
        &self.products
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog has no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Distinct categories in first-seen order.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.products
            .iter()
            .map(|p| p.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Products in `category` (case-insensitive).
    #[must_use]
    pub fn in_category(&self, category: &str) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| p.category.eq_ignore_ascii_case(category))
            .collect()
    }

    /// Products whose name, description, or category contains `term`
    /// (case-insensitive). A blank term matches everything.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<&Product> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self.products.iter().collect();
        }

        self.products
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&term)
                    || p.description.to_lowercase().contains(&term)
                    || p.category.to_lowercase().contains(&term)
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_is_valid() {
        let catalog = Catalog::bundled().unwrap();
        assert!(!catalog.is_empty());
        assert!(catalog.get(&ProductId::new("1")).is_some());
    }

    #[test]
    fn test_categories_first_seen_order() {
        let catalog = Catalog::bundled().unwrap();
        assert_eq!(
            catalog.categories(),
            ["Apparel", "Accessories", "Collectibles", "Gift Cards"]
        );
    }

    #[test]
    fn test_in_category_ignores_case() {
        let catalog = Catalog::bundled().unwrap();
        let apparel = catalog.in_category("apparel");
        assert_eq!(apparel.len(), 2);
        assert!(apparel.iter().all(|p| p.category == "Apparel"));
    }

    #[test]
    fn test_search_matches_name_and_description() {
        let catalog = Catalog::bundled().unwrap();
        let ids: Vec<_> = catalog
            .search("HOODIE")
            .into_iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, ["2"]);

        assert!(!catalog.search("enamel").is_empty());
        assert!(catalog.search("nothing matches this").is_empty());
        assert_eq!(catalog.search("  ").len(), catalog.len());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let raw = r#"[
            {"id":"a","name":"A","description":"","price":1.0,"category":"c","image":"i"},
            {"id":"a","name":"B","description":"","price":2.0,"category":"c","image":"i"}
        ]"#;
        assert!(matches!(
            Catalog::from_json(raw),
            Err(CatalogError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_product() {
        let raw = r#"[{"id":"a","name":"A","description":"","price":-1.0,"category":"c","image":"i"}]"#;
        assert!(matches!(
            Catalog::from_json(raw),
            Err(CatalogError::Product(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[{"id":"x","name":"X","description":"","price":3.5,"category":"c","image":"i"}]"#,
        )
        .unwrap();

        let catalog = Catalog::load_or_bundled(Some(&path)).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(matches!(
            Catalog::load(&dir.path().join("missing.json")),
            Err(CatalogError::Io { .. })
        ));
    }
}
