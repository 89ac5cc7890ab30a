//! # In-Memory Catalog
//!
//! A [`ProductLookup`] held entirely in memory. Used when embedding the
//! scanner without a data store, and by the tests.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use stockroom_core::validation::validate_movement_quantity;
use stockroom_core::{CoreError, Product, ProductDraft, ValidationError};

use crate::error::ScanResult;
use crate::resolver::ProductLookup;

#[derive(Debug)]
pub struct InMemoryCatalog {
    products: RwLock<Vec<Product>>,
    next_id: AtomicI64,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        let next_id = products.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        InMemoryCatalog {
            products: RwLock::new(products),
            next_id: AtomicI64::new(next_id),
        }
    }

    /// Snapshot of every product.
    pub async fn all(&self) -> Vec<Product> {
        self.products.read().await.clone()
    }

    /// Validates and stores a new product. Product codes are unique.
    pub async fn insert(&self, draft: ProductDraft) -> ScanResult<Product> {
        draft.validate()?;

        let mut products = self.products.write().await;
        if products.iter().any(|p| p.code == draft.code) {
            return Err(ValidationError::Duplicate {
                field: "code".to_string(),
                value: draft.code,
            }
            .into());
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let product = draft.into_product(id);
        info!(id, code = %product.code, "Product created");
        products.push(product.clone());
        Ok(product)
    }

    /// Applies a stock movement. Stock is clamped at zero.
    ///
    /// Returns the new stock level.
    pub async fn update_stock(&self, code: &str, delta: i64) -> ScanResult<i64> {
        validate_movement_quantity(delta)?;

        let mut products = self.products.write().await;
        let product = products
            .iter_mut()
            .find(|p| p.code == code)
            .ok_or_else(|| CoreError::ProductNotFound(code.to_string()))?;

        let stock = product.apply_stock_delta(delta);
        debug!(code, delta, stock, "Stock updated");
        Ok(stock)
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        InMemoryCatalog::new(Vec::new())
    }
}

#[async_trait]
impl ProductLookup for InMemoryCatalog {
    async fn find_by_barcode(&self, barcode: &str) -> ScanResult<Option<Product>> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .find(|p| p.barcode.as_deref() == Some(barcode))
            .cloned())
    }

    async fn find_by_code(&self, code: &str) -> ScanResult<Option<Product>> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .find(|p| p.code == code)
            .cloned())
    }
}
