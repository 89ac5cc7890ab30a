//! # Domain Types
//!
//! Core domain types used throughout Stockroom.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Order       │   │   OrderLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (numeric)   │   │  id (numeric)   │   │  order_id (FK)  │       │
//! │  │  code (business)│   │  created_at     │   │  product_code   │       │
//! │  │  sale_price     │   └─────────────────┘   │  quantity       │       │
//! │  │  cost_price     │                         └─────────────────┘       │
//! │  │  stock / min    │   ┌─────────────────┐                             │
//! │  │  barcode        │   │  ProductDraft   │  seeded by a scan miss      │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every product has:
//! - `id`: opaque numeric id assigned by the hosted data store
//! - `code`: unique business key, what staff type and what orders reference
//!
//! Rows come straight from the hosted store, so every numeric field tolerates
//! being absent (`#[serde(default)]`). Aggregations treat missing values as 0.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::{self, ValidationResult};

// =============================================================================
// Product
// =============================================================================

/// A product row of the inventory relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct Product {
    /// Opaque numeric identifier.
    pub id: i64,

    /// Product code - unique business key.
    pub code: String,

    /// Display description.
    pub description: String,

    /// Free-form category used for filtering.
    pub category: Option<String>,

    /// Sale price in local currency.
    pub sale_price: f64,

    /// Cost price in the supplier's (foreign) currency.
    pub cost_price: Option<f64>,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Reorder threshold.
    pub min_stock: Option<i64>,

    /// Barcode, expected to be EAN-13 but not enforced on write.
    pub barcode: Option<String>,

    /// Inactive products are hidden from the dashboard. Scans still find them.
    pub is_active: bool,
}

impl Default for Product {
    fn default() -> Self {
        Product {
            id: 0,
            code: String::new(),
            description: String::new(),
            category: None,
            sale_price: 0.0,
            cost_price: None,
            stock: 0,
            min_stock: None,
            barcode: None,
            is_active: true,
        }
    }
}

impl Product {
    /// Minimum stock, with a missing threshold counting as 0.
    #[inline]
    pub fn min_stock_or_zero(&self) -> i64 {
        self.min_stock.unwrap_or(0)
    }

    /// Cost price, with a missing cost counting as 0.
    #[inline]
    pub fn cost_or_zero(&self) -> f64 {
        self.cost_price.unwrap_or(0.0)
    }

    /// Difference between stock on hand and the minimum threshold.
    ///
    /// Zero or negative means the product is at or below its minimum.
    #[inline]
    pub fn stock_gap(&self) -> i64 {
        self.stock.saturating_sub(self.min_stock_or_zero())
    }

    /// Checks if stock has fallen below the configured minimum.
    pub fn is_below_minimum(&self) -> bool {
        self.min_stock.map_or(false, |min| self.stock < min)
    }

    /// Applies a stock movement and returns the resulting stock.
    ///
    /// ## Clamping
    /// ```text
    /// stock: 3, delta: -5  →  stock: 0   (never negative)
    /// stock: 3, delta: +2  →  stock: 5
    /// ```
    pub fn apply_stock_delta(&mut self, delta: i64) -> i64 {
        self.stock = self.stock.saturating_add(delta).max(0);
        self.stock
    }

    /// Checks if the stored barcode passes the EAN-13 checksum.
    pub fn has_valid_barcode(&self) -> bool {
        self.barcode
            .as_deref()
            .map_or(false, validation::is_valid_ean13)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// An order header. Lines reference it through [`OrderLine::order_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub order_id: i64,
    pub product_code: String,
    /// Units ordered. Missing counts as 0.
    #[serde(default)]
    pub quantity: i64,
}

// =============================================================================
// Product Draft
// =============================================================================

/// A product that does not exist yet.
///
/// ## User Workflow
/// ```text
/// Scan 7790001234568
///      │
///      ▼
/// Lookup miss ──► ProductDraft::from_scan("7790001234568")
///      │              code = barcode = "7790001234568"
///      ▼
/// Staff fills description / price ──► validate() ──► insert into store
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductDraft {
    pub code: String,
    pub description: String,
    pub category: Option<String>,
    pub sale_price: f64,
    pub cost_price: Option<f64>,
    pub stock: i64,
    pub min_stock: Option<i64>,
    pub barcode: Option<String>,
    pub is_active: bool,
}

impl ProductDraft {
    /// Seeds a draft from a scanned code that matched no product.
    pub fn from_scan(barcode: &str) -> Self {
        ProductDraft {
            code: barcode.to_string(),
            description: String::new(),
            category: None,
            sale_price: 0.0,
            cost_price: None,
            stock: 0,
            min_stock: None,
            barcode: Some(barcode.to_string()),
            is_active: true,
        }
    }

    /// Validates the draft before it is inserted.
    ///
    /// The barcode is not required to be a valid EAN-13: manual entries may
    /// carry other symbologies.
    pub fn validate(&self) -> ValidationResult<()> {
        validation::validate_product_code(&self.code)?;
        validation::validate_description(&self.description)?;
        validation::validate_price("sale_price", self.sale_price)?;
        if let Some(cost) = self.cost_price {
            validation::validate_price("cost_price", cost)?;
        }
        if self.stock < 0 {
            return Err(ValidationError::OutOfRange {
                field: "stock".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        Ok(())
    }

    /// Converts the draft into a product once the store assigned an id.
    pub fn into_product(self, id: i64) -> Product {
        Product {
            id,
            code: self.code,
            description: self.description,
            category: self.category,
            sale_price: self.sale_price,
            cost_price: self.cost_price,
            stock: self.stock,
            min_stock: self.min_stock,
            barcode: self.barcode,
            is_active: self.is_active,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, min: Option<i64>) -> Product {
        Product {
            code: "MATE-01".to_string(),
            stock,
            min_stock: min,
            ..Default::default()
        }
    }

    #[test]
    fn test_stock_delta_clamps_at_zero() {
        let mut p = product(3, None);
        assert_eq!(p.apply_stock_delta(-5), 0);
        assert_eq!(p.apply_stock_delta(2), 2);
        assert_eq!(p.apply_stock_delta(i64::MIN), 0);
    }

    #[test]
    fn test_stock_gap_missing_minimum() {
        assert_eq!(product(4, None).stock_gap(), 4);
        assert_eq!(product(4, Some(6)).stock_gap(), -2);
        assert_eq!(product(5, Some(i64::MIN)).stock_gap(), i64::MAX);
        assert_eq!(product(i64::MIN, Some(1)).stock_gap(), i64::MIN);
    }

    #[test]
    fn test_is_below_minimum() {
        assert!(product(1, Some(2)).is_below_minimum());
        assert!(!product(2, Some(2)).is_below_minimum());
        assert!(!product(0, None).is_below_minimum());
    }

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let p: Product =
            serde_json::from_str(r#"{"id": 7, "code": "A1", "description": "Azucar"}"#).unwrap();
        assert_eq!(p.stock, 0);
        assert_eq!(p.sale_price, 0.0);
        assert!(p.cost_price.is_none());
        assert!(p.is_active);
    }

    #[test]
    fn test_draft_from_scan() {
        let draft = ProductDraft::from_scan("4006381333931");
        assert_eq!(draft.code, "4006381333931");
        assert_eq!(draft.barcode.as_deref(), Some("4006381333931"));
        // Description is still empty
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_draft_accepts_non_ean_barcode() {
        let mut draft = ProductDraft::from_scan("CODE128-XYZ");
        draft.code = "XYZ".to_string();
        draft.description = "Bombilla".to_string();
        draft.sale_price = 1500.0;
        assert!(draft.validate().is_ok());

        let product = draft.into_product(42);
        assert_eq!(product.id, 42);
        assert!(!product.has_valid_barcode());
    }
}
