//! # stockroom-core: Pure Business Logic for Stockroom
//!
//! This crate contains the inventory logic that does not need a camera, a
//! network or a database: product types, EAN-13 validation, cost conversion
//! and the dashboard aggregations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web front-end                                │   │
//! │  │    Dashboard ──► Product table ──► Scanner view                 │   │
//! │  └──────────────┬───────────────────────────────┬──────────────────┘   │
//! │                 │ rows (hosted data store)      │ scan requests        │
//! │  ┌──────────────▼────────────────┐  ┌───────────▼──────────────────┐   │
//! │  │  ★ stockroom-core (THIS) ★    │  │  stockroom-scan              │   │
//! │  │                               │◄─┤  engines, prober, scanner,   │   │
//! │  │  types  validation  pricing   │  │  lookup flow, config         │   │
//! │  │  dashboard  error             │  └──────────────────────────────┘   │
//! │  │                               │                                     │
//! │  │  NO I/O • PURE FUNCTIONS      │                                     │
//! │  └───────────────────────────────┘                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, OrderLine, ProductDraft)
//! - [`validation`] - EAN-13 checksum and field validation
//! - [`pricing`] - Exchange rate / import factor cost conversion
//! - [`dashboard`] - Critical stock, top sellers, profitability, monthly trend
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::validation::is_valid_ean13;
//! use stockroom_core::pricing::{CostBreakdown, ExchangeRate, ImportFactor};
//!
//! assert!(is_valid_ean13("4006381333931"));
//!
//! let cost = CostBreakdown::compute(10.0, 600.0, ExchangeRate::new(40.0), ImportFactor::new(1.3));
//! assert!((cost.cost_local_net - 520.0).abs() < 1e-9);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod dashboard;
pub mod error;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use dashboard::{
    critical_stock, monthly_trend, profitability, top_sellers, CriticalStockRow,
    DashboardSettings, DashboardSummary, MonthlyTrendPoint, ProfitabilityRow, TopSellerRow,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use pricing::{CostBreakdown, ExchangeRate, ImportFactor};
pub use types::*;
pub use validation::is_valid_ean13;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Inclusive stock-minus-minimum window for the "critical stock" table.
///
/// ## Business Reason
/// Fixed store policy: anything within five units of its minimum is shown.
pub const CRITICAL_STOCK_WINDOW: i64 = 5;

/// Maximum rows in the critical stock table.
pub const CRITICAL_STOCK_LIMIT: usize = 10;

/// Default row count for top sellers and profitability tables.
pub const DEFAULT_TOP_N: usize = 10;

/// Default number of months shown in the sales trend chart.
pub const DEFAULT_MONTHS_WINDOW: usize = 6;

/// Length of an EAN-13 code.
pub const EAN13_LENGTH: usize = 13;
