//! # Pricing Module
//!
//! Converts supplier costs into local currency and derives margins.
//!
//! ## Cost Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  cost_source (supplier currency)                                       │
//! │       │ × ExchangeRate                                                  │
//! │       ▼                                                                 │
//! │  cost_local_gross ──► margin_gross = sale_price - cost_local_gross     │
//! │       │ × ImportFactor (freight, duties)                                │
//! │       ▼                                                                 │
//! │  cost_local_net   ──► margin_net   = sale_price - cost_local_net       │
//! │                                                                         │
//! │  margin % = margin / cost × 100   (0 when cost is 0)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unlike the till, where integer cents are mandatory, these figures feed
//! charts and rankings only, so `f64` is used throughout.
//!
//! ## Usage
//! ```rust
//! use stockroom_core::pricing::{CostBreakdown, ExchangeRate, ImportFactor};
//!
//! let c = CostBreakdown::compute(10.0, 600.0, ExchangeRate::new(40.0), ImportFactor::new(1.3));
//! assert!((c.cost_local_gross - 400.0).abs() < 1e-9);
//! assert!((c.margin_net - 80.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Exchange Rate
// =============================================================================

/// Local currency units per unit of the supplier's currency.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExchangeRate(f64);

impl ExchangeRate {
    #[inline]
    pub const fn new(rate: f64) -> Self {
        ExchangeRate(rate)
    }

    #[inline]
    pub const fn value(&self) -> f64 {
        self.0
    }

    /// Converts an amount in the supplier's currency to local currency.
    #[inline]
    pub fn convert(&self, source: f64) -> f64 {
        source * self.0
    }
}

/// Identity rate: costs are already in local currency.
impl Default for ExchangeRate {
    fn default() -> Self {
        ExchangeRate(1.0)
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// =============================================================================
// Import Factor
// =============================================================================

/// Multiplier for landed cost: 1.3 adds 30% for freight and duties.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ImportFactor(f64);

impl ImportFactor {
    #[inline]
    pub const fn new(factor: f64) -> Self {
        ImportFactor(factor)
    }

    /// Creates a factor from a surcharge percentage (30.0 → 1.3).
    pub fn from_surcharge_percentage(pct: f64) -> Self {
        ImportFactor(1.0 + pct / 100.0)
    }

    #[inline]
    pub const fn value(&self) -> f64 {
        self.0
    }

    /// Applies the factor to a gross local cost.
    #[inline]
    pub fn apply(&self, gross: f64) -> f64 {
        gross * self.0
    }
}

impl Default for ImportFactor {
    fn default() -> Self {
        ImportFactor(1.0)
    }
}

impl fmt::Display for ImportFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{:.2}", self.0)
    }
}

// =============================================================================
// Margins
// =============================================================================

/// Margin as a percentage of cost. Returns 0 when cost is 0.
#[inline]
pub fn margin_percentage(margin: f64, cost: f64) -> f64 {
    if cost == 0.0 {
        0.0
    } else {
        margin / cost * 100.0
    }
}

/// Every cost variant and margin derived for one product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CostBreakdown {
    pub cost_source: f64,
    pub cost_local_gross: f64,
    pub cost_local_net: f64,
    pub margin_gross: f64,
    pub margin_net: f64,
    pub margin_gross_pct: f64,
    pub margin_net_pct: f64,
}

impl CostBreakdown {
    /// Computes cost variants and margins for a product.
    ///
    /// ## Example (from the dashboard)
    /// ```text
    /// cost 10 × rate 40      = 400  gross cost
    /// 400 × factor 1.3       = 520  net cost
    /// price 600 - 520        =  80  net margin
    /// 80 / 520 × 100         ≈ 15.38 %
    /// ```
    pub fn compute(
        cost_source: f64,
        sale_price: f64,
        rate: ExchangeRate,
        factor: ImportFactor,
    ) -> Self {
        let cost_local_gross = rate.convert(cost_source);
        let cost_local_net = factor.apply(cost_local_gross);
        let margin_gross = sale_price - cost_local_gross;
        let margin_net = sale_price - cost_local_net;

        CostBreakdown {
            cost_source,
            cost_local_gross,
            cost_local_net,
            margin_gross,
            margin_net,
            margin_gross_pct: margin_percentage(margin_gross, cost_local_gross),
            margin_net_pct: margin_percentage(margin_net, cost_local_net),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
