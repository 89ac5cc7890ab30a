//! # Dashboard Aggregations
//!
//! Pure transformations from product and order rows into dashboard tables.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  hosted store ──► Vec<Product>, Vec<Order>, Vec<OrderLine>              │
//! │                         │                                               │
//! │        ┌────────────────┼─────────────────┬──────────────────┐         │
//! │        ▼                ▼                 ▼                  ▼          │
//! │  critical_stock    top_sellers      profitability     monthly_trend    │
//! │  stock - min ≤ 5   Σ qty by code    margin after      Σ qty per        │
//! │  ascending         descending       rate × factor     year-month       │
//! │                                                                         │
//! │  Every function is total: missing numbers count as 0, unknown codes    │
//! │  get a placeholder description, orphan lines are skipped.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::pricing::{CostBreakdown, ExchangeRate, ImportFactor};
use crate::types::{Order, OrderLine, Product};
use crate::{CRITICAL_STOCK_LIMIT, CRITICAL_STOCK_WINDOW, DEFAULT_MONTHS_WINDOW, DEFAULT_TOP_N};

/// Description used when an order line references an unknown product code.
pub const UNKNOWN_DESCRIPTION: &str = "Unknown product";

// =============================================================================
// Row Types
// =============================================================================

/// A product close to (or below) its minimum stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CriticalStockRow {
    pub code: String,
    pub description: String,
    pub stock: i64,
    pub min_stock: i64,
    /// stock - min_stock; smaller is more critical.
    pub difference: i64,
}

/// Units sold per product code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TopSellerRow {
    pub code: String,
    pub description: String,
    pub quantity: i64,
    /// Number of order lines that referenced the code.
    pub line_count: usize,
}

/// Cost and margin figures for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfitabilityRow {
    pub code: String,
    pub description: String,
    pub sale_price: f64,
    #[serde(flatten)]
    pub costs: CostBreakdown,
}

/// One calendar month of sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlyTrendPoint {
    pub year: i32,
    pub month: u32,
    /// "YYYY-MM" label for chart axes.
    pub label: String,
    pub quantity: i64,
    pub distinct_products: usize,
}

// =============================================================================
// Aggregations
// =============================================================================

/// Active products whose stock is within `window` units of their minimum.
///
/// Sorted most critical first, truncated to [`CRITICAL_STOCK_LIMIT`].
pub fn critical_stock(products: &[Product], window: i64) -> Vec<CriticalStockRow> {
    let mut rows: Vec<CriticalStockRow> = products
        .iter()
        .filter(|p| p.is_active)
        .filter(|p| p.stock_gap() <= window)
        .map(|p| CriticalStockRow {
            code: p.code.clone(),
            description: p.description.clone(),
            stock: p.stock,
            min_stock: p.min_stock_or_zero(),
            difference: p.stock_gap(),
        })
        .collect();

    rows.sort_by(|a, b| {
        a.difference
            .cmp(&b.difference)
            .then_with(|| a.code.cmp(&b.code))
    });
    rows.truncate(CRITICAL_STOCK_LIMIT);
    rows
}

/// Best-selling products by summed quantity.
pub fn top_sellers(lines: &[OrderLine], products: &[Product], top_n: usize) -> Vec<TopSellerRow> {
    let mut totals: HashMap<&str, (i64, usize)> = HashMap::new();
    for line in lines {
        let entry = totals.entry(line.product_code.as_str()).or_insert((0, 0));
        entry.0 = entry.0.saturating_add(line.quantity);
        entry.1 += 1;
    }

    let descriptions: HashMap<&str, &str> = products
        .iter()
        .map(|p| (p.code.as_str(), p.description.as_str()))
        .collect();

    let mut rows: Vec<TopSellerRow> = totals
        .into_iter()
        .map(|(code, (quantity, line_count))| TopSellerRow {
            code: code.to_string(),
            description: descriptions
                .get(code)
                .copied()
                .unwrap_or(UNKNOWN_DESCRIPTION)
                .to_string(),
            quantity,
            line_count,
        })
        .collect();

    rows.sort_by(|a, b| b.quantity.cmp(&a.quantity).then_with(|| a.code.cmp(&b.code)));
    rows.truncate(top_n);
    rows
}

/// Margin ranking for products with both a positive cost and a positive price.
pub fn profitability(
    products: &[Product],
    rate: ExchangeRate,
    factor: ImportFactor,
    top_n: usize,
) -> Vec<ProfitabilityRow> {
    let mut rows: Vec<ProfitabilityRow> = products
        .iter()
        .filter(|p| p.cost_or_zero() > 0.0 && p.sale_price > 0.0)
        .filter(|p| p.cost_or_zero().is_finite() && p.sale_price.is_finite())
        .map(|p| ProfitabilityRow {
            code: p.code.clone(),
            description: p.description.clone(),
            sale_price: p.sale_price,
            costs: CostBreakdown::compute(p.cost_or_zero(), p.sale_price, rate, factor),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.costs
            .margin_net_pct
            .total_cmp(&a.costs.margin_net_pct)
            .then_with(|| a.code.cmp(&b.code))
    });
    rows.truncate(top_n);
    rows
}

/// Units sold per calendar month, oldest first, last `months_window` months.
///
/// Lines whose order is missing from `orders` are ignored.
pub fn monthly_trend(
    orders: &[Order],
    lines: &[OrderLine],
    months_window: usize,
) -> Vec<MonthlyTrendPoint> {
    let order_months: HashMap<i64, (i32, u32)> = orders
        .iter()
        .map(|o| (o.id, (o.created_at.year(), o.created_at.month())))
        .collect();

    let mut buckets: BTreeMap<(i32, u32), (i64, BTreeSet<&str>)> = BTreeMap::new();
    for line in lines {
        let Some(&key) = order_months.get(&line.order_id) else {
            continue;
        };
        let bucket = buckets.entry(key).or_default();
        bucket.0 = bucket.0.saturating_add(line.quantity);
        bucket.1.insert(line.product_code.as_str());
    }

    let skip = buckets.len().saturating_sub(months_window);
    buckets
        .into_iter()
        .skip(skip)
        .map(|((year, month), (quantity, codes))| MonthlyTrendPoint {
            year,
            month,
            label: format!("{:04}-{:02}", year, month),
            quantity,
            distinct_products: codes.len(),
        })
        .collect()
}

// =============================================================================
// Summary
// =============================================================================

/// Tunables for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct DashboardSettings {
    pub exchange_rate: ExchangeRate,
    pub import_factor: ImportFactor,
    pub top_n: usize,
    pub critical_window: i64,
    pub months_window: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        DashboardSettings {
            exchange_rate: ExchangeRate::default(),
            import_factor: ImportFactor::default(),
            top_n: DEFAULT_TOP_N,
            critical_window: CRITICAL_STOCK_WINDOW,
            months_window: DEFAULT_MONTHS_WINDOW,
        }
    }
}

/// Everything the dashboard page renders, computed in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardSummary {
    pub total_products: usize,
    pub active_products: usize,
    pub total_units: i64,
    /// Σ stock × sale price over active products.
    pub inventory_value: f64,
    pub below_minimum: usize,
    pub critical_stock: Vec<CriticalStockRow>,
    pub top_sellers: Vec<TopSellerRow>,
    pub profitability: Vec<ProfitabilityRow>,
    pub monthly_trend: Vec<MonthlyTrendPoint>,
}

impl DashboardSummary {
    pub fn compute(
        products: &[Product],
        orders: &[Order],
        lines: &[OrderLine],
        settings: &DashboardSettings,
    ) -> Self {
        let active = products.iter().filter(|p| p.is_active);

        DashboardSummary {
            total_products: products.len(),
            active_products: active.clone().count(),
            total_units: active.clone().fold(0i64, |acc, p| acc.saturating_add(p.stock)),
            inventory_value: active.clone().map(|p| p.stock as f64 * p.sale_price).sum(),
            below_minimum: active.filter(|p| p.is_below_minimum()).count(),
            critical_stock: critical_stock(products, settings.critical_window),
            top_sellers: top_sellers(lines, products, settings.top_n),
            profitability: profitability(
                products,
                settings.exchange_rate,
                settings.import_factor,
                settings.top_n,
            ),
            monthly_trend: monthly_trend(orders, lines, settings.months_window),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
