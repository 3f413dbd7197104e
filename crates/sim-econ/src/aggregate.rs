//! Multi-product aggregation with premium-share weights.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use sim_core::{IndicesState, PnLState, ProductLine};

/// Premium-share weight per product: premium ÷ total premium.
///
/// Weights sum to 1 within floating tolerance whenever total premium is
/// positive. When no product carries premium the function falls back to
/// equal weighting rather than dividing by zero.
pub fn premium_weights(products: &[ProductLine]) -> Vec<f64> {
    if products.is_empty() {
        return Vec::new();
    }
    let premiums: Vec<f64> = products
        .iter()
        .map(|p| p.vars.premiums_earned.to_f64().unwrap_or(0.0).max(0.0))
        .collect();
    let total: f64 = premiums.iter().sum();
    if total > 0.0 {
        premiums.iter().map(|p| p / total).collect()
    } else {
        let equal = 1.0 / products.len() as f64;
        vec![equal; products.len()]
    }
}

/// Global indices as the weight-dot-product of per-product indices.
/// Returns `None` when `weights` does not match `products` or both are empty.
pub fn aggregate_indices(products: &[ProductLine], weights: &[f64]) -> Option<IndicesState> {
    if products.is_empty() || products.len() != weights.len() {
        return None;
    }
    Some(IndicesState::from_fn(|id| {
        products
            .iter()
            .zip(weights)
            .map(|(p, w)| p.indices.get(id) * w)
            .sum()
    }))
}

/// Global P&L as the weight-dot-product of per-product lines. The result
/// line is rebuilt by construction, which coincides with the weighted
/// result since the identity is linear.
pub fn aggregate_pnl(products: &[ProductLine], weights: &[f64]) -> Option<PnLState> {
    if products.is_empty() || products.len() != weights.len() {
        return None;
    }
    let mut premiums = Decimal::ZERO;
    let mut claims = Decimal::ZERO;
    let mut expenses = Decimal::ZERO;
    let mut financial_income = Decimal::ZERO;
    for (p, w) in products.iter().zip(weights) {
        let w = Decimal::from_f64(*w).unwrap_or(Decimal::ZERO);
        premiums += p.pnl.premiums * w;
        claims += p.pnl.claims * w;
        expenses += p.pnl.expenses * w;
        financial_income += p.pnl.financial_income * w;
    }
    Some(PnLState::new(premiums, claims, expenses, financial_income))
}
