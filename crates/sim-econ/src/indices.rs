//! The seven index calculators.
//!
//! Each calculator is a pure weighted combination of company variables.
//! Denominators are floored to a minimum epsilon rather than failing, and
//! every result is clamped to [0,100]; no input combination can produce
//! NaN or a value outside the legal range.

use rust_decimal::prelude::ToPrimitive;

use sim_core::{clamp_index, CompanyVariables, EngineConstants, IndexId, IndicesState};

use crate::pnl::{calculate_pnl, expense_ratio, loss_ratio};

fn dec_f64(d: rust_decimal::Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// IAC — commercial attractiveness: price positioning, brand, retention.
pub fn calculate_iac(vars: &CompanyVariables, _eps: f64) -> f64 {
    let price_attractiveness = (2.0 - vars.pricing_level) * 50.0;
    clamp_index(
        0.40 * price_attractiveness + 0.30 * vars.brand_awareness + 30.0 * vars.retention_rate,
    )
}

/// IPQO — operational quality: settlement speed, backlog pressure, automation.
pub fn calculate_ipqo(vars: &CompanyVariables, eps: f64) -> f64 {
    let throughput = (vars.staff_count * vars.claims_capacity).max(eps);
    let backlog_pressure = vars.claims_backlog.max(0.0) / throughput;
    let backlog_score = (1.0 - backlog_pressure).max(0.0) * 100.0;
    let settlement_score = (15.0 / vars.settlement_days.max(eps) * 100.0).min(100.0);
    clamp_index(0.35 * settlement_score + 0.35 * backlog_score + 0.30 * vars.automation_level)
}

/// IERH — HR balance: workload, staff stability, training investment.
pub fn calculate_ierh(vars: &CompanyVariables, eps: f64) -> f64 {
    let overload = (vars.workload - 1.0).max(0.0);
    let workload_score = (100.0 - 80.0 * overload).max(0.0);
    let stability_score = (1.0 - 3.0 * vars.turnover_rate).max(0.0) * 100.0;
    let training_per_staff = dec_f64(vars.training_spend) / vars.staff_count.max(eps);
    let training_score = (training_per_staff / 25.0).min(100.0);
    clamp_index(0.40 * workload_score + 0.30 * stability_score + 0.30 * training_score)
}

/// IRF — financial resilience: combined ratio, solvency, reinsurance.
pub fn calculate_irf(vars: &CompanyVariables, eps: f64) -> f64 {
    let pnl = calculate_pnl(vars);
    let combined = loss_ratio(&pnl, eps) + expense_ratio(&pnl, eps);
    let combined_score = (1.15 - combined) / 0.40 * 100.0;
    let solvency_score = 50.0 * vars.solvency_ratio;
    let reinsurance_score = (200.0 * vars.reinsurance_share).min(100.0);
    clamp_index(0.45 * combined_score + 0.40 * solvency_score + 0.15 * reinsurance_score)
}

/// IMD — data maturity: IT estate and data quality.
pub fn calculate_imd(vars: &CompanyVariables, _eps: f64) -> f64 {
    clamp_index(0.55 * vars.it_maturity + 0.45 * vars.data_quality)
}

/// IS — sincerity/compliance: audit effort and complaint pressure.
pub fn calculate_is(vars: &CompanyVariables, _eps: f64) -> f64 {
    let complaint_score = (100.0 - 10.0 * vars.complaint_rate.max(0.0)).max(0.0);
    clamp_index(0.60 * vars.compliance_effort + 0.40 * complaint_score)
}

/// IPP — P&L performance: technical margin on earned premiums.
pub fn calculate_ipp(vars: &CompanyVariables, eps: f64) -> f64 {
    let pnl = calculate_pnl(vars);
    let margin = dec_f64(pnl.result) / dec_f64(pnl.premiums).max(eps);
    clamp_index(50.0 + 400.0 * margin)
}

/// All seven indices from one set of variables.
pub fn calculate_indices(vars: &CompanyVariables, constants: &EngineConstants) -> IndicesState {
    let eps = constants.min_denominator;
    IndicesState::from_fn(|id| match id {
        IndexId::CommercialAttractiveness => calculate_iac(vars, eps),
        IndexId::OperationalQuality => calculate_ipqo(vars, eps),
        IndexId::HrBalance => calculate_ierh(vars, eps),
        IndexId::FinancialResilience => calculate_irf(vars, eps),
        IndexId::DataMaturity => calculate_imd(vars, eps),
        IndexId::Sincerity => calculate_is(vars, eps),
        IndexId::PnlPerformance => calculate_ipp(vars, eps),
    })
}

/// Derive a product's starting indices from raw company data. Used when a
/// campaign is set up from real variables instead of the documented
/// defaults; thereafter indices evolve incrementally through effects.
pub fn initialize_product_indices(
    vars: &CompanyVariables,
    constants: &EngineConstants,
) -> IndicesState {
    calculate_indices(vars, constants)
}
