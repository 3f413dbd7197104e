//! P&L statement computation and derived ratios.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use sim_core::{CompanyVariables, PnLState};

/// Multiply a monetary amount by an f64 ratio. Non-finite ratios collapse
/// to zero so no NaN can reach the P&L.
fn mul_ratio(amount: Decimal, ratio: f64) -> Decimal {
    let guarded = if ratio.is_finite() { ratio } else { 0.0 };
    amount * Decimal::from_f64(guarded).unwrap_or(Decimal::ZERO)
}

/// Compute the four P&L line items from company variables. The result line
/// is derived by construction (`PnLState::new`), never independently
/// computed and checked.
pub fn calculate_pnl(vars: &CompanyVariables) -> PnLState {
    let premiums = vars.premiums_earned;
    let claims = mul_ratio(premiums, vars.base_loss_ratio);
    let commissions = mul_ratio(premiums, vars.commission_rate);
    let expenses =
        vars.admin_expenses + commissions + vars.acquisition_spend + vars.training_spend;
    let financial_income = mul_ratio(vars.invested_assets, vars.investment_yield);
    PnLState::new(premiums, claims, expenses, financial_income)
}

/// Claims over premiums, with an epsilon-floored denominator.
pub fn loss_ratio(pnl: &PnLState, eps: f64) -> f64 {
    let premiums = pnl.premiums.to_f64().unwrap_or(0.0).max(eps);
    pnl.claims.to_f64().unwrap_or(0.0) / premiums
}

/// Expenses over premiums, with an epsilon-floored denominator.
pub fn expense_ratio(pnl: &PnLState, eps: f64) -> f64 {
    let premiums = pnl.premiums.to_f64().unwrap_or(0.0).max(eps);
    pnl.expenses.to_f64().unwrap_or(0.0) / premiums
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_pnl_lines_are_consistent() {
        let pnl = calculate_pnl(&CompanyVariables::default());
        // 25M premiums, 70% loss ratio, 3.5M admin + 2M commissions
        // + 0.5M acquisition + 0.15M training, 2% yield on 50M assets.
        assert_eq!(pnl.premiums, Decimal::new(25_000_000, 0));
        assert_eq!(pnl.claims, Decimal::new(17_500_000, 0));
        assert_eq!(pnl.expenses, Decimal::new(6_150_000, 0));
        assert_eq!(pnl.financial_income, Decimal::new(1_000_000, 0));
        assert_eq!(
            pnl.result,
            pnl.premiums - pnl.claims - pnl.expenses + pnl.financial_income
        );
    }

    #[test]
    fn ratios_survive_zero_premiums() {
        let vars = CompanyVariables {
            premiums_earned: Decimal::ZERO,
            ..CompanyVariables::default()
        };
        let pnl = calculate_pnl(&vars);
        assert!(loss_ratio(&pnl, 1e-6).is_finite());
        assert!(expense_ratio(&pnl, 1e-6).is_finite());
    }

    #[test]
    fn non_finite_ratio_inputs_collapse_to_zero() {
        let vars = CompanyVariables {
            base_loss_ratio: f64::NAN,
            investment_yield: f64::INFINITY,
            ..CompanyVariables::default()
        };
        let pnl = calculate_pnl(&vars);
        assert_eq!(pnl.claims, Decimal::ZERO);
        assert_eq!(pnl.financial_income, Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn accounting_identity_holds(
            premiums in 0i64..1_000_000_000,
            loss in 0.0f64..2.0,
            commission in 0.0f64..0.5,
            yield_frac in 0.0f64..0.2,
        ) {
            let vars = CompanyVariables {
                premiums_earned: Decimal::new(premiums, 0),
                base_loss_ratio: loss,
                commission_rate: commission,
                investment_yield: yield_frac,
                ..CompanyVariables::default()
            };
            let pnl = calculate_pnl(&vars);
            let identity = pnl.premiums - pnl.claims - pnl.expenses + pnl.financial_income;
            prop_assert_eq!(pnl.result, identity);
        }
    }
}
