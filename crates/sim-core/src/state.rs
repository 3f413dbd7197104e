//! Company state: indices, P&L, underlying variables, products, turns.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::effect::EffectsQueue;

/// The seven company health indices, identified by their stable short codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexId {
    /// IAC — commercial attractiveness.
    #[serde(rename = "IAC")]
    CommercialAttractiveness,
    /// IPQO — operational quality and performance.
    #[serde(rename = "IPQO")]
    OperationalQuality,
    /// IERH — human-resources balance.
    #[serde(rename = "IERH")]
    HrBalance,
    /// IRF — financial resilience.
    #[serde(rename = "IRF")]
    FinancialResilience,
    /// IMD — data maturity.
    #[serde(rename = "IMD")]
    DataMaturity,
    /// IS — sincerity / compliance.
    #[serde(rename = "IS")]
    Sincerity,
    /// IPP — P&L performance.
    #[serde(rename = "IPP")]
    PnlPerformance,
}

impl IndexId {
    /// All indices in canonical (deterministic) order.
    pub const ALL: [IndexId; 7] = [
        IndexId::CommercialAttractiveness,
        IndexId::OperationalQuality,
        IndexId::HrBalance,
        IndexId::FinancialResilience,
        IndexId::DataMaturity,
        IndexId::Sincerity,
        IndexId::PnlPerformance,
    ];

    /// Stable short code, e.g. "IAC".
    pub fn code(self) -> &'static str {
        match self {
            IndexId::CommercialAttractiveness => "IAC",
            IndexId::OperationalQuality => "IPQO",
            IndexId::HrBalance => "IERH",
            IndexId::FinancialResilience => "IRF",
            IndexId::DataMaturity => "IMD",
            IndexId::Sincerity => "IS",
            IndexId::PnlPerformance => "IPP",
        }
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Clamp an index value into its legal [0,100] range. Non-finite inputs
/// collapse to 0 so that no NaN/Infinity can reach stored state.
pub fn clamp_index(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// The seven bounded indices. Every stored value is within [0,100];
/// `set` clamps on the way in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndicesState {
    values: BTreeMap<IndexId, f64>,
}

impl IndicesState {
    /// Documented starting values for a campaign with no prior history.
    pub fn starting() -> Self {
        let mut values = BTreeMap::new();
        values.insert(IndexId::CommercialAttractiveness, 60.0);
        values.insert(IndexId::OperationalQuality, 60.0);
        values.insert(IndexId::HrBalance, 60.0);
        values.insert(IndexId::FinancialResilience, 60.0);
        values.insert(IndexId::DataMaturity, 45.0);
        values.insert(IndexId::Sincerity, 70.0);
        values.insert(IndexId::PnlPerformance, 55.0);
        Self { values }
    }

    /// Build a state from explicit per-index values, clamping each.
    pub fn from_fn(mut f: impl FnMut(IndexId) -> f64) -> Self {
        let mut values = BTreeMap::new();
        for id in IndexId::ALL {
            values.insert(id, clamp_index(f(id)));
        }
        Self { values }
    }

    pub fn get(&self, id: IndexId) -> f64 {
        self.values.get(&id).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, id: IndexId, value: f64) {
        self.values.insert(id, clamp_index(value));
    }

    /// Iterate in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (IndexId, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

impl Default for IndicesState {
    fn default() -> Self {
        Self::starting()
    }
}

/// Profit-and-loss statement for one turn. `result` is derived by
/// construction and therefore always satisfies the accounting identity
/// result = premiums - claims - expenses + financial_income.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PnLState {
    pub premiums: Decimal,
    pub claims: Decimal,
    pub expenses: Decimal,
    pub financial_income: Decimal,
    pub result: Decimal,
}

impl PnLState {
    pub fn new(
        premiums: Decimal,
        claims: Decimal,
        expenses: Decimal,
        financial_income: Decimal,
    ) -> Self {
        Self {
            premiums,
            claims,
            expenses,
            financial_income,
            result: premiums - claims - expenses + financial_income,
        }
    }
}

impl Default for PnLState {
    fn default() -> Self {
        PnLState::new(
            Decimal::new(25_000_000, 0),
            Decimal::new(17_500_000, 0),
            Decimal::new(6_150_000, 0),
            Decimal::new(1_000_000, 0),
        )
    }
}

/// Underlying company levers and ratios from which indices and P&L are
/// derived. Owned by the turn being computed; each resolution replaces the
/// previous snapshot rather than mutating it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompanyVariables {
    /// Premium positioning relative to market (1.0 = at market).
    pub pricing_level: f64,
    /// Per-turn acquisition/marketing spend.
    pub acquisition_spend: Decimal,
    /// Portfolio retention rate in [0,1].
    pub retention_rate: f64,
    /// Brand awareness score in [0,100].
    pub brand_awareness: f64,
    /// Full-time staff.
    pub staff_count: f64,
    /// Open work per staff member (1.0 = nominal load).
    pub workload: f64,
    /// Per-turn training spend.
    pub training_spend: Decimal,
    /// Annualized staff turnover in [0,1].
    pub turnover_rate: f64,
    /// Process automation score in [0,100].
    pub automation_level: f64,
    /// Claim files a handler can settle per turn.
    pub claims_capacity: f64,
    /// Open claim files.
    pub claims_backlog: f64,
    /// Average days to settle a claim.
    pub settlement_days: f64,
    /// IT estate maturity in [0,100].
    pub it_maturity: f64,
    /// Data quality score in [0,100].
    pub data_quality: f64,
    /// Compliance/audit effort in [0,100].
    pub compliance_effort: f64,
    /// Complaints per 1000 policies.
    pub complaint_rate: f64,
    /// Premiums earned this turn.
    pub premiums_earned: Decimal,
    /// Expected claims as a fraction of earned premiums.
    pub base_loss_ratio: f64,
    /// Administrative expenses per turn.
    pub admin_expenses: Decimal,
    /// Commissions as a fraction of earned premiums.
    pub commission_rate: f64,
    /// Invested asset base.
    pub invested_assets: Decimal,
    /// Per-turn investment yield as a fraction.
    pub investment_yield: f64,
    /// Solvency capital over requirement (1.0 = at minimum).
    pub solvency_ratio: f64,
    /// Share of risk ceded to reinsurers in [0,1].
    pub reinsurance_share: f64,
}

impl Default for CompanyVariables {
    fn default() -> Self {
        Self {
            pricing_level: 1.0,
            acquisition_spend: Decimal::new(500_000, 0),
            retention_rate: 0.86,
            brand_awareness: 55.0,
            staff_count: 120.0,
            workload: 1.0,
            training_spend: Decimal::new(150_000, 0),
            turnover_rate: 0.10,
            automation_level: 45.0,
            claims_capacity: 40.0,
            claims_backlog: 4_000.0,
            settlement_days: 21.0,
            it_maturity: 45.0,
            data_quality: 45.0,
            compliance_effort: 70.0,
            complaint_rate: 3.0,
            premiums_earned: Decimal::new(25_000_000, 0),
            base_loss_ratio: 0.70,
            admin_expenses: Decimal::new(3_500_000, 0),
            commission_rate: 0.08,
            invested_assets: Decimal::new(50_000_000, 0),
            investment_yield: 0.02,
            solvency_ratio: 1.6,
            reinsurance_share: 0.20,
        }
    }
}

/// Unique identifier for an insurance product line, e.g. "auto", "home".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One insurance product line with its own variables, indices and P&L.
/// Its premium volume (`vars.premiums_earned`) drives aggregation weights.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductLine {
    pub id: ProductId,
    pub name: String,
    pub vars: CompanyVariables,
    pub indices: IndicesState,
    pub pnl: PnLState,
}

impl ProductLine {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: ProductId(id.to_string()),
            name: name.to_string(),
            vars: CompanyVariables::default(),
            indices: IndicesState::starting(),
            pnl: PnLState::default(),
        }
    }
}

/// Simulation speed, scaling how many turns a delayed effect takes to mature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameSpeed {
    Fast,
    Medium,
    Slow,
}

impl GameSpeed {
    /// Multiplier applied to per-domain base delays.
    pub fn delay_multiplier(self) -> f64 {
        match self {
            GameSpeed::Fast => 0.5,
            GameSpeed::Medium => 1.0,
            GameSpeed::Slow => 2.0,
        }
    }
}

/// Campaign difficulty, scaling alert thresholds and market-noise amplitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    /// Multiplier on alert thresholds; harder campaigns warn earlier.
    pub fn threshold_scale(self) -> f64 {
        match self {
            Difficulty::Easy => 0.9,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.1,
        }
    }

    /// Multiplier on market-noise amplitude.
    pub fn noise_scale(self) -> f64 {
        match self {
            Difficulty::Easy => 0.5,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.5,
        }
    }
}

/// Phases a turn passes through, in strict linear order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    Dashboard,
    Events,
    Decisions,
    Resolution,
    Feedback,
}

impl TurnPhase {
    pub const SEQUENCE: [TurnPhase; 5] = [
        TurnPhase::Dashboard,
        TurnPhase::Events,
        TurnPhase::Decisions,
        TurnPhase::Resolution,
        TurnPhase::Feedback,
    ];

    /// The next phase, or `None` at `Feedback` (terminal until a new turn).
    pub fn next(self) -> Option<TurnPhase> {
        let i = self.index();
        TurnPhase::SEQUENCE.get(i + 1).copied()
    }

    pub fn index(self) -> usize {
        match self {
            TurnPhase::Dashboard => 0,
            TurnPhase::Events => 1,
            TurnPhase::Decisions => 2,
            TurnPhase::Resolution => 3,
            TurnPhase::Feedback => 4,
        }
    }
}

/// A single impact an external event has on one index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventImpact {
    pub target: IndexId,
    pub amount: f64,
    pub kind: crate::effect::EffectKind,
}

/// An external market/world event active during a turn. Events participate
/// in effect stacking and in driver attribution like any other cause.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: String,
    pub label: String,
    pub impacts: Vec<EventImpact>,
}

/// Immutable snapshot of the whole company at the end of one turn.
/// Turn 0 is the campaign start; resolving turn N consumes snapshot N-1
/// and produces snapshot N.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnState {
    pub turn: u32,
    pub date: NaiveDate,
    pub budget: Decimal,
    pub indices: IndicesState,
    pub pnl: PnLState,
    pub products: Vec<ProductLine>,
    pub queue: EffectsQueue,
}

impl TurnState {
    /// Campaign-start snapshot (turn 0) from the documented defaults.
    pub fn campaign_start(date: NaiveDate, products: Vec<ProductLine>, budget: Decimal) -> Self {
        Self {
            turn: 0,
            date,
            budget,
            indices: IndicesState::starting(),
            pnl: PnLState::default(),
            products,
            queue: EffectsQueue::default(),
        }
    }

    pub fn product(&self, id: &ProductId) -> Option<&ProductLine> {
        self.products.iter().find(|p| &p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn starting_indices_match_documented_defaults() {
        let s = IndicesState::starting();
        assert_eq!(s.get(IndexId::CommercialAttractiveness), 60.0);
        assert_eq!(s.get(IndexId::OperationalQuality), 60.0);
        assert_eq!(s.get(IndexId::HrBalance), 60.0);
        assert_eq!(s.get(IndexId::FinancialResilience), 60.0);
        assert_eq!(s.get(IndexId::DataMaturity), 45.0);
        assert_eq!(s.get(IndexId::Sincerity), 70.0);
        assert_eq!(s.get(IndexId::PnlPerformance), 55.0);
    }

    #[test]
    fn set_clamps_into_bounds() {
        let mut s = IndicesState::starting();
        s.set(IndexId::Sincerity, 140.0);
        assert_eq!(s.get(IndexId::Sincerity), 100.0);
        s.set(IndexId::Sincerity, -3.0);
        assert_eq!(s.get(IndexId::Sincerity), 0.0);
        s.set(IndexId::Sincerity, f64::NAN);
        assert_eq!(s.get(IndexId::Sincerity), 0.0);
    }

    #[test]
    fn pnl_identity_by_construction() {
        let p = PnLState::new(
            Decimal::new(1_000, 0),
            Decimal::new(700, 0),
            Decimal::new(250, 0),
            Decimal::new(40, 0),
        );
        assert_eq!(p.result, Decimal::new(90, 0));
    }

    #[test]
    fn phase_order_is_linear_and_terminal() {
        assert_eq!(TurnPhase::Dashboard.next(), Some(TurnPhase::Events));
        assert_eq!(TurnPhase::Events.next(), Some(TurnPhase::Decisions));
        assert_eq!(TurnPhase::Decisions.next(), Some(TurnPhase::Resolution));
        assert_eq!(TurnPhase::Resolution.next(), Some(TurnPhase::Feedback));
        assert_eq!(TurnPhase::Feedback.next(), None);
    }

    #[test]
    fn indices_serde_roundtrip_uses_codes() {
        let s = IndicesState::starting();
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"IAC\""));
        assert!(json.contains("\"IPP\""));
        let back: IndicesState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    proptest! {
        #[test]
        fn clamp_always_in_bounds(v in proptest::num::f64::ANY) {
            let c = clamp_index(v);
            prop_assert!((0.0..=100.0).contains(&c));
        }
    }
}
