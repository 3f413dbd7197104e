//! Feedback returned to the caller after a resolution.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sim_core::{IndexId, ProductId};
use sim_insight::{Alert, Driver};

/// One index that moved by at least the significance threshold, with its
/// attributed drivers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MajorVariation {
    pub index: IndexId,
    pub previous: f64,
    pub current: f64,
    pub delta: f64,
    pub drivers: Vec<Driver>,
}

/// A per-index cap that fired during stacking: the net delta was clamped
/// from `raw` to `applied`. Reported, never silently dropped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapReport {
    pub product: ProductId,
    pub target: IndexId,
    pub raw: f64,
    pub applied: f64,
    pub limit: f64,
}

/// Aggregate counters for the turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnSummary {
    pub decisions_applied: usize,
    pub indices_improved: Vec<IndexId>,
    pub indices_degraded: Vec<IndexId>,
    pub pnl_delta: Decimal,
}

/// Everything the orchestration layer returns to the player after
/// Resolution completes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnFeedback {
    pub turn: u32,
    pub major_variations: Vec<MajorVariation>,
    pub summary: TurnSummary,
    pub alerts: Vec<Alert>,
    pub cap_reports: Vec<CapReport>,
}
