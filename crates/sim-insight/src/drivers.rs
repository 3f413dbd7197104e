//! Causal attribution of index swings.
//!
//! When an index moved by at least the significance threshold, the analysis
//! ranks every candidate cause (delay-0 decisions, matured delayed effects,
//! active events) by the absolute size of its contribution and returns the
//! top three with each one's share of the total variation. Shares can
//! exceed 100% or be negative when causes partially cancel; that reflects
//! real cancellation and is reported as-is.

use serde::{Deserialize, Serialize};

use sim_core::{Contribution, ContributionSource, EffectKind, IndexId};

/// One attributed cause of an index swing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub label: String,
    pub source: ContributionSource,
    /// Absolute contribution in index points.
    pub contribution: f64,
    /// Percentage share of the total variation; not clamped.
    pub share_pct: f64,
}

/// How many drivers are reported at most.
const TOP_DRIVERS: usize = 3;

/// Attribute a variation on `index` to its top candidate causes.
///
/// Below `min_variation` the swing is considered noise-sized and no driver
/// is guessed: the result is empty. Relative-kind contributions are
/// converted to absolute terms against the previous value.
pub fn analyze_drivers(
    index: IndexId,
    previous: f64,
    current: f64,
    candidates: &[Contribution],
    min_variation: f64,
) -> Vec<Driver> {
    let variation = current - previous;
    if variation.abs() < min_variation {
        return Vec::new();
    }

    let mut drivers: Vec<Driver> = candidates
        .iter()
        .filter(|c| c.target == index)
        .filter(|c| !matches!(c.source, ContributionSource::MarketNoise))
        .map(|c| {
            let contribution = match c.kind {
                EffectKind::Absolute => c.amount,
                EffectKind::Relative => c.amount * previous,
            };
            let share_pct = if variation != 0.0 {
                contribution / variation * 100.0
            } else {
                0.0
            };
            Driver {
                label: c.label.clone(),
                source: c.source.clone(),
                contribution,
                share_pct,
            }
        })
        .collect();

    drivers.sort_by(|a, b| {
        b.contribution
            .abs()
            .partial_cmp(&a.contribution.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    drivers.truncate(TOP_DRIVERS);
    drivers
}
