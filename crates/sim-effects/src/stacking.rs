//! Stacking of simultaneous effects and the relative cap.

use std::collections::BTreeMap;

use tracing::debug;

use sim_core::{Contribution, EffectKind, IndexId, IndicesState};

/// The combined per-index delta for one turn, before and after capping.
#[derive(Clone, Debug, PartialEq)]
pub struct StackedDelta {
    pub target: IndexId,
    /// Net signed sum of all contributions.
    pub raw: f64,
    /// Delta actually applied, after the relative cap.
    pub applied: f64,
    /// Cap limit that was in force (fraction × current value).
    pub limit: f64,
    pub cap_triggered: bool,
}

/// Resolve one contribution to an absolute delta: Relative kinds are
/// fractions of the index's current (pre-turn) value.
pub fn resolve_amount(contribution: &Contribution, current: f64) -> f64 {
    let amount = match contribution.kind {
        EffectKind::Absolute => contribution.amount,
        EffectKind::Relative => contribution.amount * current,
    };
    if amount.is_finite() {
        amount
    } else {
        0.0
    }
}

/// Sign-preserving clamp of a summed per-index delta to `cap × current`.
/// The cap binds the net sum, not individual contributions: independent
/// small effects can combine to trigger it, and large opposing effects
/// whose net is small pass untouched.
pub fn apply_cap(stacked: f64, current: f64, cap: f64) -> (f64, bool) {
    let limit = (cap * current).abs();
    if stacked.abs() <= limit {
        (stacked, false)
    } else {
        (limit.copysign(stacked), true)
    }
}

/// Group all simultaneous contributions by target index, sum them (resolving
/// Relative kinds against current values), and cap each net sum once.
/// Returns one entry per touched index in canonical index order.
pub fn stack_effects(
    contributions: &[Contribution],
    indices: &IndicesState,
    cap: f64,
) -> Vec<StackedDelta> {
    let mut sums: BTreeMap<IndexId, f64> = BTreeMap::new();
    for c in contributions {
        let current = indices.get(c.target);
        *sums.entry(c.target).or_insert(0.0) += resolve_amount(c, current);
    }
    sums.into_iter()
        .map(|(target, raw)| {
            let current = indices.get(target);
            let (applied, cap_triggered) = apply_cap(raw, current, cap);
            if cap_triggered {
                debug!(%target, raw, applied, "relative cap triggered");
            }
            StackedDelta {
                target,
                raw,
                applied,
                limit: (cap * current).abs(),
                cap_triggered,
            }
        })
        .collect()
}
