//! Delayed effects, the effects queue, and per-turn index contributions.

use serde::{Deserialize, Serialize};

use crate::config::Domain;
use crate::state::{IndexId, ProductId};

/// How an effect's magnitude is interpreted when applied to an index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Magnitude is added to the index as-is.
    Absolute,
    /// Magnitude is a fraction of the index's current value.
    Relative,
}

/// A scheduled future change to one index, created by a decision and
/// maturing after a domain/speed-dependent delay. Immutable once matured,
/// except for the `applied` and `compensated` flags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DelayedEffect {
    pub id: String,
    /// Decision that created this effect.
    pub decision_id: String,
    pub domain: Domain,
    pub target: IndexId,
    /// Product scope; `None` applies to every active product.
    pub product: Option<ProductId>,
    /// Signed magnitude at maturity, before decay.
    pub magnitude: f64,
    pub kind: EffectKind,
    pub created_turn: u32,
    /// Turn at which the effect matures and is applied.
    pub applies_at_turn: u32,
    /// Per-turn exponential decay of the applied effect's remaining influence.
    pub decay_rate: f64,
    pub applied: bool,
    pub compensated: bool,
    pub description: String,
}

/// Pending and applied delayed effects for one session.
///
/// `applied` is append-only history; `pending` is filtered each turn.
/// The queue is a value: each resolution consumes one queue and produces
/// a new one, so no turn aliases another's effects.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectsQueue {
    pub pending: Vec<DelayedEffect>,
    pub applied: Vec<DelayedEffect>,
}

impl EffectsQueue {
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.applied.is_empty()
    }

    /// Total effects ever scheduled, used for deterministic id generation.
    pub fn total_len(&self) -> usize {
        self.pending.len() + self.applied.len()
    }

    pub fn find_applied(&self, id: &str) -> Option<&DelayedEffect> {
        self.applied.iter().find(|e| e.id == id)
    }
}

/// Where a per-turn index contribution came from. Carried through stacking
/// into driver attribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ContributionSource {
    /// An immediate (delay-0) decision effect; payload is the decision id.
    Decision(String),
    /// A delayed effect that matured this turn; payload is the effect id.
    Matured(String),
    /// An external event impact; payload is the event id.
    Event(String),
    /// A compensation counter-delta; payload is the compensated effect id.
    Compensation(String),
    /// Seeded bounded market noise.
    MarketNoise,
}

/// One simultaneous delta against one index, before stacking and capping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub target: IndexId,
    /// Product scope; `None` applies to every active product.
    pub product: Option<ProductId>,
    pub amount: f64,
    pub kind: EffectKind,
    pub source: ContributionSource,
    pub label: String,
}

impl Contribution {
    /// Whether this contribution applies to the given product.
    pub fn applies_to(&self, product: &ProductId) -> bool {
        match &self.product {
            None => true,
            Some(p) => p == product,
        }
    }
}
