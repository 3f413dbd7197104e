//! Delayed effect creation, decay, and one-shot maturation.

use tracing::debug;

use sim_core::{
    DelayedEffect, Domain, DomainRules, EffectKind, EffectsQueue, GameSpeed, IndexId, ProductId,
};

use crate::EFFECTIVE_ZERO;

/// Inputs for scheduling one effect from a resolved decision.
#[derive(Clone, Debug)]
pub struct EffectParams {
    pub decision_id: String,
    pub domain: Domain,
    pub target: IndexId,
    /// Product scope; `None` applies to every active product.
    pub product: Option<ProductId>,
    pub magnitude: f64,
    pub kind: EffectKind,
    pub description: String,
    pub current_turn: u32,
}

/// Turns until an effect from this domain matures at the given speed.
/// Rounded to the nearest whole turn, never below 0; a delay of 0 means
/// the effect applies immediately and bypasses the queue.
pub fn effect_delay(rules: &DomainRules, speed: GameSpeed) -> u32 {
    let scaled = rules.base_delay_turns * speed.delay_multiplier();
    scaled.round().max(0.0) as u32
}

/// Build a delayed effect for a decision, or `None` when the magnitude is
/// effectively zero (such a decision leaves no trace on the index).
/// `sequence` disambiguates effects created in the same turn; ids are
/// deterministic so replays reproduce them.
pub fn create_delayed_effect(
    params: EffectParams,
    rules: &DomainRules,
    speed: GameSpeed,
    sequence: usize,
) -> Option<DelayedEffect> {
    if !params.magnitude.is_finite() || params.magnitude.abs() < EFFECTIVE_ZERO {
        return None;
    }
    let delay = effect_delay(rules, speed);
    let effect = DelayedEffect {
        id: format!("eff:{}:{}", params.current_turn, sequence),
        decision_id: params.decision_id,
        domain: params.domain,
        target: params.target,
        product: params.product,
        magnitude: params.magnitude,
        kind: params.kind,
        created_turn: params.current_turn,
        applies_at_turn: params.current_turn + delay,
        decay_rate: rules.decay_rate,
        applied: false,
        compensated: false,
        description: params.description,
    };
    debug!(
        id = %effect.id,
        target = %effect.target,
        delay,
        "delayed effect scheduled"
    );
    Some(effect)
}

/// Remaining influence of an effect at `at_turn`:
/// magnitude × (1 − decay_rate)^(turns since maturity).
/// Elapsed turns floor at 0 (no anticipatory decay) and the decay factor
/// is clamped into [0,1], so the result never changes sign or grows.
pub fn apply_decay(effect: &DelayedEffect, at_turn: u32) -> f64 {
    let elapsed = at_turn.saturating_sub(effect.applies_at_turn);
    let factor = (1.0 - effect.decay_rate).clamp(0.0, 1.0).powi(elapsed as i32);
    effect.magnitude * factor
}

/// Drain all effects due at `turn` from the queue in one transaction:
/// each due effect is marked applied and moved into the applied history,
/// so it can never apply twice and never apply partially.
///
/// An effect is due iff `applies_at_turn == turn && !applied`.
pub fn drain_due(queue: EffectsQueue, turn: u32) -> (EffectsQueue, Vec<DelayedEffect>) {
    let mut pending = Vec::with_capacity(queue.pending.len());
    let mut due = Vec::new();
    for effect in queue.pending {
        if effect.applies_at_turn == turn && !effect.applied {
            let mut matured = effect;
            matured.applied = true;
            due.push(matured);
        } else {
            pending.push(effect);
        }
    }
    let mut applied = queue.applied;
    applied.extend(due.iter().cloned());
    (EffectsQueue { pending, applied }, due)
}
