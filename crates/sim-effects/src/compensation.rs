//! Post-maturity effect tracking and escalating-cost compensation.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use sim_core::{
    Contribution, ContributionSource, DelayedEffect, EffectsQueue, EngineConstants,
};

use crate::scheduler::apply_decay;

/// Lifecycle of an applied effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectStatus {
    /// Remaining influence above the depletion threshold.
    Active,
    /// Faded below the threshold; economically negligible.
    Depleted,
    /// Reversed by the player; permanently inert.
    Compensated,
}

/// Errors raised when applying a compensation.
#[derive(Debug, Error, PartialEq)]
pub enum CompensationError {
    #[error("no applied effect with id {0}")]
    UnknownEffect(String),
    #[error("effect {effect} is {status:?} and can no longer be compensated")]
    NotViable {
        effect: String,
        status: EffectStatus,
    },
    #[error("compensation costs {cost} but only {available} is budgeted")]
    InsufficientBudget { cost: Decimal, available: Decimal },
}

/// Status of an applied effect at `at_turn`.
pub fn effect_status(
    effect: &DelayedEffect,
    at_turn: u32,
    depletion_threshold: f64,
) -> EffectStatus {
    if effect.compensated {
        EffectStatus::Compensated
    } else if apply_decay(effect, at_turn).abs() >= depletion_threshold {
        EffectStatus::Active
    } else {
        EffectStatus::Depleted
    }
}

/// Cost of reversing an effect `turns_elapsed` turns after it applied:
/// base × (1 + rate × elapsed), clamped to cap × base. Monotonically
/// non-decreasing in elapsed turns and never unbounded.
pub fn compensation_cost(
    base_cost: Decimal,
    turns_elapsed: u32,
    rate: f64,
    cap_multiplier: f64,
) -> Decimal {
    let multiplier = (1.0 + rate * turns_elapsed as f64).min(cap_multiplier);
    base_cost * Decimal::from_f64(multiplier).unwrap_or(Decimal::ONE)
}

/// A priced offer to reverse one applied effect now.
#[derive(Clone, Debug, PartialEq)]
pub struct CompensationOption {
    pub effect_id: String,
    pub status: EffectStatus,
    /// Remaining (decayed) influence the compensation would remove.
    pub remaining_magnitude: f64,
    pub cost: Decimal,
    /// False once the effect has faded below the depletion threshold:
    /// you cannot pay to cancel an effect that is already gone.
    pub viable: bool,
}

/// Price the reversal of an applied effect at `at_turn`.
pub fn compensation_option(
    effect: &DelayedEffect,
    at_turn: u32,
    constants: &EngineConstants,
) -> CompensationOption {
    let status = effect_status(effect, at_turn, constants.depletion_threshold);
    let remaining = apply_decay(effect, at_turn);
    let base = constants.compensation_base_per_point
        * Decimal::from_f64(effect.magnitude.abs()).unwrap_or(Decimal::ZERO);
    let elapsed = at_turn.saturating_sub(effect.applies_at_turn);
    let cost = compensation_cost(
        base,
        elapsed,
        constants.compensation_cost_rate,
        constants.compensation_cost_cap,
    );
    CompensationOption {
        effect_id: effect.id.clone(),
        status,
        remaining_magnitude: remaining,
        cost,
        viable: status == EffectStatus::Active,
    }
}

/// Result of an applied compensation.
#[derive(Clone, Debug, PartialEq)]
pub struct CompensationOutcome {
    /// Queue with the effect marked compensated.
    pub queue: EffectsQueue,
    /// Counter-delta removing the effect's remaining influence, to be
    /// stacked in the turn being resolved.
    pub counter: Contribution,
    pub cost: Decimal,
    pub budget_after: Decimal,
}

/// Reverse a still-viable applied effect: charge the escalated cost against
/// the budget and emit the counter-delta. Irreversible.
pub fn apply_compensation(
    queue: EffectsQueue,
    effect_id: &str,
    at_turn: u32,
    budget: Decimal,
    constants: &EngineConstants,
) -> Result<CompensationOutcome, CompensationError> {
    let effect = queue
        .find_applied(effect_id)
        .ok_or_else(|| CompensationError::UnknownEffect(effect_id.to_string()))?;

    let option = compensation_option(effect, at_turn, constants);
    if !option.viable {
        return Err(CompensationError::NotViable {
            effect: effect_id.to_string(),
            status: option.status,
        });
    }
    if option.cost > budget {
        return Err(CompensationError::InsufficientBudget {
            cost: option.cost,
            available: budget,
        });
    }

    let counter = Contribution {
        target: effect.target,
        product: effect.product.clone(),
        amount: -option.remaining_magnitude,
        kind: effect.kind,
        source: ContributionSource::Compensation(effect_id.to_string()),
        label: format!("compensation of {}", effect.description),
    };

    let mut queue = queue;
    for e in queue.applied.iter_mut() {
        if e.id == effect_id {
            e.compensated = true;
        }
    }
    info!(effect = effect_id, cost = %option.cost, "effect compensated");

    Ok(CompensationOutcome {
        queue,
        counter,
        cost: option.cost,
        budget_after: budget - option.cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::{Domain, EffectKind, IndexId};

    fn applied_effect(magnitude: f64, decay: f64) -> DelayedEffect {
        DelayedEffect {
            id: "eff:1:1".to_string(),
            decision_id: "dec:1:1".to_string(),
            domain: Domain::Operations,
            target: IndexId::OperationalQuality,
            product: None,
            magnitude,
            kind: EffectKind::Absolute,
            created_turn: 1,
            applies_at_turn: 3,
            decay_rate: decay,
            applied: true,
            compensated: false,
            description: "capacity cut".to_string(),
        }
    }

    fn constants() -> EngineConstants {
        EngineConstants::default()
    }

    #[test]
    fn status_tracks_decay_against_threshold() {
        let e = applied_effect(2.0, 0.5);
        let c = constants();
        // 2.0, 1.0, 0.5, 0.25 — depletion threshold is 0.5.
        assert_eq!(effect_status(&e, 3, c.depletion_threshold), EffectStatus::Active);
        assert_eq!(effect_status(&e, 5, c.depletion_threshold), EffectStatus::Active);
        assert_eq!(
            effect_status(&e, 6, c.depletion_threshold),
            EffectStatus::Depleted
        );
    }

    #[test]
    fn cost_escalates_then_hits_the_ceiling() {
        let base = Decimal::new(100_000, 0);
        let c0 = compensation_cost(base, 0, 0.25, 3.0);
        let c2 = compensation_cost(base, 2, 0.25, 3.0);
        let c8 = compensation_cost(base, 8, 0.25, 3.0);
        let c20 = compensation_cost(base, 20, 0.25, 3.0);
        assert_eq!(c0, base);
        assert_eq!(c2, Decimal::new(150_000, 0));
        assert_eq!(c8, Decimal::new(300_000, 0));
        // Capped at 3× base regardless of elapsed turns.
        assert_eq!(c20, c8);
    }

    #[test]
    fn depleted_effect_is_not_viable() {
        let e = applied_effect(1.0, 0.9);
        let option = compensation_option(&e, 10, &constants());
        assert_eq!(option.status, EffectStatus::Depleted);
        assert!(!option.viable);
        let err = apply_compensation(
            EffectsQueue {
                pending: vec![],
                applied: vec![e],
            },
            "eff:1:1",
            10,
            Decimal::new(10_000_000, 0),
            &constants(),
        )
        .unwrap_err();
        assert!(matches!(err, CompensationError::NotViable { .. }));
    }

    #[test]
    fn compensation_charges_budget_and_emits_counter() {
        let e = applied_effect(4.0, 0.15);
        let queue = EffectsQueue {
            pending: vec![],
            applied: vec![e.clone()],
        };
        let budget = Decimal::new(2_000_000, 0);
        let outcome =
            apply_compensation(queue, "eff:1:1", 4, budget, &constants()).unwrap();
        // One turn elapsed: remaining = 4 × 0.85.
        assert!((outcome.counter.amount + 4.0 * 0.85).abs() < 1e-12);
        assert_eq!(outcome.counter.target, IndexId::OperationalQuality);
        assert_eq!(outcome.budget_after, budget - outcome.cost);
        assert!(outcome.queue.find_applied("eff:1:1").unwrap().compensated);

        // A compensated effect cannot be compensated again.
        let again = apply_compensation(
            outcome.queue,
            "eff:1:1",
            4,
            outcome.budget_after,
            &constants(),
        );
        assert!(matches!(
            again,
            Err(CompensationError::NotViable {
                status: EffectStatus::Compensated,
                ..
            })
        ));
    }

    #[test]
    fn insufficient_budget_is_refused() {
        let e = applied_effect(4.0, 0.15);
        let queue = EffectsQueue {
            pending: vec![],
            applied: vec![e],
        };
        let err = apply_compensation(queue, "eff:1:1", 3, Decimal::new(10, 0), &constants())
            .unwrap_err();
        assert!(matches!(err, CompensationError::InsufficientBudget { .. }));
    }

    #[test]
    fn unknown_effect_is_refused() {
        let err = apply_compensation(
            EffectsQueue::default(),
            "eff:9:9",
            3,
            Decimal::new(1_000_000, 0),
            &constants(),
        )
        .unwrap_err();
        assert_eq!(err, CompensationError::UnknownEffect("eff:9:9".to_string()));
    }

    proptest! {
        #[test]
        fn cost_is_monotone_and_bounded(elapsed in 0u32..50, base in 1i64..10_000_000) {
            let base = Decimal::new(base, 0);
            let cost = compensation_cost(base, elapsed, 0.25, 3.0);
            let next = compensation_cost(base, elapsed + 1, 0.25, 3.0);
            prop_assert!(next >= cost);
            prop_assert!(cost <= base * Decimal::new(3, 0));
            prop_assert!(cost >= base);
        }
    }
}
