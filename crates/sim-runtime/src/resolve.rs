//! The turn resolution pipeline.
//!
//! One atomic, pure function over (prior state, decisions, events,
//! compensations, configuration, seed). It either returns a complete
//! outcome or an error; partial results are never produced and the prior
//! state is never mutated.

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use sim_core::{
    validate_decision, CompanyVariables, Contribution, ContributionSource, Decision, Difficulty,
    EngineConfig, GameEvent, GameSpeed, IndexId, LeverBinding, TurnState, ValidationError,
};
use sim_econ::{aggregate_indices, aggregate_pnl, calculate_pnl, market_noise, premium_weights};
use sim_econ::EconError;
use sim_effects::{
    apply_compensation, create_delayed_effect, drain_due, effect_delay, stack_effects,
    CompensationError, EffectParams, EFFECTIVE_ZERO,
};
use sim_insight::{analyze_drivers, detect_alerts};

use crate::feedback::{CapReport, MajorVariation, TurnFeedback, TurnSummary};

/// Everything a resolution consumes. The engine reads these and nothing
/// else; loading them is the collaborator's business.
#[derive(Clone, Debug)]
pub struct ResolveInput<'a> {
    pub state: &'a TurnState,
    pub decisions: &'a [Decision],
    pub events: &'a [GameEvent],
    /// Ids of applied effects to compensate this turn.
    pub compensations: &'a [String],
    pub config: &'a EngineConfig,
    pub speed: GameSpeed,
    pub difficulty: Difficulty,
    pub seed: u64,
}

/// A completed resolution: the next snapshot and the player feedback.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    pub state: TurnState,
    pub feedback: TurnFeedback,
}

/// Errors a resolution can raise. All are reported before the new state
/// exists; a failed resolution leaves no trace.
#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Compensation(#[from] CompensationError),
    #[error(transparent)]
    Noise(#[from] EconError),
}

/// Turns are quarters; the campaign calendar advances three months per turn.
fn advance_quarter(date: NaiveDate) -> NaiveDate {
    let mut y = date.year();
    let mut m = date.month() as i32 + 3;
    y += (m - 1) / 12;
    m = (m - 1) % 12 + 1;
    let month = u32::try_from(m).unwrap_or(1);
    NaiveDate::from_ymd_opt(y, month, date.day()).unwrap_or(date)
}

/// Replace a Decimal variable, returning the f64 change that was applied.
fn set_dec(field: &mut Decimal, value: f64) -> f64 {
    let current = field.to_f64().unwrap_or(0.0);
    *field = Decimal::from_f64(value).unwrap_or(*field);
    value - current
}

/// Apply a lever's variable binding and return the applied change, which
/// both the effect magnitude and the lever cost are computed from.
fn apply_binding(vars: &mut CompanyVariables, binding: LeverBinding, value: f64) -> f64 {
    match binding {
        LeverBinding::SetPricingLevel => {
            let delta = value - vars.pricing_level;
            vars.pricing_level = value;
            delta
        }
        LeverBinding::SetAcquisitionSpend => set_dec(&mut vars.acquisition_spend, value),
        LeverBinding::AddStaff => {
            vars.staff_count = (vars.staff_count + value).max(0.0);
            value
        }
        LeverBinding::SetTrainingSpend => set_dec(&mut vars.training_spend, value),
        LeverBinding::AddAutomation => {
            vars.automation_level = (vars.automation_level + value).clamp(0.0, 100.0);
            value
        }
        LeverBinding::AddDataQuality => {
            vars.data_quality = (vars.data_quality + value).clamp(0.0, 100.0);
            value
        }
        LeverBinding::AddItMaturity => {
            vars.it_maturity = (vars.it_maturity + value).clamp(0.0, 100.0);
            value
        }
        LeverBinding::AddClaimsCapacity => {
            vars.claims_capacity = (vars.claims_capacity + value).max(0.0);
            value
        }
        LeverBinding::AddComplianceEffort => {
            vars.compliance_effort = (vars.compliance_effort + value).clamp(0.0, 100.0);
            value
        }
        LeverBinding::SetInvestmentYield => {
            let delta = value - vars.investment_yield;
            vars.investment_yield = value;
            delta
        }
        LeverBinding::SetReinsuranceShare => {
            let delta = value - vars.reinsurance_share;
            vars.reinsurance_share = value;
            delta
        }
    }
}

/// Resolve one turn. Deterministic: identical inputs and seed produce an
/// identical outcome.
pub fn resolve_turn(input: ResolveInput<'_>) -> Result<TurnOutcome, ResolveError> {
    let state = input.state;
    let turn = state
        .turn
        .checked_add(1)
        .ok_or(ValidationError::TurnOutOfRange(state.turn))?;

    // Reject malformed input before touching anything.
    for decision in input.decisions {
        validate_decision(decision, input.config, state)?;
    }

    let constants = &input.config.constants;
    let mut queue = state.queue.clone();
    let mut budget = state.budget;
    let mut products = state.products.clone();
    let mut contributions: Vec<Contribution> = Vec::new();
    let mut lever_costs = Decimal::ZERO;

    // Compensations of past effects come first; each charges its
    // escalated cost and contributes a counter-delta.
    for effect_id in input.compensations {
        let outcome = apply_compensation(queue, effect_id, turn, budget, constants)?;
        queue = outcome.queue;
        budget = outcome.budget_after;
        contributions.push(outcome.counter);
    }

    // Decisions: apply variable bindings, then convert each applied change
    // into an immediate contribution or a queued delayed effect.
    for decision in input.decisions {
        let Some(lever) = input.config.lever(&decision.lever) else {
            continue; // unreachable after validation
        };
        let rules = input.config.domain_rules(lever.domain);
        let delay = effect_delay(rules, input.speed);

        for product in products.iter_mut() {
            if let Some(target) = &decision.product {
                if &product.id != target {
                    continue;
                }
            }
            let change = apply_binding(&mut product.vars, lever.binding, decision.value);
            if !change.is_finite() || change.abs() < EFFECTIVE_ZERO {
                continue;
            }
            lever_costs +=
                lever.cost_per_unit * Decimal::from_f64(change.abs()).unwrap_or(Decimal::ZERO);
            let magnitude = lever.impact_per_unit * change;
            if delay == 0 {
                contributions.push(Contribution {
                    target: lever.target,
                    product: Some(product.id.clone()),
                    amount: magnitude,
                    kind: lever.kind,
                    source: ContributionSource::Decision(decision.id.clone()),
                    label: lever.label.clone(),
                });
            } else if let Some(effect) = create_delayed_effect(
                EffectParams {
                    decision_id: decision.id.clone(),
                    domain: lever.domain,
                    target: lever.target,
                    product: Some(product.id.clone()),
                    magnitude,
                    kind: lever.kind,
                    description: lever.label.clone(),
                    current_turn: turn,
                },
                rules,
                input.speed,
                queue.total_len() + 1,
            ) {
                queue.pending.push(effect);
            }
        }
    }

    // Mature everything due this turn, in one transaction.
    let (drained, matured) = drain_due(queue, turn);
    queue = drained;
    for effect in &matured {
        contributions.push(Contribution {
            target: effect.target,
            product: effect.product.clone(),
            amount: effect.magnitude,
            kind: effect.kind,
            source: ContributionSource::Matured(effect.id.clone()),
            label: effect.description.clone(),
        });
    }

    // External events touch every product.
    for event in input.events {
        for impact in &event.impacts {
            contributions.push(Contribution {
                target: impact.target,
                product: None,
                amount: impact.amount,
                kind: impact.kind,
                source: ContributionSource::Event(event.id.clone()),
                label: event.label.clone(),
            });
        }
    }

    // Bounded market noise, the engine's only randomness.
    let amplitude = constants.market_noise_max * input.difficulty.noise_scale();
    contributions.extend(market_noise(input.seed, turn, amplitude)?);

    // Stack, cap, and apply per product; recompute each product's P&L.
    let mut cap_reports: Vec<CapReport> = Vec::new();
    for product in products.iter_mut() {
        let local: Vec<Contribution> = contributions
            .iter()
            .filter(|c| c.applies_to(&product.id))
            .cloned()
            .collect();
        let stacked = stack_effects(&local, &product.indices, constants.relative_effect_cap);
        for delta in &stacked {
            let current = product.indices.get(delta.target);
            product.indices.set(delta.target, current + delta.applied);
            if delta.cap_triggered {
                cap_reports.push(CapReport {
                    product: product.id.clone(),
                    target: delta.target,
                    raw: delta.raw,
                    applied: delta.applied,
                    limit: delta.limit,
                });
            }
        }
        product.pnl = calculate_pnl(&product.vars);
    }

    // Roll products up into the global view.
    let weights = premium_weights(&products);
    let indices =
        aggregate_indices(&products, &weights).unwrap_or_else(|| state.indices.clone());
    let pnl = aggregate_pnl(&products, &weights).unwrap_or_else(|| state.pnl.clone());

    // Budget: credit every product's result, debit lever costs.
    // Compensation costs were already debited above.
    for product in &products {
        budget += product.pnl.result;
    }
    budget -= lever_costs;

    let alerts = detect_alerts(&indices, &pnl, input.config, input.difficulty);

    let mut major_variations = Vec::new();
    let mut indices_improved = Vec::new();
    let mut indices_degraded = Vec::new();
    for id in IndexId::ALL {
        let previous = state.indices.get(id);
        let current = indices.get(id);
        let delta = current - previous;
        if delta > 1e-9 {
            indices_improved.push(id);
        } else if delta < -1e-9 {
            indices_degraded.push(id);
        }
        if delta.abs() >= constants.driver_min_variation {
            let drivers = analyze_drivers(
                id,
                previous,
                current,
                &contributions,
                constants.driver_min_variation,
            );
            major_variations.push(MajorVariation {
                index: id,
                previous,
                current,
                delta,
                drivers,
            });
        }
    }

    let feedback = TurnFeedback {
        turn,
        major_variations,
        summary: TurnSummary {
            decisions_applied: input.decisions.len(),
            indices_improved,
            indices_degraded,
            pnl_delta: pnl.result - state.pnl.result,
        },
        alerts,
        cap_reports,
    };

    let next = TurnState {
        turn,
        date: advance_quarter(state.date),
        budget,
        indices,
        pnl,
        products,
        queue,
    };
    info!(turn, decisions = input.decisions.len(), "turn resolved");

    Ok(TurnOutcome {
        state: next,
        feedback,
    })
}
