#![deny(warnings)]

//! Temporal effect model for Assur Tycoon.
//!
//! Decisions do not change indices directly: they produce effects that
//! mature after a domain/speed-dependent delay, decay exponentially once
//! applied, stack against other simultaneous causes under a relative cap,
//! and can be reversed later at an escalating cost ("compensation").

pub mod compensation;
pub mod scheduler;
pub mod stacking;

pub use compensation::{
    apply_compensation, compensation_cost, compensation_option, effect_status,
    CompensationError, CompensationOption, CompensationOutcome, EffectStatus,
};
pub use scheduler::{apply_decay, create_delayed_effect, drain_due, effect_delay, EffectParams};
pub use stacking::{apply_cap, resolve_amount, stack_effects, StackedDelta};

/// Magnitudes below this are treated as zero; no effect is scheduled.
pub const EFFECTIVE_ZERO: f64 = 1e-6;
