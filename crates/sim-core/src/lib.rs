#![deny(warnings)]

//! Core domain models and invariants for Assur Tycoon.
//!
//! This crate defines the serializable types shared across the simulation:
//! the seven company health indices, the P&L statement, company variables,
//! decisions, delayed effects, and the externally-loaded configuration
//! tables, with validation helpers to guarantee basic invariants.

pub mod config;
pub mod decision;
pub mod effect;
pub mod error;
pub mod state;

pub use config::{
    AlertThresholds, ConfigError, Domain, DomainRules, EngineConfig, EngineConstants,
    LeverBinding, LeverConfig,
};
pub use decision::{validate_decision, Decision};
pub use effect::{Contribution, ContributionSource, DelayedEffect, EffectKind, EffectsQueue};
pub use error::ValidationError;
pub use state::{
    clamp_index, CompanyVariables, Difficulty, EventImpact, GameEvent, GameSpeed, IndexId,
    IndicesState, PnLState, ProductId, ProductLine, TurnPhase, TurnState,
};

/// Version tag stored with every session. A session whose stored version
/// differs from the running engine must never be recomputed: histories
/// produced by different versions are not comparable.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
