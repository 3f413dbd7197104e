//! Validation errors shared across the engine boundary.

use thiserror::Error;

use crate::config::Domain;
use crate::state::TurnPhase;

/// A malformed decision or out-of-range turn number. Raised before any
/// state mutation; a rejected input leaves the prior state untouched.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("unknown lever: {0}")]
    UnknownLever(String),
    #[error("value {value} out of range [{min}, {max}] for lever {lever}")]
    ValueOutOfRange {
        lever: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("non-finite numeric value encountered")]
    NonFinite,
    #[error("unknown product: {0}")]
    UnknownProduct(String),
    #[error("lever {lever} belongs to shared domain {domain:?} and cannot target one product")]
    SharedDomainTargeted { lever: String, domain: Domain },
    #[error("turn number {0} is out of range")]
    TurnOutOfRange(u32),
    #[error("decisions can only be changed in the Decisions phase (current: {0:?})")]
    NotInDecisionsPhase(TurnPhase),
}
