#![deny(warnings)]

//! Economic calculators for Assur Tycoon.
//!
//! This crate provides the pure formula layer of the engine:
//! - The seven index calculators with division-by-zero guards and clamps
//! - The P&L statement, with its accounting identity by construction
//! - Seeded, bounded market noise
//! - Premium-share weighted multi-product aggregation

use thiserror::Error;

pub mod aggregate;
pub mod indices;
pub mod noise;
pub mod pnl;

pub use aggregate::{aggregate_indices, aggregate_pnl, premium_weights};
pub use indices::{calculate_indices, initialize_product_indices};
pub use noise::market_noise;
pub use pnl::{calculate_pnl, expense_ratio, loss_ratio};

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Amplitudes and ratios must be finite and non-negative.
    #[error("non-finite numeric value encountered")]
    NonFinite,
}
