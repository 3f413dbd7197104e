#![deny(warnings)]

//! Turn orchestration for Assur Tycoon.
//!
//! A turn walks a strict phase sequence (Dashboard → Events → Decisions →
//! Resolution → Feedback). Resolution is one atomic, pure function call
//! into the calculation pipeline; the session layer wraps it with the
//! engine-version guard, the at-most-one-in-flight rule, and
//! persist-after-apply ordering against the append-only store.

pub mod feedback;
pub mod phase;
pub mod resolve;
pub mod session;

pub use feedback::{CapReport, MajorVariation, TurnFeedback, TurnSummary};
pub use phase::{PhaseError, TurnInstance};
pub use resolve::{resolve_turn, ResolveError, ResolveInput, TurnOutcome};
pub use session::{Session, SessionError};
