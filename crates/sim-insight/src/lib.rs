#![deny(warnings)]

//! Read-only analyses over resolved turns: threshold alerts and causal
//! attribution of index swings. Nothing here mutates state; both analyses
//! annotate a resolution result for the feedback layer.

pub mod alerts;
pub mod drivers;

pub use alerts::{detect_alerts, Alert, Severity};
pub use drivers::{analyze_drivers, Driver};
