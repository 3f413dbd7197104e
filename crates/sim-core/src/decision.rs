//! Player decisions and their validation against the configuration tables.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::ValidationError;
use crate::state::{ProductId, TurnState};

/// One decision submitted during the Decisions phase and consumed once at
/// Resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    /// Lever id, resolved against the configuration's lever table.
    pub lever: String,
    pub value: f64,
    /// Target product; `None` applies portfolio-wide.
    pub product: Option<ProductId>,
}

/// Validate a decision against the lever table and the current state.
/// Rejection happens before any state mutation.
pub fn validate_decision(
    decision: &Decision,
    config: &EngineConfig,
    state: &TurnState,
) -> Result<(), ValidationError> {
    let lever = config
        .lever(&decision.lever)
        .ok_or_else(|| ValidationError::UnknownLever(decision.lever.clone()))?;

    if !decision.value.is_finite() {
        return Err(ValidationError::NonFinite);
    }
    if decision.value < lever.min_value || decision.value > lever.max_value {
        return Err(ValidationError::ValueOutOfRange {
            lever: decision.lever.clone(),
            value: decision.value,
            min: lever.min_value,
            max: lever.max_value,
        });
    }
    if let Some(product) = &decision.product {
        let rules = config.domain_rules(lever.domain);
        if rules.shared {
            return Err(ValidationError::SharedDomainTargeted {
                lever: decision.lever.clone(),
                domain: lever.domain,
            });
        }
        if state.product(product).is_none() {
            return Err(ValidationError::UnknownProduct(product.0.clone()));
        }
    }
    Ok(())
}
