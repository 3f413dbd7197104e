//! Externally-loaded configuration tables.
//!
//! Domain rules, lever definitions, alert thresholds and engine constants
//! are immutable data injected into the engine at construction. A compiled-in
//! default set is provided; operators can swap any table via YAML without
//! touching engine logic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

use crate::effect::EffectKind;
use crate::state::IndexId;

/// Decision domains. Each lever id maps to exactly one domain; the mapping
/// is resolved at configuration-load time, never re-parsed from id strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Domain {
    Pricing,
    Commercial,
    Hr,
    InformationTech,
    Operations,
    Compliance,
    Finance,
}

/// Per-domain scheduling rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainRules {
    /// Turns before an effect from this domain matures, at Medium speed.
    /// A base delay of 0 means effects apply immediately (no queueing).
    pub base_delay_turns: f64,
    /// Per-turn exponential decay of applied effects.
    pub decay_rate: f64,
    /// Shared domains (HR, IT) touch every product; their decisions cannot
    /// target a single product.
    pub shared: bool,
}

/// Which company variable a lever drives, and how the decision value is
/// combined with the current value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeverBinding {
    SetPricingLevel,
    SetAcquisitionSpend,
    AddStaff,
    SetTrainingSpend,
    AddAutomation,
    AddDataQuality,
    AddItMaturity,
    AddClaimsCapacity,
    AddComplianceEffort,
    SetInvestmentYield,
    SetReinsuranceShare,
}

impl LeverBinding {
    /// Whether the decision value replaces the variable (`Set*`) or is added
    /// to it (`Add*`). For `Set*` levers the effect magnitude is computed
    /// from the change, not the absolute value.
    pub fn is_set(self) -> bool {
        matches!(
            self,
            LeverBinding::SetPricingLevel
                | LeverBinding::SetAcquisitionSpend
                | LeverBinding::SetTrainingSpend
                | LeverBinding::SetInvestmentYield
                | LeverBinding::SetReinsuranceShare
        )
    }
}

/// One player-facing lever.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeverConfig {
    pub label: String,
    pub domain: Domain,
    pub binding: LeverBinding,
    /// Index the lever's effect targets.
    pub target: IndexId,
    pub kind: EffectKind,
    /// Index points (or relative fraction) per unit of applied change.
    pub impact_per_unit: f64,
    /// One-off budget cost per unit of applied change.
    pub cost_per_unit: Decimal,
    pub min_value: f64,
    pub max_value: f64,
}

/// Engine-wide numeric constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConstants {
    /// Max single-turn change to an index as a fraction of its current value.
    pub relative_effect_cap: f64,
    /// Compensation cost growth per elapsed turn.
    pub compensation_cost_rate: f64,
    /// Hard ceiling on compensation cost as a multiple of the base cost.
    pub compensation_cost_cap: f64,
    /// Budget cost per index point of remaining magnitude when compensating.
    pub compensation_base_per_point: Decimal,
    /// Decayed magnitude below which an effect is economically depleted.
    pub depletion_threshold: f64,
    /// Minimum |variation| for driver analysis to attribute causes.
    pub driver_min_variation: f64,
    /// Market-noise amplitude per index per turn, at Normal difficulty.
    pub market_noise_max: f64,
    /// Floor applied to denominators in index formulas.
    pub min_denominator: f64,
}

impl Default for EngineConstants {
    fn default() -> Self {
        Self {
            relative_effect_cap: 0.30,
            compensation_cost_rate: 0.25,
            compensation_cost_cap: 3.0,
            compensation_base_per_point: Decimal::new(25_000, 0),
            depletion_threshold: 0.5,
            driver_min_variation: 5.0,
            market_noise_max: 2.0,
            min_denominator: 1e-6,
        }
    }
}

/// Alert thresholds, before difficulty scaling. An index below its warning
/// (resp. critical) level raises a Warning (resp. Critical) alert; derived
/// P&L ratios alarm when they rise above their levels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub index_warning: BTreeMap<IndexId, f64>,
    pub index_critical: BTreeMap<IndexId, f64>,
    pub loss_ratio_warning: f64,
    pub loss_ratio_critical: f64,
    pub expense_ratio_warning: f64,
    pub expense_ratio_critical: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        let mut warning = BTreeMap::new();
        let mut critical = BTreeMap::new();
        for id in IndexId::ALL {
            warning.insert(id, 40.0);
            critical.insert(id, 25.0);
        }
        // Compliance and solvency tolerate less slack than the rest.
        warning.insert(IndexId::Sincerity, 50.0);
        critical.insert(IndexId::Sincerity, 35.0);
        warning.insert(IndexId::FinancialResilience, 45.0);
        critical.insert(IndexId::FinancialResilience, 30.0);
        Self {
            index_warning: warning,
            index_critical: critical,
            loss_ratio_warning: 0.78,
            loss_ratio_critical: 0.92,
            expense_ratio_warning: 0.30,
            expense_ratio_critical: 0.40,
        }
    }
}

/// Full engine configuration: constants plus the swappable domain tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub constants: EngineConstants,
    pub domains: BTreeMap<Domain, DomainRules>,
    pub levers: BTreeMap<String, LeverConfig>,
    pub thresholds: AlertThresholds,
    /// Levers recommended to remediate a degraded index.
    pub remediations: BTreeMap<IndexId, Vec<String>>,
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("configuration parse error: {0}")]
    Parse(String),
    #[error("lever {lever} references domain {domain:?} with no rules entry")]
    MissingDomain { lever: String, domain: Domain },
    #[error("lever {lever} has an empty or inverted value range")]
    BadRange { lever: String },
    #[error("domain {0:?} has a negative delay or a decay rate outside [0,1]")]
    BadDomainRules(Domain),
}

impl EngineConfig {
    /// Parse a configuration from YAML and validate cross-references.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig =
            serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        info!(
            levers = cfg.levers.len(),
            domains = cfg.domains.len(),
            "engine configuration loaded"
        );
        Ok(cfg)
    }

    /// Cross-reference validation: every lever's domain must have rules,
    /// ranges must be ordered, domain rules must be sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (domain, rules) in &self.domains {
            if rules.base_delay_turns < 0.0
                || !rules.base_delay_turns.is_finite()
                || !(0.0..=1.0).contains(&rules.decay_rate)
            {
                return Err(ConfigError::BadDomainRules(*domain));
            }
        }
        for (id, lever) in &self.levers {
            if !self.domains.contains_key(&lever.domain) {
                return Err(ConfigError::MissingDomain {
                    lever: id.clone(),
                    domain: lever.domain,
                });
            }
            if !(lever.min_value < lever.max_value)
                || !lever.min_value.is_finite()
                || !lever.max_value.is_finite()
            {
                return Err(ConfigError::BadRange { lever: id.clone() });
            }
        }
        Ok(())
    }

    pub fn lever(&self, id: &str) -> Option<&LeverConfig> {
        self.levers.get(id)
    }

    pub fn domain_rules(&self, domain: Domain) -> &DomainRules {
        // Guaranteed by validate(); the default table covers every domain.
        &self.domains[&domain]
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut domains = BTreeMap::new();
        domains.insert(
            Domain::Pricing,
            DomainRules {
                base_delay_turns: 1.0,
                decay_rate: 0.20,
                shared: false,
            },
        );
        domains.insert(
            Domain::Commercial,
            DomainRules {
                base_delay_turns: 1.0,
                decay_rate: 0.25,
                shared: false,
            },
        );
        domains.insert(
            Domain::Hr,
            DomainRules {
                base_delay_turns: 2.0,
                decay_rate: 0.10,
                shared: true,
            },
        );
        domains.insert(
            Domain::InformationTech,
            DomainRules {
                base_delay_turns: 3.0,
                decay_rate: 0.05,
                shared: true,
            },
        );
        domains.insert(
            Domain::Operations,
            DomainRules {
                base_delay_turns: 2.0,
                decay_rate: 0.15,
                shared: false,
            },
        );
        domains.insert(
            Domain::Compliance,
            DomainRules {
                base_delay_turns: 2.0,
                decay_rate: 0.10,
                shared: false,
            },
        );
        // Financial posture moves take hold within the turn.
        domains.insert(
            Domain::Finance,
            DomainRules {
                base_delay_turns: 0.0,
                decay_rate: 0.20,
                shared: false,
            },
        );

        let mut levers = BTreeMap::new();
        levers.insert(
            "pricing.premium_level".to_string(),
            LeverConfig {
                label: "Premium level vs market".to_string(),
                domain: Domain::Pricing,
                binding: LeverBinding::SetPricingLevel,
                target: IndexId::CommercialAttractiveness,
                kind: EffectKind::Absolute,
                impact_per_unit: -40.0,
                cost_per_unit: Decimal::ZERO,
                min_value: 0.80,
                max_value: 1.30,
            },
        );
        levers.insert(
            "commercial.acquisition_budget".to_string(),
            LeverConfig {
                label: "Acquisition budget".to_string(),
                domain: Domain::Commercial,
                binding: LeverBinding::SetAcquisitionSpend,
                target: IndexId::CommercialAttractiveness,
                kind: EffectKind::Absolute,
                impact_per_unit: 8e-6,
                cost_per_unit: Decimal::ZERO,
                min_value: 0.0,
                max_value: 5_000_000.0,
            },
        );
        levers.insert(
            "hr.hiring".to_string(),
            LeverConfig {
                label: "Hiring (FTE)".to_string(),
                domain: Domain::Hr,
                binding: LeverBinding::AddStaff,
                target: IndexId::HrBalance,
                kind: EffectKind::Absolute,
                impact_per_unit: 0.3,
                cost_per_unit: Decimal::new(8_000, 0),
                min_value: -50.0,
                max_value: 50.0,
            },
        );
        levers.insert(
            "hr.training_budget".to_string(),
            LeverConfig {
                label: "Training budget".to_string(),
                domain: Domain::Hr,
                binding: LeverBinding::SetTrainingSpend,
                target: IndexId::HrBalance,
                kind: EffectKind::Absolute,
                impact_per_unit: 5e-6,
                cost_per_unit: Decimal::ZERO,
                min_value: 0.0,
                max_value: 2_000_000.0,
            },
        );
        levers.insert(
            "it.automation_program".to_string(),
            LeverConfig {
                label: "Process automation program".to_string(),
                domain: Domain::InformationTech,
                binding: LeverBinding::AddAutomation,
                target: IndexId::OperationalQuality,
                kind: EffectKind::Absolute,
                impact_per_unit: 0.8,
                cost_per_unit: Decimal::new(30_000, 0),
                min_value: 0.0,
                max_value: 20.0,
            },
        );
        levers.insert(
            "it.data_program".to_string(),
            LeverConfig {
                label: "Data quality program".to_string(),
                domain: Domain::InformationTech,
                binding: LeverBinding::AddDataQuality,
                target: IndexId::DataMaturity,
                kind: EffectKind::Absolute,
                impact_per_unit: 1.0,
                cost_per_unit: Decimal::new(25_000, 0),
                min_value: 0.0,
                max_value: 20.0,
            },
        );
        levers.insert(
            "it.core_system".to_string(),
            LeverConfig {
                label: "Core system modernization".to_string(),
                domain: Domain::InformationTech,
                binding: LeverBinding::AddItMaturity,
                target: IndexId::DataMaturity,
                kind: EffectKind::Absolute,
                impact_per_unit: 1.2,
                cost_per_unit: Decimal::new(50_000, 0),
                min_value: 0.0,
                max_value: 15.0,
            },
        );
        levers.insert(
            "ops.claims_capacity".to_string(),
            LeverConfig {
                label: "Claims handling capacity".to_string(),
                domain: Domain::Operations,
                binding: LeverBinding::AddClaimsCapacity,
                target: IndexId::OperationalQuality,
                kind: EffectKind::Absolute,
                impact_per_unit: 0.5,
                cost_per_unit: Decimal::new(10_000, 0),
                min_value: -20.0,
                max_value: 40.0,
            },
        );
        levers.insert(
            "compliance.audit_program".to_string(),
            LeverConfig {
                label: "Compliance audit program".to_string(),
                domain: Domain::Compliance,
                binding: LeverBinding::AddComplianceEffort,
                target: IndexId::Sincerity,
                kind: EffectKind::Absolute,
                impact_per_unit: 0.9,
                cost_per_unit: Decimal::new(20_000, 0),
                min_value: 0.0,
                max_value: 20.0,
            },
        );
        levers.insert(
            "finance.asset_allocation".to_string(),
            LeverConfig {
                label: "Asset allocation yield target".to_string(),
                domain: Domain::Finance,
                binding: LeverBinding::SetInvestmentYield,
                target: IndexId::FinancialResilience,
                kind: EffectKind::Absolute,
                impact_per_unit: 300.0,
                cost_per_unit: Decimal::ZERO,
                min_value: 0.0,
                max_value: 0.06,
            },
        );
        levers.insert(
            "finance.reinsurance_share".to_string(),
            LeverConfig {
                label: "Reinsurance cession share".to_string(),
                domain: Domain::Finance,
                binding: LeverBinding::SetReinsuranceShare,
                target: IndexId::FinancialResilience,
                kind: EffectKind::Absolute,
                impact_per_unit: 20.0,
                cost_per_unit: Decimal::ZERO,
                min_value: 0.0,
                max_value: 0.50,
            },
        );

        let mut remediations = BTreeMap::new();
        remediations.insert(
            IndexId::CommercialAttractiveness,
            vec![
                "pricing.premium_level".to_string(),
                "commercial.acquisition_budget".to_string(),
            ],
        );
        remediations.insert(
            IndexId::OperationalQuality,
            vec![
                "ops.claims_capacity".to_string(),
                "it.automation_program".to_string(),
            ],
        );
        remediations.insert(
            IndexId::HrBalance,
            vec!["hr.hiring".to_string(), "hr.training_budget".to_string()],
        );
        remediations.insert(
            IndexId::FinancialResilience,
            vec![
                "finance.reinsurance_share".to_string(),
                "finance.asset_allocation".to_string(),
            ],
        );
        remediations.insert(
            IndexId::DataMaturity,
            vec!["it.data_program".to_string(), "it.core_system".to_string()],
        );
        remediations.insert(
            IndexId::Sincerity,
            vec!["compliance.audit_program".to_string()],
        );
        remediations.insert(
            IndexId::PnlPerformance,
            vec![
                "pricing.premium_level".to_string(),
                "ops.claims_capacity".to_string(),
            ],
        );

        Self {
            constants: EngineConstants::default(),
            domains,
            levers,
            thresholds: AlertThresholds::default(),
            remediations,
        }
    }
}
