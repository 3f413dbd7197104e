//! Threshold alarms over indices and derived P&L ratios.

use serde::{Deserialize, Serialize};

use sim_core::{AlertThresholds, Difficulty, EngineConfig, IndexId, IndicesState, PnLState};
use sim_econ::{expense_ratio, loss_ratio};

/// Alert severity; `Critical` sorts before `Warning` before `Info`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// One raised alarm with the levers recommended to remediate it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,
    /// Index the alert concerns; `None` for derived P&L ratios.
    pub index: Option<IndexId>,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
    pub recommended_levers: Vec<String>,
}

/// Margin above the warning threshold within which an Info alert is raised.
const INFO_BAND: f64 = 5.0;

fn index_alert(
    id: IndexId,
    value: f64,
    thresholds: &AlertThresholds,
    scale: f64,
    config: &EngineConfig,
) -> Option<Alert> {
    let warning = thresholds.index_warning.get(&id).copied().unwrap_or(0.0) * scale;
    let critical = thresholds.index_critical.get(&id).copied().unwrap_or(0.0) * scale;
    let (severity, threshold) = if value < critical {
        (Severity::Critical, critical)
    } else if value < warning {
        (Severity::Warning, warning)
    } else if value < warning + INFO_BAND {
        (Severity::Info, warning)
    } else {
        return None;
    };
    let recommended_levers = config.remediations.get(&id).cloned().unwrap_or_default();
    Some(Alert {
        severity,
        index: Some(id),
        metric: id.code().to_string(),
        value,
        threshold,
        message: format!("{} at {:.1} (threshold {:.1})", id.code(), value, threshold),
        recommended_levers,
    })
}

fn ratio_alert(
    metric: &str,
    value: f64,
    warning: f64,
    critical: f64,
    scale: f64,
    recommended_levers: Vec<String>,
) -> Option<Alert> {
    // Ratios alarm when rising; harder difficulties alarm earlier, so the
    // thresholds divide by the scale instead of multiplying.
    let warning = warning / scale;
    let critical = critical / scale;
    let (severity, threshold) = if value > critical {
        (Severity::Critical, critical)
    } else if value > warning {
        (Severity::Warning, warning)
    } else {
        return None;
    };
    Some(Alert {
        severity,
        index: None,
        metric: metric.to_string(),
        value,
        threshold,
        message: format!("{} at {:.0}% (threshold {:.0}%)", metric, value * 100.0, threshold * 100.0),
        recommended_levers,
    })
}

/// Evaluate every index and the derived P&L percentages against
/// difficulty-scaled thresholds. The result is sorted most severe first.
pub fn detect_alerts(
    indices: &IndicesState,
    pnl: &PnLState,
    config: &EngineConfig,
    difficulty: Difficulty,
) -> Vec<Alert> {
    let scale = difficulty.threshold_scale();
    let thresholds = &config.thresholds;
    let eps = config.constants.min_denominator;

    let mut alerts: Vec<Alert> = Vec::new();
    for (id, value) in indices.iter() {
        if let Some(alert) = index_alert(id, value, thresholds, scale, config) {
            alerts.push(alert);
        }
    }
    if let Some(alert) = ratio_alert(
        "loss ratio",
        loss_ratio(pnl, eps),
        thresholds.loss_ratio_warning,
        thresholds.loss_ratio_critical,
        scale,
        vec![
            "pricing.premium_level".to_string(),
            "finance.reinsurance_share".to_string(),
        ],
    ) {
        alerts.push(alert);
    }
    if let Some(alert) = ratio_alert(
        "expense ratio",
        expense_ratio(pnl, eps),
        thresholds.expense_ratio_warning,
        thresholds.expense_ratio_critical,
        scale,
        vec!["it.automation_program".to_string()],
    ) {
        alerts.push(alert);
    }

    alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use sim_core::IndicesState;

    fn healthy_pnl() -> PnLState {
        PnLState::new(
            Decimal::new(25_000_000, 0),
            Decimal::new(16_000_000, 0),
            Decimal::new(5_000_000, 0),
            Decimal::new(1_000_000, 0),
        )
    }

    #[test]
    fn healthy_state_raises_no_alerts() {
        let indices = IndicesState::from_fn(|_| 70.0);
        let alerts = detect_alerts(
            &indices,
            &healthy_pnl(),
            &EngineConfig::default(),
            Difficulty::Normal,
        );
        assert!(alerts.is_empty());
    }

    #[test]
    fn degraded_indices_alert_by_severity_order() {
        let mut indices = IndicesState::from_fn(|_| 70.0);
        indices.set(IndexId::DataMaturity, 38.0); // warning (< 40)
        indices.set(IndexId::Sincerity, 20.0); // critical (< 35)
        let alerts = detect_alerts(
            &indices,
            &healthy_pnl(),
            &EngineConfig::default(),
            Difficulty::Normal,
        );
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].index, Some(IndexId::Sincerity));
        assert_eq!(alerts[1].severity, Severity::Warning);
        assert!(!alerts[0].recommended_levers.is_empty());
    }

    #[test]
    fn difficulty_scales_index_thresholds() {
        let mut indices = IndicesState::from_fn(|_| 70.0);
        indices.set(IndexId::DataMaturity, 42.0);
        // Normal: warning is 40, so 42 only rates an Info.
        let normal = detect_alerts(
            &indices,
            &healthy_pnl(),
            &EngineConfig::default(),
            Difficulty::Normal,
        );
        assert_eq!(normal[0].severity, Severity::Info);
        // Hard: warning is 44, so 42 rates a Warning.
        let hard = detect_alerts(
            &indices,
            &healthy_pnl(),
            &EngineConfig::default(),
            Difficulty::Hard,
        );
        assert_eq!(hard[0].severity, Severity::Warning);
    }

    #[test]
    fn rising_loss_ratio_alerts_with_remediation() {
        let indices = IndicesState::from_fn(|_| 70.0);
        let pnl = PnLState::new(
            Decimal::new(25_000_000, 0),
            Decimal::new(24_000_000, 0), // 96% loss ratio
            Decimal::new(5_000_000, 0),
            Decimal::new(1_000_000, 0),
        );
        let alerts = detect_alerts(&indices, &pnl, &EngineConfig::default(), Difficulty::Normal);
        let loss = alerts.iter().find(|a| a.metric == "loss ratio").unwrap();
        assert_eq!(loss.severity, Severity::Critical);
        assert!(loss
            .recommended_levers
            .contains(&"pricing.premium_level".to_string()));
    }
}
