//! Monitoring health evaluation
//!
//! Compares a trunk's observed stats with its quality thresholds.

use ringer_core::models::SipTrunk;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityMetric {
    Asr,
    Acd,
    Pdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    /// Platform has not reported stats for the trunk
    NoData,
}

/// A threshold the trunk is currently violating
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthBreach {
    pub metric: QualityMetric,
    pub observed: Decimal,
    pub threshold: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub trunk_id: String,
    pub status: HealthStatus,
    pub breaches: Vec<HealthBreach>,
}

/// Evaluate ASR, ACD and PDD against the trunk's thresholds
///
/// ASR and ACD breach when below their minimum, PDD when above its maximum.
#[instrument(skip(trunk), fields(trunk_id = %trunk.basic.id))]
pub fn evaluate_health(trunk: &SipTrunk) -> HealthReport {
    let Some(stats) = trunk.stats.as_ref() else {
        return HealthReport {
            trunk_id: trunk.basic.id.clone(),
            status: HealthStatus::NoData,
            breaches: Vec::new(),
        };
    };

    let thresholds = &trunk.monitoring.quality_thresholds;
    let mut breaches = Vec::new();

    if stats.asr < thresholds.min_asr {
        breaches.push(HealthBreach {
            metric: QualityMetric::Asr,
            observed: stats.asr,
            threshold: thresholds.min_asr,
        });
    }
    if stats.acd < thresholds.min_acd {
        breaches.push(HealthBreach {
            metric: QualityMetric::Acd,
            observed: stats.acd,
            threshold: thresholds.min_acd,
        });
    }
    if stats.pdd > thresholds.max_pdd {
        breaches.push(HealthBreach {
            metric: QualityMetric::Pdd,
            observed: Decimal::from(stats.pdd),
            threshold: Decimal::from(thresholds.max_pdd),
        });
    }

    let status = if breaches.is_empty() {
        HealthStatus::Healthy
    } else {
        warn!(breaches = breaches.len(), "Trunk below quality thresholds");
        HealthStatus::Degraded
    };

    HealthReport {
        trunk_id: trunk.basic.id.clone(),
        status,
        breaches,
    }
}
