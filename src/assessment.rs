use serde::Serialize;

use crate::state::Metrics;

const STRAINED_WAIT_SECONDS: f64 = 180.0;
const STRAINED_QUEUE_LENGTH: f64 = 8.0;
const STRAINED_UTILIZATION_PCT: f64 = 90.0;
const IDLE_WAIT_SECONDS: f64 = 60.0;
const IDLE_QUEUE_LENGTH: f64 = 3.0;
const IDLE_UTILIZATION_PCT: f64 = 65.0;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrainReason {
    LongWait,
    LongQueue,
    HighUtilization,
}

impl std::fmt::Display for StrainReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StrainReason::LongWait => "long average wait",
            StrainReason::LongQueue => "long average queue",
            StrainReason::HighUtilization => "high utilization",
        };
        f.write_str(label)
    }
}

/// Staffing advice derived from a metric snapshot.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadAssessment {
    Strained {
        reasons: Vec<StrainReason>,
        suggested_servers: usize,
        suggested_service_seconds: f64,
    },
    Underused {
        suggested_servers: usize,
    },
    Balanced,
}

pub fn assess_load(metrics: &Metrics, servers: usize, mean_service_seconds: f64) -> LoadAssessment {
    let mut reasons = Vec::new();
    if metrics.avg_wait > STRAINED_WAIT_SECONDS {
        reasons.push(StrainReason::LongWait);
    }
    if metrics.avg_queue_length > STRAINED_QUEUE_LENGTH {
        reasons.push(StrainReason::LongQueue);
    }
    if metrics.utilization_pct > STRAINED_UTILIZATION_PCT {
        reasons.push(StrainReason::HighUtilization);
    }

    if !reasons.is_empty() {
        let mut suggested = (mean_service_seconds * 0.7).round().max(1.0);
        if suggested >= mean_service_seconds {
            suggested = (mean_service_seconds.round() - 1.0).max(1.0);
        }
        return LoadAssessment::Strained {
            reasons,
            suggested_servers: servers + 1,
            suggested_service_seconds: suggested,
        };
    }

    if metrics.avg_wait < IDLE_WAIT_SECONDS
        && metrics.avg_queue_length < IDLE_QUEUE_LENGTH
        && metrics.utilization_pct < IDLE_UTILIZATION_PCT
    {
        return LoadAssessment::Underused {
            suggested_servers: servers.saturating_sub(1).max(1),
        };
    }

    LoadAssessment::Balanced
}
