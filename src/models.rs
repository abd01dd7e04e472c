use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_SERVERS: usize = 1;
pub const MAX_SERVERS: usize = 6;
pub const MIN_MEAN_SECONDS: f64 = 1.0;
pub const MIN_TICK_SECONDS: f64 = 0.01;
pub const MAX_TICK_SECONDS: f64 = 60.0;
/// Longest simulated span the CLI accepts for a run or warm-up (one year).
pub const MAX_RUN_SECONDS: f64 = 31_536_000.0;

const DEFAULT_SERVERS: usize = 2;
const DEFAULT_MEAN_INTER_ARRIVAL: f64 = 4.0;
const DEFAULT_MEAN_SERVICE: f64 = 20.0;
const DEFAULT_PRIORITY_PROBABILITY: f64 = 0.1;
const DEFAULT_TICK_SECONDS: f64 = 1.0;
const DEFAULT_RUN_SECONDS: f64 = 900.0;

/// Parameters of one simulation run.
///
/// Every numeric field is forgiving: [`SimConfig::normalized`] clamps or defaults
/// out-of-range values instead of rejecting them, so the engine always starts from
/// a runnable state. Rejecting bad user input is left to the CLI layer.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub servers: usize,
    pub mean_inter_arrival_seconds: f64,
    pub mean_service_seconds: f64,
    pub policy: QueuePolicyConfig,
    pub arrival_distribution: ArrivalDistribution,
    pub service_distribution: ServiceDistribution,
    pub priority_enabled: bool,
    pub priority_probability: f64,
    /// Total waiting-line capacity across all queues; 0 means unbounded.
    pub max_queue: usize,
    /// Reneging threshold in simulated seconds; 0 disables reneging.
    pub patience_seconds: f64,
    pub tick_seconds: f64,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            servers: DEFAULT_SERVERS,
            mean_inter_arrival_seconds: DEFAULT_MEAN_INTER_ARRIVAL,
            mean_service_seconds: DEFAULT_MEAN_SERVICE,
            policy: QueuePolicyConfig::SingleFifo,
            arrival_distribution: ArrivalDistribution::Exponential,
            service_distribution: ServiceDistribution::Uniform,
            priority_enabled: false,
            priority_probability: DEFAULT_PRIORITY_PROBABILITY,
            max_queue: 0,
            patience_seconds: 0.0,
            tick_seconds: DEFAULT_TICK_SECONDS,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Returns a copy with every field forced into its valid range.
    pub fn normalized(&self) -> Self {
        Self {
            servers: self.servers.clamp(MIN_SERVERS, MAX_SERVERS),
            mean_inter_arrival_seconds: normalize_mean(
                self.mean_inter_arrival_seconds,
                DEFAULT_MEAN_INTER_ARRIVAL,
            ),
            mean_service_seconds: normalize_mean(self.mean_service_seconds, DEFAULT_MEAN_SERVICE),
            policy: self.policy,
            arrival_distribution: self.arrival_distribution,
            service_distribution: self.service_distribution,
            priority_enabled: self.priority_enabled,
            priority_probability: finite_or(self.priority_probability, 0.0).clamp(0.0, 1.0),
            max_queue: self.max_queue,
            patience_seconds: finite_or(self.patience_seconds, 0.0).max(0.0),
            tick_seconds: finite_or(self.tick_seconds, DEFAULT_TICK_SECONDS)
                .clamp(MIN_TICK_SECONDS, MAX_TICK_SECONDS),
            seed: self.seed,
        }
    }
}

/// Length of a single interactive run.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RunOptions {
    pub duration_seconds: f64,
    /// Simulated time discarded before measuring starts.
    pub warmup_seconds: f64,
    /// Also report statistics over the last `window_seconds`.
    pub window_seconds: Option<f64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            duration_seconds: DEFAULT_RUN_SECONDS,
            warmup_seconds: 0.0,
            window_seconds: None,
        }
    }
}

fn normalize_mean(value: f64, default: f64) -> f64 {
    if !value.is_finite() || value == 0.0 {
        return default;
    }
    value.max(MIN_MEAN_SECONDS)
}

fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueuePolicyConfig {
    /// One shared line feeding every server.
    #[default]
    #[serde(alias = "single_queue_fifo", alias = "single-fifo")]
    SingleFifo,
    /// One line per server; arrivals join the shortest.
    #[serde(alias = "multi_queue_shortest", alias = "multi-shortest")]
    MultiShortest,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalDistribution {
    #[default]
    Exponential,
    #[serde(alias = "bernoulli-tick")]
    BernoulliTick,
    Deterministic,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceDistribution {
    #[default]
    Uniform,
    Exponential,
    Deterministic,
}

impl QueuePolicyConfig {
    pub const ALL: [QueuePolicyConfig; 2] =
        [QueuePolicyConfig::SingleFifo, QueuePolicyConfig::MultiShortest];
}

impl ArrivalDistribution {
    pub const ALL: [ArrivalDistribution; 3] = [
        ArrivalDistribution::Exponential,
        ArrivalDistribution::BernoulliTick,
        ArrivalDistribution::Deterministic,
    ];
}

impl ServiceDistribution {
    pub const ALL: [ServiceDistribution; 3] = [
        ServiceDistribution::Uniform,
        ServiceDistribution::Exponential,
        ServiceDistribution::Deterministic,
    ];
}

impl fmt::Display for QueuePolicyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QueuePolicyConfig::SingleFifo => "single-fifo",
            QueuePolicyConfig::MultiShortest => "multi-shortest",
        };
        f.write_str(label)
    }
}

impl fmt::Display for ArrivalDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArrivalDistribution::Exponential => "exponential",
            ArrivalDistribution::BernoulliTick => "bernoulli-tick",
            ArrivalDistribution::Deterministic => "deterministic",
        };
        f.write_str(label)
    }
}

impl fmt::Display for ServiceDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceDistribution::Uniform => "uniform",
            ServiceDistribution::Exponential => "exponential",
            ServiceDistribution::Deterministic => "deterministic",
        };
        f.write_str(label)
    }
}
