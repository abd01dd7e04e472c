use serde::{Deserialize, Serialize};
use std::thread;
use tracing::{debug, info};

use crate::engine::SimulationEngine;
use crate::models::SimConfig;
use crate::state::Metrics;
use crate::stats::{summarize, Summary};

/// Seed distance between consecutive replications.
pub const SEED_STRIDE: u64 = 9_973;

const DEFAULT_REPLICATIONS: usize = 30;
const DEFAULT_RUN_SECONDS: f64 = 900.0;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReplicationOptions {
    pub count: usize,
    pub run_seconds: f64,
    pub warmup_seconds: f64,
    pub base_seed: Option<u64>,
    /// Worker threads; each one owns the engines it runs.
    pub threads: usize,
}

impl Default for ReplicationOptions {
    fn default() -> Self {
        Self {
            count: DEFAULT_REPLICATIONS,
            run_seconds: DEFAULT_RUN_SECONDS,
            warmup_seconds: 0.0,
            base_seed: None,
            threads: 1,
        }
    }
}

impl ReplicationOptions {
    pub fn normalized(&self) -> Self {
        let run_seconds = if self.run_seconds.is_finite() && self.run_seconds > 0.0 {
            self.run_seconds.floor().max(1.0)
        } else {
            DEFAULT_RUN_SECONDS
        };
        let warmup_seconds = if self.warmup_seconds.is_finite() {
            self.warmup_seconds.floor().max(0.0)
        } else {
            0.0
        };
        Self {
            count: self.count.max(1),
            run_seconds,
            warmup_seconds,
            base_seed: self.base_seed,
            threads: self.threads.max(1),
        }
    }

    pub fn seed_for(&self, index: usize) -> Option<u64> {
        self.base_seed
            .map(|base| base.wrapping_add((index as u64).wrapping_mul(SEED_STRIDE)))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReplicationRun {
    pub index: usize,
    pub seed: Option<u64>,
    pub metrics: Metrics,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReplicationSummary {
    pub avg_wait: Summary,
    pub avg_queue_length: Summary,
    pub utilization_pct: Summary,
    pub throughput: Summary,
    pub arrival_rate: Summary,
    pub balked: Summary,
    pub reneged: Summary,
    pub wait_p50: Summary,
    pub wait_p90: Summary,
}

impl ReplicationSummary {
    pub fn from_runs(runs: &[ReplicationRun]) -> Self {
        let pick = |field: fn(&Metrics) -> f64| -> Summary {
            let values: Vec<f64> = runs.iter().map(|run| field(&run.metrics)).collect();
            summarize(&values)
        };
        Self {
            avg_wait: pick(|m| m.avg_wait),
            avg_queue_length: pick(|m| m.avg_queue_length),
            utilization_pct: pick(|m| m.utilization_pct),
            throughput: pick(|m| m.throughput),
            arrival_rate: pick(|m| m.arrival_rate),
            balked: pick(|m| m.balked as f64),
            reneged: pick(|m| m.reneged as f64),
            wait_p50: pick(|m| m.wait_p50),
            wait_p90: pick(|m| m.wait_p90),
        }
    }

    /// Metric label and summary pairs in report order.
    pub fn entries(&self) -> [(&'static str, &Summary); 9] {
        [
            ("avg_wait", &self.avg_wait),
            ("avg_queue_length", &self.avg_queue_length),
            ("utilization_pct", &self.utilization_pct),
            ("throughput", &self.throughput),
            ("arrival_rate", &self.arrival_rate),
            ("balked", &self.balked),
            ("reneged", &self.reneged),
            ("wait_p50", &self.wait_p50),
            ("wait_p90", &self.wait_p90),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReplicationReport {
    pub config: SimConfig,
    pub options: ReplicationOptions,
    pub runs: Vec<ReplicationRun>,
    pub summary: ReplicationSummary,
}

/// Runs one replication: warm-up, re-baseline, measured run.
pub fn run_replication(
    config: &SimConfig,
    options: &ReplicationOptions,
    index: usize,
) -> ReplicationRun {
    let seed = options.seed_for(index);
    let mut engine = SimulationEngine::new(&SimConfig {
        seed,
        ..config.clone()
    });

    if options.warmup_seconds > 0.0 {
        engine.run_for(options.warmup_seconds);
        engine.start_measuring_from(engine.clock());
    }
    engine.run_for(options.run_seconds);

    let metrics = engine.compute_metrics();
    debug!(index, ?seed, avg_wait = metrics.avg_wait, "replication finished");
    ReplicationRun {
        index,
        seed,
        metrics,
    }
}

/// Runs independent replications of `config` and summarizes them.
///
/// Replication `i` is seeded with `base_seed + i * SEED_STRIDE`, so the same
/// options always reproduce the same table regardless of the thread count.
pub fn run_replications(config: &SimConfig, options: &ReplicationOptions) -> ReplicationReport {
    let options = options.normalized();
    info!(
        count = options.count,
        run_seconds = options.run_seconds,
        warmup_seconds = options.warmup_seconds,
        base_seed = ?options.base_seed,
        threads = options.threads,
        "running replications"
    );

    let runs = if options.threads <= 1 || options.count <= 1 {
        (0..options.count)
            .map(|index| run_replication(config, &options, index))
            .collect()
    } else {
        run_parallel(config, &options)
    };

    let summary = ReplicationSummary::from_runs(&runs);
    info!(
        avg_wait = summary.avg_wait.mean,
        utilization_pct = summary.utilization_pct.mean,
        "replications finished"
    );

    ReplicationReport {
        config: config.clone(),
        options,
        runs,
        summary,
    }
}

fn run_parallel(config: &SimConfig, options: &ReplicationOptions) -> Vec<ReplicationRun> {
    let workers = options.threads.min(options.count);
    let mut runs: Vec<ReplicationRun> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                scope.spawn(move || {
                    (worker..options.count)
                        .step_by(workers)
                        .map(|index| run_replication(config, options, index))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(runs) => runs,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });
    runs.sort_by_key(|run| run.index);
    runs
}
