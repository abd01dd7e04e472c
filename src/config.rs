use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::cli::{ReplicateArgs, RunArgs, ScenarioArgs};
use crate::error::{Error, Result};
use crate::models::{RunOptions, SimConfig, MAX_RUN_SECONDS, MAX_SERVERS, MIN_SERVERS};
use crate::replication::ReplicationOptions;

/// Contents of a scenario file. Every table is optional.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ScenarioFile {
    pub simulation: SimConfig,
    pub run: RunOptions,
    pub replications: ReplicationOptions,
}

pub fn load_config(path: &Path) -> Result<ScenarioFile> {
    let contents = fs::read_to_string(path).map_err(|err| {
        Error::ConfigIo(format!(
            "failed to read config '{}': {}",
            path.display(),
            err
        ))
    })?;
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or("");

    match ext {
        "toml" => toml::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse TOML: {}", err))),
        "json" => serde_json::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse JSON: {}", err))),
        "" => Err(Error::UnsupportedConfigFormat("unknown".to_string())),
        _ => Err(Error::UnsupportedConfigFormat(ext.to_string())),
    }
}

/// Loads the optional scenario file and applies flag overrides on top.
pub fn build_scenario(args: &ScenarioArgs) -> Result<ScenarioFile> {
    let mut scenario = match &args.config {
        Some(path) => load_config(path)?,
        None => ScenarioFile::default(),
    };

    let sim = &mut scenario.simulation;
    if let Some(servers) = args.servers {
        sim.servers = servers;
    }
    if let Some(mean) = args.mean_inter_arrival {
        sim.mean_inter_arrival_seconds = mean;
    }
    if let Some(mean) = args.mean_service {
        sim.mean_service_seconds = mean;
    }
    if let Some(policy) = args.policy {
        sim.policy = policy.into();
    }
    if let Some(arrivals) = args.arrivals {
        sim.arrival_distribution = arrivals.into();
    }
    if let Some(service) = args.service {
        sim.service_distribution = service.into();
    }
    if args.priority {
        sim.priority_enabled = true;
    }
    if let Some(probability) = args.priority_probability {
        sim.priority_probability = probability;
    }
    if let Some(max_queue) = args.max_queue {
        sim.max_queue = max_queue;
    }
    if let Some(patience) = args.patience {
        sim.patience_seconds = patience;
    }
    if let Some(tick) = args.tick {
        sim.tick_seconds = tick;
    }
    if args.seed.is_some() {
        sim.seed = args.seed;
    }

    validate_sim_config(&scenario.simulation)?;
    Ok(scenario)
}

/// Configuration and run options for the `run` subcommand.
pub fn build_run(args: &RunArgs) -> Result<(SimConfig, RunOptions)> {
    let scenario = build_scenario(&args.scenario)?;
    let mut options = scenario.run;
    if let Some(duration) = args.duration {
        options.duration_seconds = duration;
    }
    if let Some(warmup) = args.warmup {
        options.warmup_seconds = warmup;
    }
    if args.window.is_some() {
        options.window_seconds = args.window;
    }
    validate_run_options(&options)?;
    Ok((scenario.simulation, options))
}

/// Configuration and replication options for the `replicate` subcommand.
///
/// Without an explicit base seed the simulation seed is used, so a seeded
/// scenario stays reproducible under replication.
pub fn build_replications(args: &ReplicateArgs) -> Result<(SimConfig, ReplicationOptions)> {
    let scenario = build_scenario(&args.scenario)?;
    let mut options = scenario.replications;
    if let Some(count) = args.replications {
        options.count = count;
    }
    if let Some(run_seconds) = args.run_seconds {
        options.run_seconds = run_seconds;
    }
    if let Some(warmup) = args.warmup {
        options.warmup_seconds = warmup;
    }
    if args.base_seed.is_some() {
        options.base_seed = args.base_seed;
    }
    if options.base_seed.is_none() {
        options.base_seed = scenario.simulation.seed;
    }
    if let Some(threads) = args.threads {
        options.threads = threads;
    }
    validate_replication_options(&options)?;
    Ok((scenario.simulation, options))
}

pub fn validate_sim_config(config: &SimConfig) -> Result<()> {
    if !(MIN_SERVERS..=MAX_SERVERS).contains(&config.servers) {
        return Err(Error::InvalidServers {
            got: config.servers,
            max: MAX_SERVERS,
        });
    }
    if !positive(config.mean_inter_arrival_seconds) {
        return Err(Error::InvalidMeanInterArrival(
            config.mean_inter_arrival_seconds,
        ));
    }
    if !positive(config.mean_service_seconds) {
        return Err(Error::InvalidMeanService(config.mean_service_seconds));
    }
    if config.priority_enabled && !(0.0..=1.0).contains(&config.priority_probability) {
        return Err(Error::InvalidPriorityProbability(
            config.priority_probability,
        ));
    }
    if !config.patience_seconds.is_finite() || config.patience_seconds < 0.0 {
        return Err(Error::InvalidPatience(config.patience_seconds));
    }
    if !positive(config.tick_seconds) {
        return Err(Error::InvalidTickSeconds(config.tick_seconds));
    }
    Ok(())
}

pub fn validate_run_options(options: &RunOptions) -> Result<()> {
    if !positive(options.duration_seconds) {
        return Err(Error::InvalidDuration(options.duration_seconds));
    }
    if !options.warmup_seconds.is_finite() || options.warmup_seconds < 0.0 {
        return Err(Error::InvalidWarmup(options.warmup_seconds));
    }
    if let Some(window) = options.window_seconds {
        if !positive(window) {
            return Err(Error::InvalidWindow(window));
        }
    }
    check_span("duration", options.duration_seconds)?;
    check_span("warm-up", options.warmup_seconds)?;
    Ok(())
}

pub fn validate_replication_options(options: &ReplicationOptions) -> Result<()> {
    if options.count == 0 {
        return Err(Error::ReplicationsZero);
    }
    if !positive(options.run_seconds) {
        return Err(Error::InvalidDuration(options.run_seconds));
    }
    if !options.warmup_seconds.is_finite() || options.warmup_seconds < 0.0 {
        return Err(Error::InvalidWarmup(options.warmup_seconds));
    }
    if options.threads == 0 {
        return Err(Error::ThreadsZero);
    }
    check_span("run length", options.run_seconds)?;
    check_span("warm-up", options.warmup_seconds)?;
    Ok(())
}

fn check_span(name: &'static str, seconds: f64) -> Result<()> {
    if seconds > MAX_RUN_SECONDS {
        return Err(Error::SpanTooLong {
            name,
            got: seconds,
            max: MAX_RUN_SECONDS,
        });
    }
    Ok(())
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
