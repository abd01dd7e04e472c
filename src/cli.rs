use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::models::{ArrivalDistribution, QueuePolicyConfig, ServiceDistribution};

#[derive(Parser, Debug)]
#[command(name = "queue-sim", version, about = "Multi-server queueing simulation")]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one simulation and print its metrics.
    Run(RunArgs),
    /// Run independent replications and summarize them.
    Replicate(ReplicateArgs),
    /// List queue policies and distributions.
    ListPolicies,
    /// Print the configuration a scenario resolves to.
    ShowConfig(ScenarioArgs),
}

/// Model parameters shared by every subcommand that builds a scenario.
#[derive(Args, Debug, Default)]
pub struct ScenarioArgs {
    #[arg(long, help = "Scenario file (.toml or .json); flags override its values")]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub servers: Option<usize>,
    #[arg(long, value_name = "SECONDS")]
    pub mean_inter_arrival: Option<f64>,
    #[arg(long, value_name = "SECONDS")]
    pub mean_service: Option<f64>,
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,
    #[arg(long, value_enum)]
    pub arrivals: Option<ArrivalArg>,
    #[arg(long, value_enum)]
    pub service: Option<ServiceArg>,
    #[arg(long, help = "Enable the two-class priority queue")]
    pub priority: bool,
    #[arg(long)]
    pub priority_probability: Option<f64>,
    #[arg(long, help = "Total waiting capacity; 0 means unbounded")]
    pub max_queue: Option<usize>,
    #[arg(long, value_name = "SECONDS", help = "Reneging threshold; 0 disables")]
    pub patience: Option<f64>,
    #[arg(long, value_name = "SECONDS")]
    pub tick: Option<f64>,
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,
    #[arg(long, value_name = "SECONDS")]
    pub duration: Option<f64>,
    #[arg(long, value_name = "SECONDS")]
    pub warmup: Option<f64>,
    #[arg(long, value_name = "SECONDS", help = "Also report the last N seconds")]
    pub window: Option<f64>,
    #[arg(long, value_enum, default_value = "human")]
    pub format: FormatArg,
}

#[derive(Args, Debug)]
pub struct ReplicateArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,
    #[arg(long)]
    pub replications: Option<usize>,
    #[arg(long, value_name = "SECONDS")]
    pub run_seconds: Option<f64>,
    #[arg(long, value_name = "SECONDS")]
    pub warmup: Option<f64>,
    #[arg(long, help = "Seed of replication 0; later ones are offset from it")]
    pub base_seed: Option<u64>,
    #[arg(long)]
    pub threads: Option<usize>,
    #[arg(long, value_enum, default_value = "human")]
    pub format: FormatArg,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyArg {
    SingleFifo,
    MultiShortest,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrivalArg {
    Exponential,
    BernoulliTick,
    Deterministic,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceArg {
    Uniform,
    Exponential,
    Deterministic,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Human,
    Summary,
    Json,
    Csv,
}

impl From<PolicyArg> for QueuePolicyConfig {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::SingleFifo => QueuePolicyConfig::SingleFifo,
            PolicyArg::MultiShortest => QueuePolicyConfig::MultiShortest,
        }
    }
}

impl From<ArrivalArg> for ArrivalDistribution {
    fn from(value: ArrivalArg) -> Self {
        match value {
            ArrivalArg::Exponential => ArrivalDistribution::Exponential,
            ArrivalArg::BernoulliTick => ArrivalDistribution::BernoulliTick,
            ArrivalArg::Deterministic => ArrivalDistribution::Deterministic,
        }
    }
}

impl From<ServiceArg> for ServiceDistribution {
    fn from(value: ServiceArg) -> Self {
        match value {
            ServiceArg::Uniform => ServiceDistribution::Uniform,
            ServiceArg::Exponential => ServiceDistribution::Exponential,
            ServiceArg::Deterministic => ServiceDistribution::Deterministic,
        }
    }
}

pub fn parse_args() -> Result<Cli> {
    parse_from(std::env::args_os())
}

/// Parses `args`; help and version requests print and exit like clap normally does.
pub fn parse_from<I, T>(args: I) -> Result<Cli>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|err| match err.kind() {
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => err.exit(),
        _ => Error::Cli(err.to_string()),
    })
}
