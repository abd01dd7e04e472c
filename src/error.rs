use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("servers must be between 1 and {max} (got {got})")]
    InvalidServers { got: usize, max: usize },
    #[error("mean inter-arrival time must be > 0 (got {0})")]
    InvalidMeanInterArrival(f64),
    #[error("mean service time must be > 0 (got {0})")]
    InvalidMeanService(f64),
    #[error("priority probability must be within [0, 1] (got {0})")]
    InvalidPriorityProbability(f64),
    #[error("patience must be >= 0 (got {0})")]
    InvalidPatience(f64),
    #[error("tick size must be > 0 (got {0})")]
    InvalidTickSeconds(f64),
    #[error("duration must be > 0 (got {0})")]
    InvalidDuration(f64),
    #[error("{name} must be at most {max} seconds (got {got})")]
    SpanTooLong {
        name: &'static str,
        got: f64,
        max: f64,
    },
    #[error("warm-up must be >= 0 (got {0})")]
    InvalidWarmup(f64),
    #[error("window must be > 0 (got {0})")]
    InvalidWindow(f64),
    #[error("replications must be greater than 0")]
    ReplicationsZero,
    #[error("threads must be greater than 0")]
    ThreadsZero,
    #[error("{0}")]
    ConfigIo(String),
    #[error("{0}")]
    ConfigParse(String),
    #[error("unsupported config format '{0}'")]
    UnsupportedConfigFormat(String),
    #[error("{0}")]
    Output(String),
    #[error("{0}")]
    Cli(String),
}

pub type Result<T> = std::result::Result<T, Error>;
