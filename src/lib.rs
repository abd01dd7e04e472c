//! Fixed-tick simulation of a multi-server waiting line with balking,
//! reneging and priority classes, plus seeded replications with confidence
//! intervals.

pub mod assessment;
pub mod cli;
pub mod config;
pub mod distributions;
pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod models;
pub mod output;
pub mod policy;
pub mod queue;
pub mod replication;
pub mod rng;
pub mod state;
pub mod stats;
