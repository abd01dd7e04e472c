mod multi_shortest;
mod single_fifo;

use crate::models::QueuePolicyConfig;
use crate::state::ServerState;

pub use multi_shortest::MultiShortestPolicy;
pub use single_fifo::SingleFifoPolicy;

/// Decides where arrivals wait and where idle servers pull work from.
pub trait RoutingPolicy: Send {
    fn route(&self, ctx: &RoutingContext) -> QueueSlot;
    fn source_for(&self, server_id: usize) -> QueueSlot;
}

pub struct RoutingContext<'a> {
    pub servers: &'a [ServerState],
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueueSlot {
    Shared,
    Server(usize),
}

pub fn build_policy(policy: QueuePolicyConfig) -> Box<dyn RoutingPolicy> {
    match policy {
        QueuePolicyConfig::SingleFifo => Box::new(SingleFifoPolicy),
        QueuePolicyConfig::MultiShortest => Box::new(MultiShortestPolicy),
    }
}
