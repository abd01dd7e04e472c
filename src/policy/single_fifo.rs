use crate::policy::{QueueSlot, RoutingContext, RoutingPolicy};

#[derive(Default)]
pub struct SingleFifoPolicy;

impl RoutingPolicy for SingleFifoPolicy {
    fn route(&self, _ctx: &RoutingContext) -> QueueSlot {
        QueueSlot::Shared
    }

    fn source_for(&self, _server_id: usize) -> QueueSlot {
        QueueSlot::Shared
    }
}
