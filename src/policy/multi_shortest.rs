use crate::policy::{QueueSlot, RoutingContext, RoutingPolicy};

#[derive(Default)]
pub struct MultiShortestPolicy;

impl RoutingPolicy for MultiShortestPolicy {
    fn route(&self, ctx: &RoutingContext) -> QueueSlot {
        let mut best_idx = 0usize;
        let mut best_len = usize::MAX;

        // Strict comparison keeps the lowest server id on ties.
        for (idx, server) in ctx.servers.iter().enumerate() {
            if server.queue.len() < best_len {
                best_len = server.queue.len();
                best_idx = idx;
            }
        }

        QueueSlot::Server(best_idx)
    }

    fn source_for(&self, server_id: usize) -> QueueSlot {
        QueueSlot::Server(server_id)
    }
}
