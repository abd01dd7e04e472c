use serde::Serialize;

use crate::assessment::LoadAssessment;
use crate::events::Customer;
use crate::models::{RunOptions, SimConfig};
use crate::queue::CustomerQueue;

#[derive(Clone, Debug)]
pub struct ServerState {
    pub id: usize,
    pub current: Option<Customer>,
    pub remaining_service: f64,
    pub busy_time: f64,
    pub completed: u64,
    /// Own waiting line; only used under the multi-queue policy.
    pub queue: CustomerQueue,
}

impl ServerState {
    pub fn idle(id: usize) -> Self {
        Self {
            id,
            current: None,
            remaining_service: 0.0,
            busy_time: 0.0,
            completed: 0,
            queue: CustomerQueue::new(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            id: self.id,
            current: self.current.clone(),
            remaining_service: self.remaining_service,
            busy_time: self.busy_time,
            completed: self.completed,
            queue_length: self.queue.len(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServerSnapshot {
    pub id: usize,
    pub current: Option<Customer>,
    pub remaining_service: f64,
    pub busy_time: f64,
    pub completed: u64,
    pub queue_length: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RecentServed {
    pub customer_id: u64,
    pub finished_at: f64,
}

/// Read-only view of the engine, cheap enough to take every tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub config: SimConfig,
    pub clock: f64,
    pub measure_start: f64,
    pub total_arrived: u64,
    pub total_served: u64,
    pub total_balked: u64,
    pub total_reneged: u64,
    pub total_wait_time: f64,
    pub wait_count: u64,
    pub queue_length_area: f64,
    pub max_queue_length: usize,
    pub servers: Vec<ServerSnapshot>,
    pub shared_queue_length: usize,
    pub recent_served: Vec<RecentServed>,
}

impl EngineSnapshot {
    pub fn queue_length(&self) -> usize {
        self.shared_queue_length
            + self
                .servers
                .iter()
                .map(|server| server.queue_length)
                .sum::<usize>()
    }

    pub fn busy_servers(&self) -> usize {
        self.servers
            .iter()
            .filter(|server| server.current.is_some())
            .count()
    }

    /// Customers waiting or being served right now.
    pub fn customers_in_system(&self) -> usize {
        self.queue_length() + self.busy_servers()
    }
}

/// Aggregate metrics since the measurement baseline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub measured_seconds: f64,
    pub arrived: u64,
    pub served: u64,
    pub balked: u64,
    pub reneged: u64,
    pub avg_wait: f64,
    pub avg_queue_length: f64,
    pub max_queue_length: usize,
    pub utilization_pct: f64,
    pub total_busy: f64,
    pub arrival_rate: f64,
    pub throughput: f64,
    pub service_rate_per_server: f64,
    pub wait_p50: f64,
    pub wait_p90: f64,
}

/// Metrics restricted to `[start, end]`, rebuilt from the bounded histories.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct WindowStats {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub arrived: usize,
    pub served: usize,
    pub balked: usize,
    pub reneged: usize,
    pub avg_queue_length: f64,
    pub utilization_pct: f64,
    pub avg_wait: f64,
    pub wait_p50: f64,
    pub wait_p90: f64,
    pub arrival_rate: f64,
    pub throughput: f64,
    pub service_rate_per_server: f64,
}

/// Outcome of one driven run, as handed to the formatters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    pub config: SimConfig,
    pub options: RunOptions,
    pub clock: f64,
    pub metrics: Metrics,
    pub window: Option<WindowStats>,
    pub assessment: LoadAssessment,
}
