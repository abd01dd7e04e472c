use tracing::debug;

use crate::assessment::assess_load;
use crate::distributions::{exp_sample, service_time, tick_arrival_probability};
use crate::events::{Customer, Priority, ServerEvent, TickEvents};
use crate::history::{EventLog, History};
use crate::models::{ArrivalDistribution, RunOptions, SimConfig};
use crate::policy::{build_policy, QueueSlot, RoutingContext, RoutingPolicy};
use crate::queue::CustomerQueue;
use crate::rng::SimRng;
use crate::state::{
    EngineSnapshot, Metrics, RecentServed, RunReport, ServerState, WindowStats,
};
use crate::stats::{mean, percentile};

pub const EVENT_HISTORY_CAPACITY: usize = 8_000;
pub const BALK_HISTORY_CAPACITY: usize = 5_000;
pub const WAIT_SAMPLE_CAPACITY: usize = 5_000;
/// How long a finished customer stays in `recent_served`.
pub const RECENT_SERVED_SECONDS: f64 = 8.0;

const DEFAULT_WINDOW_SECONDS: f64 = 60.0;
const MIN_WINDOW_SECONDS: f64 = 1.0;
const MIN_WINDOW_DURATION: f64 = 1e-9;

#[derive(Clone, Debug, Default)]
struct Accumulators {
    arrived: u64,
    served: u64,
    balked: u64,
    reneged: u64,
    total_wait: f64,
    wait_count: u64,
    queue_length_area: f64,
    max_queue_length: usize,
}

#[derive(Clone, Debug)]
struct Histories {
    queue_lengths: History<usize>,
    busy_servers: History<usize>,
    waits: History<f64>,
    arrivals: EventLog,
    served: EventLog,
    balked: EventLog,
    reneged: EventLog,
}

impl Histories {
    fn new() -> Self {
        Self {
            queue_lengths: History::with_capacity(EVENT_HISTORY_CAPACITY),
            busy_servers: History::with_capacity(EVENT_HISTORY_CAPACITY),
            waits: History::with_capacity(EVENT_HISTORY_CAPACITY),
            arrivals: EventLog::with_capacity(EVENT_HISTORY_CAPACITY),
            served: EventLog::with_capacity(EVENT_HISTORY_CAPACITY),
            balked: EventLog::with_capacity(BALK_HISTORY_CAPACITY),
            reneged: EventLog::with_capacity(EVENT_HISTORY_CAPACITY),
        }
    }

    fn clear(&mut self) {
        self.queue_lengths.clear();
        self.busy_servers.clear();
        self.waits.clear();
        self.arrivals.clear();
        self.served.clear();
        self.balked.clear();
        self.reneged.clear();
    }
}

/// Fixed-increment simulation of a multi-server waiting line.
///
/// The engine does nothing on its own: a driver calls [`SimulationEngine::step`]
/// once per tick and reads results through the snapshot and metric accessors.
/// Each instance owns its RNG, queues and statistics, so separate instances can
/// run on separate threads.
pub struct SimulationEngine {
    config: SimConfig,
    policy: Box<dyn RoutingPolicy>,
    rng: SimRng,
    clock: f64,
    measure_start: f64,
    servers: Vec<ServerState>,
    shared_queue: CustomerQueue,
    next_customer_id: u64,
    next_arrival_time: Option<f64>,
    totals: Accumulators,
    histories: Histories,
    wait_samples: Vec<f64>,
    recent_served: Vec<RecentServed>,
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new(&SimConfig::default())
    }
}

impl SimulationEngine {
    pub fn new(config: &SimConfig) -> Self {
        let config = config.normalized();
        let mut engine = Self {
            policy: build_policy(config.policy),
            rng: SimRng::new(config.seed),
            clock: 0.0,
            measure_start: 0.0,
            servers: Vec::new(),
            shared_queue: CustomerQueue::new(),
            next_customer_id: 1,
            next_arrival_time: None,
            totals: Accumulators::default(),
            histories: Histories::new(),
            wait_samples: Vec::new(),
            recent_served: Vec::new(),
            config,
        };
        engine.initialize();
        engine
    }

    /// Discards all state and starts over from time zero with `config`.
    pub fn reset(&mut self, config: &SimConfig) {
        self.config = config.normalized();
        self.policy = build_policy(self.config.policy);
        self.rng = SimRng::new(self.config.seed);
        self.initialize();
    }

    fn initialize(&mut self) {
        self.clock = 0.0;
        self.measure_start = 0.0;
        self.servers = (0..self.config.servers).map(ServerState::idle).collect();
        self.shared_queue.clear();
        self.next_customer_id = 1;
        self.totals = Accumulators::default();
        self.histories.clear();
        self.wait_samples.clear();
        self.recent_served.clear();
        self.next_arrival_time = match self.config.arrival_distribution {
            ArrivalDistribution::BernoulliTick => None,
            ArrivalDistribution::Exponential | ArrivalDistribution::Deterministic => {
                Some(self.sample_inter_arrival())
            }
        };

        debug!(
            servers = self.config.servers,
            policy = %self.config.policy,
            arrivals = %self.config.arrival_distribution,
            service = %self.config.service_distribution,
            seed = ?self.config.seed,
            "engine reset"
        );
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn measure_start(&self) -> f64 {
        self.measure_start
    }

    pub fn tick_seconds(&self) -> f64 {
        self.config.tick_seconds
    }

    /// Customers waiting across every queue, excluding those in service.
    pub fn queue_length(&self) -> usize {
        self.shared_queue.len()
            + self
                .servers
                .iter()
                .map(|server| server.queue.len())
                .sum::<usize>()
    }

    fn busy_servers(&self) -> usize {
        self.servers.iter().filter(|server| server.is_busy()).count()
    }

    fn in_window(&self, time: f64) -> bool {
        time >= self.measure_start
    }

    /// Moves the measurement baseline to `start` (the current clock if not finite)
    /// without touching servers or queues.
    ///
    /// Counters, integrals and histories restart from zero, and customers already
    /// waiting are treated as if they arrived at the baseline.
    pub fn start_measuring_from(&mut self, start: f64) {
        self.measure_start = if start.is_finite() { start } else { self.clock };

        self.totals = Accumulators {
            max_queue_length: self.queue_length(),
            ..Accumulators::default()
        };
        self.wait_samples.clear();
        self.histories.clear();

        let baseline = self.measure_start;
        let bump = |customer: &mut Customer| {
            if customer.arrival_time < baseline {
                customer.arrival_time = baseline;
            }
        };
        self.shared_queue.iter_mut().for_each(bump);
        for server in &mut self.servers {
            server.busy_time = 0.0;
            server.completed = 0;
            server.queue.iter_mut().for_each(bump);
        }

        debug!(
            measure_start = self.measure_start,
            clock = self.clock,
            "measurement baseline moved"
        );
    }

    /// Advances the clock by one tick.
    pub fn step(&mut self) -> TickEvents {
        let prev = self.clock;
        self.clock += self.config.tick_seconds;
        let now = self.clock;
        let measured_dt = overlap_seconds(prev, now, self.measure_start);
        let measuring = self.in_window(now);

        let queue_len = self.queue_length();
        self.totals.queue_length_area += queue_len as f64 * measured_dt;
        self.totals.max_queue_length = self.totals.max_queue_length.max(queue_len);
        if measuring {
            self.histories.queue_lengths.push(now, queue_len);
        }

        let mut events = TickEvents::default();
        self.generate_arrivals(&mut events);
        if self.config.patience_seconds > 0.0 {
            self.renege_impatient();
        }
        self.update_servers(measured_dt, measuring, &mut events);

        if measuring {
            let busy = self.busy_servers();
            self.histories.busy_servers.push(now, busy);
        }
        self.recent_served
            .retain(|entry| now - entry.finished_at < RECENT_SERVED_SECONDS);

        events
    }

    /// Steps until at least `seconds` of simulated time has passed.
    /// Returns the number of ticks taken.
    pub fn run_for(&mut self, seconds: f64) -> u64 {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        let ticks = (seconds / self.config.tick_seconds).ceil() as u64;
        for _ in 0..ticks {
            self.step();
        }
        ticks
    }

    fn sample_inter_arrival(&mut self) -> f64 {
        match self.config.arrival_distribution {
            ArrivalDistribution::Deterministic => self.config.mean_inter_arrival_seconds,
            ArrivalDistribution::Exponential | ArrivalDistribution::BernoulliTick => {
                exp_sample(self.config.mean_inter_arrival_seconds, &mut self.rng)
            }
        }
    }

    fn generate_arrivals(&mut self, events: &mut TickEvents) {
        match self.config.arrival_distribution {
            ArrivalDistribution::Exponential | ArrivalDistribution::Deterministic => {
                // Short inter-arrival times can put several arrivals in one tick.
                while let Some(at) = self.next_arrival_time {
                    if at > self.clock {
                        break;
                    }
                    self.admit(at, events);
                    let gap = self.sample_inter_arrival();
                    self.next_arrival_time = Some(at + gap);
                }
            }
            ArrivalDistribution::BernoulliTick => {
                let probability = tick_arrival_probability(
                    self.config.mean_inter_arrival_seconds,
                    self.config.tick_seconds,
                );
                if self.rng.next_f64() < probability {
                    self.admit(self.clock, events);
                }
            }
        }
    }

    fn admit(&mut self, at: f64, events: &mut TickEvents) {
        let priority =
            if self.config.priority_enabled && self.rng.next_f64() < self.config.priority_probability
            {
                Priority::Priority
            } else {
                Priority::Normal
            };
        let customer = Customer::new(self.next_customer_id, at, priority);
        self.next_customer_id += 1;

        if self.enqueue(customer.clone()) {
            if self.in_window(at) {
                self.totals.arrived += 1;
                self.histories.arrivals.record(at);
            }
            events.arrivals.push(customer);
        }
    }

    /// Places `customer` in a queue chosen by the policy, or balks it when the
    /// total waiting line is at capacity. Returns whether it joined.
    fn enqueue(&mut self, customer: Customer) -> bool {
        let capacity = self.config.max_queue;
        if capacity > 0 && self.queue_length() >= capacity {
            if self.in_window(customer.arrival_time) {
                self.totals.balked += 1;
                self.histories.balked.record(customer.arrival_time);
            }
            return false;
        }

        let slot = self.policy.route(&RoutingContext {
            servers: &self.servers,
        });
        let priority_ordering = self.config.priority_enabled;
        self.queue_mut(slot).push(customer, priority_ordering);
        true
    }

    fn dequeue_for(&mut self, server_idx: usize) -> Option<Customer> {
        let slot = self.policy.source_for(server_idx);
        self.queue_mut(slot).pop_front()
    }

    fn queue_mut(&mut self, slot: QueueSlot) -> &mut CustomerQueue {
        match slot {
            QueueSlot::Shared => &mut self.shared_queue,
            QueueSlot::Server(idx) => &mut self.servers[idx].queue,
        }
    }

    fn renege_impatient(&mut self) {
        let now = self.clock;
        let patience = self.config.patience_seconds;
        let leave = |customer: &Customer| now - customer.arrival_time >= patience;

        let mut reneged = self.shared_queue.remove_where(leave);
        for server in &mut self.servers {
            reneged += server.queue.remove_where(leave);
        }

        if reneged > 0 && self.in_window(now) {
            self.totals.reneged += reneged as u64;
            for _ in 0..reneged {
                self.histories.reneged.record(now);
            }
        }
    }

    fn update_servers(&mut self, measured_dt: f64, measuring: bool, events: &mut TickEvents) {
        let now = self.clock;
        let dt = self.config.tick_seconds;

        for idx in 0..self.servers.len() {
            let server = &mut self.servers[idx];
            if server.current.is_some() {
                server.remaining_service -= dt;
                server.busy_time += measured_dt;

                if server.remaining_service <= 0.0 {
                    server.remaining_service = 0.0;
                    if let Some(customer) = server.current.take() {
                        if measuring {
                            server.completed += 1;
                            self.totals.served += 1;
                            self.histories.served.record(now);
                        }
                        self.recent_served.push(RecentServed {
                            customer_id: customer.id,
                            finished_at: now,
                        });
                        events.completions.push(ServerEvent {
                            server_id: idx,
                            customer,
                        });
                    }
                }
            }

            if self.servers[idx].current.is_some() {
                continue;
            }
            let Some(next) = self.dequeue_for(idx) else {
                continue;
            };

            let wait = now - next.arrival_time;
            if measuring {
                self.totals.total_wait += wait;
                self.totals.wait_count += 1;
                if self.wait_samples.len() < WAIT_SAMPLE_CAPACITY {
                    self.wait_samples.push(wait);
                }
                self.histories.waits.push(now, wait);
            }

            let service = service_time(
                self.config.mean_service_seconds,
                self.config.service_distribution,
                &mut self.rng,
            );
            let server = &mut self.servers[idx];
            server.current = Some(next.clone());
            server.remaining_service = service;
            events.assignments.push(ServerEvent {
                server_id: idx,
                customer: next,
            });
        }
    }

    pub fn state(&self) -> EngineSnapshot {
        EngineSnapshot {
            config: self.config.clone(),
            clock: self.clock,
            measure_start: self.measure_start,
            total_arrived: self.totals.arrived,
            total_served: self.totals.served,
            total_balked: self.totals.balked,
            total_reneged: self.totals.reneged,
            total_wait_time: self.totals.total_wait,
            wait_count: self.totals.wait_count,
            queue_length_area: self.totals.queue_length_area,
            max_queue_length: self.totals.max_queue_length,
            servers: self.servers.iter().map(ServerState::snapshot).collect(),
            shared_queue_length: self.shared_queue.len(),
            recent_served: self.recent_served.clone(),
        }
    }

    /// Aggregate metrics since the baseline. Ratios with a zero denominator are 0.
    pub fn compute_metrics(&self) -> Metrics {
        let measured = (self.clock - self.measure_start).max(0.0);
        let servers = self.servers.len() as f64;
        let total_busy: f64 = self.servers.iter().map(|server| server.busy_time).sum();

        Metrics {
            measured_seconds: measured,
            arrived: self.totals.arrived,
            served: self.totals.served,
            balked: self.totals.balked,
            reneged: self.totals.reneged,
            avg_wait: ratio(self.totals.total_wait, self.totals.wait_count as f64),
            avg_queue_length: ratio(self.totals.queue_length_area, measured),
            max_queue_length: self.totals.max_queue_length,
            utilization_pct: ratio(total_busy, servers * measured) * 100.0,
            total_busy,
            arrival_rate: ratio(self.totals.arrived as f64, measured),
            throughput: ratio(self.totals.served as f64, measured),
            service_rate_per_server: ratio(self.totals.served as f64, servers * measured),
            wait_p50: percentile(&self.wait_samples, 0.5),
            wait_p90: percentile(&self.wait_samples, 0.9),
        }
    }

    /// Statistics over the last `window_seconds` of measured time.
    pub fn compute_window_stats(&self, window_seconds: f64) -> WindowStats {
        let window = if window_seconds.is_finite() && window_seconds > 0.0 {
            window_seconds
        } else {
            DEFAULT_WINDOW_SECONDS
        }
        .max(MIN_WINDOW_SECONDS);
        let start = (self.clock - window).max(self.measure_start);
        self.compute_stats_since(start)
    }

    /// Statistics from `start` (never earlier than the baseline) up to now.
    pub fn compute_stats_since(&self, start: f64) -> WindowStats {
        let end = self.clock;
        let start = if start.is_finite() {
            start.max(self.measure_start)
        } else {
            self.measure_start
        };
        let duration = (end - start).max(MIN_WINDOW_DURATION);
        let servers = self.servers.len() as f64;

        let served = self.histories.served.count_in_window(start, end);
        let queue_lengths: Vec<f64> = self
            .histories
            .queue_lengths
            .values_in_window(start, end)
            .into_iter()
            .map(|len| len as f64)
            .collect();
        let busy: Vec<f64> = self
            .histories
            .busy_servers
            .values_in_window(start, end)
            .into_iter()
            .map(|count| count as f64)
            .collect();
        let waits = self.histories.waits.values_in_window(start, end);
        let arrived = self.histories.arrivals.count_in_window(start, end);

        WindowStats {
            start,
            end,
            duration,
            arrived,
            served,
            balked: self.histories.balked.count_in_window(start, end),
            reneged: self.histories.reneged.count_in_window(start, end),
            avg_queue_length: mean(&queue_lengths),
            utilization_pct: ratio(mean(&busy), servers) * 100.0,
            avg_wait: mean(&waits),
            wait_p50: percentile(&waits, 0.5),
            wait_p90: percentile(&waits, 0.9),
            arrival_rate: arrived as f64 / duration,
            throughput: served as f64 / duration,
            service_rate_per_server: ratio(served as f64, servers * duration),
        }
    }
}

/// Drives a fresh engine through warm-up and the measured run.
pub fn run_simulation(config: &SimConfig, options: &RunOptions) -> RunReport {
    let mut engine = SimulationEngine::new(config);
    if options.warmup_seconds > 0.0 {
        engine.run_for(options.warmup_seconds);
        engine.start_measuring_from(engine.clock());
    }
    let ticks = engine.run_for(options.duration_seconds);
    debug!(ticks, clock = engine.clock(), "run finished");

    let metrics = engine.compute_metrics();
    let window = options
        .window_seconds
        .map(|seconds| engine.compute_window_stats(seconds));
    let assessment = assess_load(
        &metrics,
        engine.config().servers,
        engine.config().mean_service_seconds,
    );

    RunReport {
        config: engine.config().clone(),
        options: options.clone(),
        clock: engine.clock(),
        metrics,
        window,
        assessment,
    }
}

/// Part of `(prev, now]` that lies at or after `start`.
fn overlap_seconds(prev: f64, now: f64, start: f64) -> f64 {
    if now <= start {
        return 0.0;
    }
    (now - prev.max(start)).max(0.0)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QueuePolicyConfig, ServiceDistribution};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn deterministic_config(inter_arrival: f64, service: f64) -> SimConfig {
        SimConfig {
            servers: 1,
            mean_inter_arrival_seconds: inter_arrival,
            mean_service_seconds: service,
            arrival_distribution: ArrivalDistribution::Deterministic,
            service_distribution: ServiceDistribution::Deterministic,
            seed: Some(1),
            ..SimConfig::default()
        }
    }

    fn queued_ids(engine: &SimulationEngine) -> Vec<u64> {
        let mut ids: Vec<u64> = engine.shared_queue.iter().map(|c| c.id).collect();
        for server in &engine.servers {
            ids.extend(server.queue.iter().map(|c| c.id));
        }
        ids
    }

    fn in_service_ids(engine: &SimulationEngine) -> Vec<u64> {
        engine
            .servers
            .iter()
            .filter_map(|server| server.current.as_ref().map(|c| c.id))
            .collect()
    }

    #[test]
    fn reset_starts_idle_at_time_zero() {
        let config = SimConfig {
            servers: 3,
            ..SimConfig::default()
        };
        let engine = SimulationEngine::new(&config);
        let state = engine.state();
        assert_eq!(state.clock, 0.0);
        assert_eq!(state.servers.len(), 3);
        assert!(state.servers.iter().all(|server| server.current.is_none()));
        assert_eq!(state.queue_length(), 0);
        assert!(engine.next_arrival_time.is_some());
    }

    #[test]
    fn reset_clamps_configuration() {
        let config = SimConfig {
            servers: 99,
            mean_service_seconds: f64::NAN,
            ..SimConfig::default()
        };
        let engine = SimulationEngine::new(&config);
        assert_eq!(engine.config().servers, 6);
        assert_eq!(engine.config().mean_service_seconds, 20.0);
    }

    #[test]
    fn bernoulli_arrivals_have_no_schedule() {
        let config = SimConfig {
            arrival_distribution: ArrivalDistribution::BernoulliTick,
            seed: Some(5),
            ..SimConfig::default()
        };
        let engine = SimulationEngine::new(&config);
        assert!(engine.next_arrival_time.is_none());
    }

    #[test]
    fn deterministic_single_server_without_queueing() {
        let mut engine = SimulationEngine::new(&deterministic_config(5.0, 5.0));
        engine.run_for(20.0);

        let metrics = engine.compute_metrics();
        assert_eq!(metrics.arrived, 4);
        assert_eq!(metrics.served, 3);
        assert_eq!(metrics.avg_wait, 0.0);
        assert_eq!(metrics.avg_queue_length, 0.0);
        assert!(close(metrics.utilization_pct, 75.0));
        assert!(close(metrics.throughput, 0.15));
        assert!(close(metrics.arrival_rate, 0.2));
    }

    #[test]
    fn deterministic_single_server_with_queueing() {
        let mut engine = SimulationEngine::new(&deterministic_config(5.0, 7.0));
        engine.run_for(20.0);

        let metrics = engine.compute_metrics();
        assert_eq!(metrics.arrived, 4);
        assert_eq!(metrics.served, 2);
        assert!(close(metrics.avg_wait, 2.0));
        assert!(close(metrics.wait_p50, 2.0));
        assert!(close(metrics.wait_p90, 3.6));
        assert!(close(metrics.avg_queue_length, 0.3));
        assert_eq!(metrics.max_queue_length, 1);
        assert!(close(metrics.utilization_pct, 75.0));
        assert_eq!(engine.queue_length(), 1);
    }

    #[test]
    fn step_reports_arrivals_assignments_and_completions() {
        let mut engine = SimulationEngine::new(&deterministic_config(5.0, 5.0));
        for _ in 0..4 {
            assert!(engine.step().is_empty());
        }

        let events = engine.step();
        assert_eq!(events.arrivals.len(), 1);
        assert_eq!(events.assignments.len(), 1);
        assert_eq!(events.assignments[0].server_id, 0);
        assert!(events.completions.is_empty());

        for _ in 0..4 {
            engine.step();
        }
        let events = engine.step();
        assert_eq!(events.completions.len(), 1);
        assert_eq!(events.completions[0].customer.id, 1);
        assert_eq!(events.assignments[0].customer.id, 2);
        assert_eq!(engine.state().recent_served.len(), 1);
    }

    #[test]
    fn several_arrivals_fit_in_one_tick() {
        let config = SimConfig {
            tick_seconds: 5.0,
            ..deterministic_config(1.0, 100.0)
        };
        let mut engine = SimulationEngine::new(&config);
        let events = engine.step();
        assert_eq!(events.arrivals.len(), 5);
        let times: Vec<f64> = events.arrivals.iter().map(|c| c.arrival_time).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn full_queue_balks_arrivals_in_the_same_tick() {
        let config = SimConfig {
            tick_seconds: 5.0,
            max_queue: 2,
            ..deterministic_config(1.0, 100.0)
        };
        let mut engine = SimulationEngine::new(&config);
        engine.step();

        let state = engine.state();
        assert_eq!(state.total_arrived, 2);
        assert_eq!(state.total_balked, 3);
        // Customer 1 went straight into service, customer 2 waits.
        assert_eq!(in_service_ids(&engine), vec![1]);
        assert_eq!(queued_ids(&engine), vec![2]);
    }

    #[test]
    fn third_customer_balks_when_two_are_queued() {
        let config = SimConfig {
            max_queue: 2,
            ..deterministic_config(100.0, 100.0)
        };
        let mut engine = SimulationEngine::new(&config);
        let mut events = TickEvents::default();
        engine.admit(0.0, &mut events);
        engine.admit(0.0, &mut events);
        engine.admit(0.0, &mut events);

        assert_eq!(events.arrivals.len(), 2);
        assert_eq!(engine.totals.balked, 1);
        assert_eq!(engine.queue_length(), 2);
        assert!(!queued_ids(&engine).contains(&3));
    }

    #[test]
    fn impatient_customer_reneges_and_is_never_served() {
        let config = SimConfig {
            patience_seconds: 10.0,
            ..deterministic_config(50.0, 100.0)
        };
        let mut engine = SimulationEngine::new(&config);

        engine.run_for(109.0);
        assert_eq!(queued_ids(&engine), vec![2]);
        assert_eq!(engine.state().total_reneged, 0);

        engine.step();
        assert!(queued_ids(&engine).is_empty());
        assert_eq!(engine.state().total_reneged, 1);

        let mut served_ids = Vec::new();
        for _ in 0..200 {
            let events = engine.step();
            served_ids.extend(events.assignments.iter().map(|event| event.customer.id));
        }
        assert!(!served_ids.contains(&2));
    }

    #[test]
    fn same_tick_arrival_does_not_renege() {
        let config = SimConfig {
            servers: 1,
            mean_inter_arrival_seconds: 1.0,
            mean_service_seconds: 1_000.0,
            arrival_distribution: ArrivalDistribution::BernoulliTick,
            service_distribution: ServiceDistribution::Deterministic,
            patience_seconds: 0.5,
            seed: Some(11),
            ..SimConfig::default()
        };
        let mut engine = SimulationEngine::new(&config);
        for _ in 0..50 {
            let reneged_before = engine.totals.reneged;
            let queued_before = engine.queue_length() as u64;
            let events = engine.step();
            // Everyone queued before the tick has waited a full tick and leaves;
            // a customer arriving in this tick has waited 0 and stays.
            let newly_queued = events.arrivals.len() as u64
                - events.assignments.len() as u64;
            assert_eq!(engine.totals.reneged - reneged_before, queued_before);
            assert_eq!(engine.queue_length() as u64, newly_queued);
        }
    }

    #[test]
    fn scheduled_arrival_can_renege_within_its_tick() {
        let config = SimConfig {
            servers: 1,
            mean_inter_arrival_seconds: 1.0,
            mean_service_seconds: 1_000.0,
            arrival_distribution: ArrivalDistribution::Deterministic,
            service_distribution: ServiceDistribution::Deterministic,
            patience_seconds: 2.0,
            tick_seconds: 5.0,
            ..SimConfig::default()
        };
        let mut engine = SimulationEngine::new(&config);
        let events = engine.step();

        // Arrivals at 1..=5; those at 1, 2 and 3 have waited >= 2s by t=5.
        assert_eq!(events.arrivals.len(), 5);
        assert_eq!(engine.totals.reneged, 3);
        assert_eq!(engine.queue_length(), 1);
        let assigned: Vec<u64> = events
            .assignments
            .iter()
            .map(|event| event.customer.id)
            .collect();
        assert_eq!(assigned, vec![4]);
        assert_eq!(
            engine.state().customers_in_system() as u64,
            engine.totals.arrived - engine.totals.reneged
        );
    }

    #[test]
    fn priority_customers_are_served_first() {
        let config = SimConfig {
            priority_enabled: true,
            ..deterministic_config(100.0, 100.0)
        };
        let mut engine = SimulationEngine::new(&config);
        engine.servers[0].current = Some(Customer::new(99, 0.0, Priority::Normal));
        engine.servers[0].remaining_service = 50.0;
        let normal = [
            Customer::new(1, 0.0, Priority::Normal),
            Customer::new(2, 0.0, Priority::Normal),
        ];
        for customer in normal {
            assert!(engine.enqueue(customer));
        }
        assert!(engine.enqueue(Customer::new(3, 0.0, Priority::Priority)));
        assert!(engine.enqueue(Customer::new(4, 0.0, Priority::Priority)));

        assert_eq!(queued_ids(&engine), vec![3, 4, 1, 2]);
    }

    #[test]
    fn multi_queue_routes_to_shortest_line() {
        let config = SimConfig {
            servers: 3,
            policy: QueuePolicyConfig::MultiShortest,
            ..deterministic_config(100.0, 100.0)
        };
        let mut engine = SimulationEngine::new(&config);
        for id in 1..=4 {
            engine.enqueue(Customer::new(id, 0.0, Priority::Normal));
        }
        let lengths: Vec<usize> = engine.servers.iter().map(|s| s.queue.len()).collect();
        assert_eq!(lengths, vec![2, 1, 1]);
        assert_eq!(engine.shared_queue.len(), 0);
        assert_eq!(engine.dequeue_for(1).map(|c| c.id), Some(2));
    }

    #[test]
    fn conservation_holds_every_tick() {
        let policies = [QueuePolicyConfig::SingleFifo, QueuePolicyConfig::MultiShortest];
        for seed in 0..8u64 {
            for policy in policies {
                let config = SimConfig {
                    servers: 3,
                    mean_inter_arrival_seconds: 2.0,
                    mean_service_seconds: 7.0,
                    policy,
                    service_distribution: ServiceDistribution::Exponential,
                    priority_enabled: true,
                    priority_probability: 0.3,
                    max_queue: 6,
                    patience_seconds: 15.0,
                    seed: Some(seed),
                    ..SimConfig::default()
                };
                let mut engine = SimulationEngine::new(&config);
                for _ in 0..500 {
                    engine.step();
                    let state = engine.state();
                    assert_eq!(
                        state.total_arrived,
                        state.total_served
                            + state.total_reneged
                            + state.customers_in_system() as u64
                    );

                    let metrics = engine.compute_metrics();
                    assert!(metrics.avg_queue_length >= 0.0);
                    assert!(metrics.utilization_pct >= 0.0);
                    assert!(metrics.utilization_pct <= 100.0 + 1e-9);
                    assert!(metrics.total_busy <= 3.0 * metrics.measured_seconds + 1e-9);
                }
            }
        }
    }

    #[test]
    fn customers_are_never_duplicated() {
        let config = SimConfig {
            servers: 4,
            mean_inter_arrival_seconds: 1.0,
            policy: QueuePolicyConfig::MultiShortest,
            priority_enabled: true,
            priority_probability: 0.5,
            seed: Some(3),
            ..SimConfig::default()
        };
        let mut engine = SimulationEngine::new(&config);
        for _ in 0..300 {
            engine.step();
            let mut ids = queued_ids(&engine);
            ids.extend(in_service_ids(&engine));
            let total = ids.len();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), total);
        }
    }

    #[test]
    fn same_seed_same_trajectory() {
        let config = SimConfig {
            servers: 2,
            priority_enabled: true,
            patience_seconds: 30.0,
            max_queue: 5,
            seed: Some(2024),
            ..SimConfig::default()
        };
        let mut a = SimulationEngine::new(&config);
        let mut b = SimulationEngine::new(&config);
        for _ in 0..400 {
            assert_eq!(a.step(), b.step());
            assert_eq!(a.state(), b.state());
        }
        assert_eq!(a.compute_metrics(), b.compute_metrics());
    }

    #[test]
    fn reference_scenario_is_reproducible() {
        let config = SimConfig {
            servers: 1,
            mean_inter_arrival_seconds: 5.0,
            mean_service_seconds: 5.0,
            service_distribution: ServiceDistribution::Deterministic,
            seed: Some(1),
            ..SimConfig::default()
        };
        let run = || {
            let mut engine = SimulationEngine::new(&config);
            for _ in 0..100 {
                engine.step();
            }
            let state = engine.state();
            state.total_arrived + state.total_served
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn reset_replays_the_seeded_run() {
        let config = SimConfig {
            seed: Some(9),
            ..SimConfig::default()
        };
        let mut engine = SimulationEngine::new(&config);
        engine.run_for(300.0);
        let first = engine.compute_metrics();

        engine.reset(&config);
        assert_eq!(engine.clock(), 0.0);
        engine.run_for(300.0);
        assert_eq!(engine.compute_metrics(), first);
    }

    #[test]
    fn metrics_are_zero_before_any_tick() {
        let engine = SimulationEngine::default();
        let metrics = engine.compute_metrics();
        assert_eq!(metrics, Metrics::default());
    }

    #[test]
    fn rebaseline_discards_earlier_contribution() {
        let mut engine = SimulationEngine::new(&deterministic_config(5.0, 7.0));
        engine.run_for(20.0);
        assert_eq!(engine.queue_length(), 1);

        engine.start_measuring_from(engine.clock());
        let state = engine.state();
        assert_eq!(state.measure_start, 20.0);
        assert_eq!(state.total_arrived, 0);
        assert_eq!(state.total_served, 0);
        assert_eq!(state.queue_length_area, 0.0);
        assert_eq!(state.max_queue_length, 1);
        assert!(state.servers.iter().all(|s| s.busy_time == 0.0));
        assert_eq!(engine.compute_metrics().measured_seconds, 0.0);
        assert!(engine
            .shared_queue
            .iter()
            .all(|customer| customer.arrival_time >= 20.0));

        // Customer 3 finishes at 26 and the customer queued at 20 starts with
        // its wait measured from the baseline.
        engine.run_for(6.0);
        let metrics = engine.compute_metrics();
        assert_eq!(metrics.served, 1);
        assert!(close(metrics.avg_wait, 6.0));
        assert!(close(metrics.utilization_pct, 100.0));
    }

    #[test]
    fn future_baseline_skips_ticks_before_it() {
        let mut engine = SimulationEngine::new(&deterministic_config(5.0, 5.0));
        engine.start_measuring_from(10.5);
        engine.run_for(12.0);
        // Arrival at 15 is not yet reached; 10 was before the baseline.
        let metrics = engine.compute_metrics();
        assert_eq!(metrics.arrived, 0);
        assert!(close(metrics.measured_seconds, 1.5));
        // Busy for the measured part of ticks 11 and 12 only.
        assert!(close(engine.state().servers[0].busy_time, 1.5));
    }

    #[test]
    fn window_stats_follow_histories() {
        let mut engine = SimulationEngine::new(&deterministic_config(5.0, 5.0));
        engine.run_for(20.0);

        let window = engine.compute_window_stats(10.0);
        assert_eq!(window.start, 10.0);
        assert_eq!(window.end, 20.0);
        assert_eq!(window.arrived, 3);
        assert_eq!(window.served, 3);
        assert!(close(window.utilization_pct, 100.0));
        assert_eq!(window.avg_wait, 0.0);
        assert!(close(window.throughput, 0.3));

        let since = engine.compute_stats_since(-50.0);
        assert_eq!(since.start, 0.0);
        assert_eq!(since.arrived, 4);
    }

    #[test]
    fn window_defaults_for_bad_input() {
        let mut engine = SimulationEngine::new(&deterministic_config(5.0, 5.0));
        engine.run_for(100.0);
        assert_eq!(engine.compute_window_stats(f64::NAN).start, 40.0);
        assert_eq!(engine.compute_window_stats(0.2).start, 99.0);
    }

    #[test]
    fn window_stats_before_first_tick_are_zero() {
        let engine = SimulationEngine::default();
        let window = engine.compute_window_stats(60.0);
        assert_eq!(window.arrived, 0);
        assert_eq!(window.arrival_rate, 0.0);
        assert_eq!(window.utilization_pct, 0.0);
        assert!(window.duration > 0.0);
    }

    #[test]
    fn recent_served_entries_expire() {
        let mut engine = SimulationEngine::new(&deterministic_config(100.0, 5.0));
        engine.run_for(105.0);
        assert_eq!(engine.state().recent_served.len(), 1);
        engine.run_for(8.0);
        assert!(engine.state().recent_served.is_empty());
    }

    #[test]
    fn run_simulation_discards_warmup() {
        let options = RunOptions {
            duration_seconds: 20.0,
            warmup_seconds: 20.0,
            window_seconds: Some(10.0),
        };
        let report = run_simulation(&deterministic_config(5.0, 7.0), &options);
        assert_eq!(report.clock, 40.0);
        assert_eq!(report.metrics.measured_seconds, 20.0);
        assert!(close(report.metrics.utilization_pct, 100.0));
        assert_eq!(report.window.map(|window| window.start), Some(30.0));
    }

    #[test]
    fn overlap_counts_only_measured_part() {
        assert_eq!(overlap_seconds(0.0, 1.0, 0.0), 1.0);
        assert_eq!(overlap_seconds(0.0, 1.0, 0.5), 0.5);
        assert_eq!(overlap_seconds(0.0, 1.0, 2.0), 0.0);
        assert_eq!(overlap_seconds(3.0, 4.0, 1.0), 1.0);
    }
}
