use serde::Serialize;

/// Service class of a customer. `Priority` sorts ahead of `Normal`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Priority,
    #[default]
    Normal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Customer {
    pub id: u64,
    /// Effective arrival time in simulated seconds. Raised on re-baseline.
    pub arrival_time: f64,
    pub priority: Priority,
}

impl Customer {
    pub fn new(id: u64, arrival_time: f64, priority: Priority) -> Self {
        Self {
            id,
            arrival_time,
            priority,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServerEvent {
    pub server_id: usize,
    pub customer: Customer,
}

/// Everything that happened during one tick, for rendering collaborators.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TickEvents {
    pub arrivals: Vec<Customer>,
    pub assignments: Vec<ServerEvent>,
    pub completions: Vec<ServerEvent>,
}

impl TickEvents {
    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty() && self.assignments.is_empty() && self.completions.is_empty()
    }
}
