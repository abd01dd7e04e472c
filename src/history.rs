use std::collections::VecDeque;

/// Fixed-capacity log of timestamped samples.
///
/// Samples must be pushed in non-decreasing time order; once full, the oldest
/// sample is dropped for every new one. Window queries walk from the newest
/// sample backwards and stop at the first sample older than the window.
#[derive(Clone, Debug)]
pub struct History<T> {
    entries: VecDeque<(f64, T)>,
    capacity: usize,
}

impl<T: Copy> History<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, time: f64, value: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((time, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn oldest_time(&self) -> Option<f64> {
        self.entries.front().map(|(time, _)| *time)
    }

    fn window(&self, start: f64, end: f64) -> impl Iterator<Item = &(f64, T)> {
        self.entries
            .iter()
            .rev()
            .skip_while(move |(time, _)| *time > end)
            .take_while(move |(time, _)| *time >= start)
    }

    /// Number of samples with `start <= time <= end`.
    pub fn count_in_window(&self, start: f64, end: f64) -> usize {
        self.window(start, end).count()
    }

    /// Values with `start <= time <= end`, newest first.
    pub fn values_in_window(&self, start: f64, end: f64) -> Vec<T> {
        self.window(start, end).map(|(_, value)| *value).collect()
    }
}

/// Timestamps of discrete outcomes (arrivals, completions, balks, reneges).
pub type EventLog = History<()>;

impl EventLog {
    pub fn record(&mut self, time: f64) {
        self.push(time, ());
    }
}
