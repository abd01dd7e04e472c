use std::collections::VecDeque;

use crate::events::Customer;

/// Waiting line of customers.
///
/// With priority ordering on, a customer is inserted ahead of the first queued
/// customer of a strictly lower class, so classes stay grouped and each class
/// keeps its arrival order. Without it the queue is a plain FIFO.
#[derive(Clone, Debug, Default)]
pub struct CustomerQueue {
    items: VecDeque<Customer>,
}

impl CustomerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, customer: Customer, priority_ordering: bool) {
        if !priority_ordering {
            self.items.push_back(customer);
            return;
        }
        match self
            .items
            .iter()
            .position(|queued| queued.priority > customer.priority)
        {
            Some(idx) => self.items.insert(idx, customer),
            None => self.items.push_back(customer),
        }
    }

    pub fn pop_front(&mut self) -> Option<Customer> {
        self.items.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Customer> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Customer> {
        self.items.iter_mut()
    }

    /// Removes every customer matching `leave`, keeping the others in order.
    /// Returns how many were removed.
    pub fn remove_where<F>(&mut self, mut leave: F) -> usize
    where
        F: FnMut(&Customer) -> bool,
    {
        let before = self.items.len();
        self.items.retain(|customer| !leave(customer));
        before - self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
