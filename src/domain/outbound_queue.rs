//! FIFO of user messages waiting for an open transport.

use std::collections::VecDeque;

/// Ordered, not-yet-delivered message payloads.
///
/// A payload leaves the queue only after it has been handed to the
/// transport; a failed hand-off leaves it (and everything behind it) in
/// place.
#[derive(Debug, Default, Clone)]
pub struct OutboundQueue {
    pending: VecDeque<String>,
}

impl OutboundQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a payload at the back.
    pub fn push(&mut self, payload: impl Into<String>) {
        self.pending.push_back(payload.into());
    }

    /// Drains front to back through `deliver`.
    ///
    /// `deliver` returns `true` once the payload has been handed off. The
    /// first `false` stops the drain with that payload still at the front.
    /// Returns the number of payloads delivered.
    pub fn drain_into<F>(&mut self, mut deliver: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let mut delivered = 0;
        while let Some(front) = self.pending.front() {
            if !deliver(front) {
                break;
            }
            self.pending.pop_front();
            delivered += 1;
        }
        delivered
    }

    /// Number of queued payloads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Copies the queued payloads in delivery order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.pending.iter().cloned().collect()
    }
}
