//! Deterministic discrete-event scheduler.
//!
//! Tasks are ordered by time, then by submission order, so two tasks scheduled for
//! the same millisecond always run in the order they were scheduled.
use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

struct Entry<T> {
    at: u64,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

/// Simulated clock plus a queue of future tasks, time in milliseconds.
pub struct Scheduler<T> {
    now: u64,
    seq: u64,
    queue: BinaryHeap<Reverse<Entry<T>>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Create a scheduler at time zero.
    pub fn new() -> Self {
        Self {
            now: 0,
            seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Schedule `task` at absolute time `at`. A time in the past runs at the current time.
    pub fn schedule_at(&mut self, at: u64, task: T) {
        let at = at.max(self.now);
        self.seq += 1;
        self.queue.push(Reverse(Entry {
            at,
            seq: self.seq,
            task,
        }));
    }

    /// Schedule `task` after `delay` ms.
    pub fn schedule_after(&mut self, delay: u64, task: T) {
        self.schedule_at(self.now.saturating_add(delay), task)
    }

    /// Time of the next task.
    pub fn peek_time(&self) -> Option<u64> {
        self.queue.peek().map(|Reverse(e)| e.at)
    }

    /// Pop the next task if it is due no later than `until`, moving the clock to its time.
    pub fn pop_until(&mut self, until: u64) -> Option<(u64, T)> {
        match self.peek_time() {
            Some(at) if at <= until => {
                let Reverse(entry) = self.queue.pop()?;
                self.now = entry.at;
                Some((entry.at, entry.task))
            }
            _ => None,
        }
    }

    /// Move the clock forward, never backward.
    pub fn advance_to(&mut self, t: u64) {
        if t > self.now {
            self.now = t;
        }
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no task is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
