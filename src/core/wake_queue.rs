//! Deadline-ordered queue of sleeping threads.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::machine::Tick;

/// A thread waiting for its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWake<T> {
    /// Earliest tick at which the thread may be woken.
    pub wake_time: Tick,
    /// The sleeping thread.
    pub thread: T,
}

/// Heap entry ordered earliest deadline first, FIFO among equal deadlines.
struct Entry<T> {
    wake: PendingWake<T>,
    seq: u64,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
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
        // Reversed for the max-heap: earlier deadline, then earlier insertion.
        other
            .wake
            .wake_time
            .cmp(&self.wake.wake_time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-heap of [`PendingWake`] entries keyed by `wake_time`.
///
/// O(log n) insertion and removal.
pub struct WakeQueue<T> {
    entries: BinaryHeap<Entry<T>>,
    next_seq: u64,
}

impl<T> Default for WakeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WakeQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty queue with room for `capacity` sleepers.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: BinaryHeap::with_capacity(capacity),
            next_seq: 0,
        }
    }

    /// Insert `thread` to be woken at or after `wake_time`.
    pub fn push(&mut self, wake_time: Tick, thread: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry {
            wake: PendingWake { wake_time, thread },
            seq,
        });
    }

    /// Earliest deadline in the queue.
    pub fn next_deadline(&self) -> Option<Tick> {
        self.entries.peek().map(|e| e.wake.wake_time)
    }

    /// Remove the earliest entry if its deadline is `<= now`.
    pub fn pop_elapsed(&mut self, now: Tick) -> Option<PendingWake<T>> {
        if self.next_deadline()? > now {
            return None;
        }
        self.entries.pop().map(|e| e.wake)
    }

    /// Remove every entry whose deadline is `<= now`, earliest first.
    pub fn drain_elapsed(&mut self, now: Tick) -> Vec<PendingWake<T>> {
        let mut woken = Vec::new();
        while let Some(wake) = self.pop_elapsed(now) {
            woken.push(wake);
        }
        woken
    }

    /// Number of sleepers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nobody is sleeping.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
