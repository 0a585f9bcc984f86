//! Generation counter that waiters can block on.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Broadcast "something changed" signal.
///
/// Waiters capture [`ChangeSignal::generation`] before inspecting shared
/// state, then block in [`ChangeSignal::wait_past`] so no change made after
/// the capture can be missed.
#[derive(Debug, Default)]
pub struct ChangeSignal {
    generation: Mutex<u64>,
    changed: Condvar,
}

impl ChangeSignal {
    /// Create a signal at generation 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Publish a change and wake every waiter.
    pub fn advance(&self) {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.changed.notify_all();
    }

    /// Block until the generation moves past `seen` or `timeout` elapses.
    ///
    /// Returns whether a change was observed.
    pub fn wait_past(&self, seen: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut generation = self.generation.lock();
        while *generation <= seen {
            if self.changed.wait_until(&mut generation, deadline).timed_out() {
                return *generation > seen;
            }
        }
        true
    }
}
