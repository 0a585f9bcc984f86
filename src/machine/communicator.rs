//! Rendezvous channel.
//!
//! A [`Communicator`] pairs exactly one `speak` with exactly one `listen`.
//! Both sides block until the pairing happens; the spoken value is handed to
//! the listener and each value is delivered once.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

struct Channel<T> {
    slot: Option<T>,
    delivered: u64,
    waiting_speakers: usize,
}

/// Single-value rendezvous channel.
pub struct Communicator<T> {
    state: Mutex<Channel<T>>,
    value_ready: Condvar,
    handed_off: Condvar,
    slot_free: Condvar,
}

impl<T> Default for Communicator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Communicator<T> {
    /// Create an empty channel.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Channel {
                slot: None,
                delivered: 0,
                waiting_speakers: 0,
            }),
            value_ready: Condvar::new(),
            handed_off: Condvar::new(),
            slot_free: Condvar::new(),
        }
    }

    /// Hand `value` to a listener, blocking until one has taken it.
    pub fn speak(&self, value: T) {
        let mut state = self.state.lock();
        state.waiting_speakers += 1;
        while state.slot.is_some() {
            self.slot_free.wait(&mut state);
        }
        state.slot = Some(value);
        let ticket = state.delivered;
        self.value_ready.notify_one();
        while state.delivered == ticket {
            self.handed_off.wait(&mut state);
        }
        state.waiting_speakers -= 1;
    }

    /// Block until a speaker pairs, then return its value.
    pub fn listen(&self) -> T {
        let mut state = self.state.lock();
        loop {
            if let Some(value) = self.take(&mut state) {
                return value;
            }
            self.value_ready.wait(&mut state);
        }
    }

    /// Like [`Self::listen`], giving up after `timeout` without a speaker.
    pub fn listen_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(value) = self.take(&mut state) {
                return Some(value);
            }
            if self.value_ready.wait_until(&mut state, deadline).timed_out() {
                return self.take(&mut state);
            }
        }
    }

    fn take(&self, state: &mut Channel<T>) -> Option<T> {
        let value = state.slot.take()?;
        state.delivered += 1;
        self.handed_off.notify_all();
        self.slot_free.notify_one();
        Some(value)
    }

    /// Speakers currently blocked waiting for a listener.
    pub fn waiting_speakers(&self) -> usize {
        self.state.lock().waiting_speakers
    }
}

impl<T> fmt::Debug for Communicator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Communicator")
            .field("delivered", &state.delivered)
            .field("waiting_speakers", &state.waiting_speakers)
            .finish()
    }
}
