//! Simulated hardware timer.
//!
//! Time is a monotonic tick count advanced explicitly through
//! [`Timer::advance`]. Every `interrupt_period` ticks the installed interrupt
//! handler runs on the advancing thread. [`TimerDriver`] advances the timer
//! from a dedicated OS thread at a fixed real-time rate.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::core::KernelError;

/// Discrete unit of simulated time.
pub type Tick = u64;

type Handler = Arc<dyn Fn() + Send + Sync>;

/// Tick counter with a periodic interrupt callback.
pub struct Timer {
    now: AtomicU64,
    interrupt_period: u64,
    handler: Mutex<Option<Handler>>,
}

impl Timer {
    /// Create a timer at tick 0 that interrupts every `interrupt_period` ticks.
    ///
    /// A period of 0 is treated as 1.
    pub fn new(interrupt_period: u64) -> Self {
        Self {
            now: AtomicU64::new(0),
            interrupt_period: interrupt_period.max(1),
            handler: Mutex::new(None),
        }
    }

    /// Current tick count.
    pub fn get_time(&self) -> Tick {
        self.now.load(Ordering::SeqCst)
    }

    /// Ticks between two interrupts.
    pub const fn interrupt_period(&self) -> u64 {
        self.interrupt_period
    }

    /// Install the interrupt handler, replacing any previous one.
    pub fn set_interrupt_handler<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.handler.lock() = Some(Arc::new(handler));
    }

    /// Remove the interrupt handler.
    pub fn clear_interrupt_handler(&self) {
        self.handler.lock().take();
    }

    /// Advance time by `ticks`, firing the handler at every period boundary.
    ///
    /// Returns the number of interrupts delivered.
    pub fn advance(&self, ticks: u64) -> u64 {
        let mut fired = 0;
        for _ in 0..ticks {
            let now = self.now.fetch_add(1, Ordering::SeqCst) + 1;
            if now % self.interrupt_period == 0 {
                fired += 1;
                self.fire();
            }
        }
        fired
    }

    fn fire(&self) {
        // Clone out so the handler runs without the slot locked.
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler();
        }
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("now", &self.get_time())
            .field("interrupt_period", &self.interrupt_period)
            .finish_non_exhaustive()
    }
}

/// Background thread advancing a [`Timer`] one interrupt period per `period`.
///
/// Stops when [`TimerDriver::stop`] is called or the driver is dropped.
pub struct TimerDriver {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TimerDriver {
    /// Start driving `timer` in real time.
    pub fn start(timer: Arc<Timer>, period: Duration) -> Result<Self, KernelError> {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let handle = thread::Builder::new()
            .name("timer-driver".into())
            .spawn(move || {
                debug!(?period, "timer driver started");
                loop {
                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => {
                            timer.advance(timer.interrupt_period());
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!(now = timer.get_time(), "timer driver stopped");
            })
            .map_err(|e| KernelError::Spawn(e.to_string()))?;

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stop the driver and wait for its thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the channel and ends the loop.
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("timer driver thread panicked");
            }
        }
    }
}

impl Drop for TimerDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
