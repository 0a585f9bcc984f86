//! Hosted machine: interrupt mask, timer, kernel threads and kernel
//! synchronization primitives, built on OS threads and `parking_lot`.

pub mod communicator;
pub mod interrupt;
pub mod lock;
pub mod signal;
pub mod thread;
pub mod timer;

use std::sync::Arc;
use std::time::Duration;

pub use communicator::Communicator;
pub use interrupt::{IntStatus, Interrupt, IntrGuard};
pub use lock::{Lock, LockGuard};
pub use signal::ChangeSignal;
pub use thread::{KThread, ThreadStatus};
pub use timer::{Tick, Timer, TimerDriver};

use crate::config::TimerConfig;
use crate::core::KernelError;

/// A machine: one interrupt controller and one timer.
#[derive(Debug)]
pub struct Machine {
    interrupt: Interrupt,
    timer: Arc<Timer>,
}

impl Machine {
    /// Create a machine whose timer interrupts every `interrupt_period` ticks.
    pub fn new(interrupt_period: u64) -> Arc<Self> {
        Arc::new(Self {
            interrupt: Interrupt::new(),
            timer: Arc::new(Timer::new(interrupt_period)),
        })
    }

    /// Create a machine from validated timer configuration.
    pub fn from_config(cfg: &TimerConfig) -> Result<Arc<Self>, KernelError> {
        cfg.validate().map_err(KernelError::InvalidConfig)?;
        Ok(Self::new(cfg.interrupt_period))
    }

    /// Interrupt controller.
    pub const fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Timer device.
    pub const fn timer(&self) -> &Arc<Timer> {
        &self.timer
    }

    /// Drive the timer in real time, one interrupt period per `period`.
    pub fn start_timer(&self, period: Duration) -> Result<TimerDriver, KernelError> {
        TimerDriver::start(Arc::clone(&self.timer), period)
    }
}
