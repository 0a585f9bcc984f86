//! Timer-driven wake scheduler.
//!
//! Threads call [`Alarm::sleep_for`] to suspend for at least a number of
//! ticks. The timer interrupt runs [`Alarm::on_timer_tick`], which makes every
//! thread whose deadline has elapsed runnable again.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::core::wake_queue::WakeQueue;
use crate::machine::{KThread, Machine, Tick};

/// Wake scheduler bound to one machine's timer.
///
/// A thread with deadline `D` becomes runnable during the first timer
/// interrupt at which `now >= D`, never earlier.
pub struct Alarm {
    machine: Arc<Machine>,
    /// Only touched with interrupts masked.
    queue: Mutex<WakeQueue<KThread>>,
}

impl Alarm {
    /// Create an alarm and install it as the machine's timer interrupt handler.
    ///
    /// A machine supports one alarm; creating another replaces the handler.
    pub fn new(machine: Arc<Machine>) -> Arc<Self> {
        let alarm = Arc::new(Self {
            machine,
            queue: Mutex::new(WakeQueue::new()),
        });
        let weak = Arc::downgrade(&alarm);
        alarm.machine.timer().set_interrupt_handler(move || {
            if let Some(alarm) = weak.upgrade() {
                alarm.on_timer_tick();
            }
        });
        alarm
    }

    /// Machine this alarm is attached to.
    pub fn machine(&self) -> &Arc<Machine> {
        &self.machine
    }

    /// Suspend the calling thread for at least `min_ticks` ticks.
    ///
    /// The caller's interrupt state is restored on return.
    pub fn sleep_for(&self, min_ticks: u64) {
        let guard = self.machine.interrupt().disable();
        let deadline = self.machine.timer().get_time().saturating_add(min_ticks);
        let me = KThread::current();
        debug!(thread = me.name(), deadline, "sleeping");
        self.queue.lock().push(deadline, me);
        KThread::sleep(&guard);
    }

    /// Timer interrupt handler: wake every thread whose deadline has elapsed,
    /// then yield.
    pub fn on_timer_tick(&self) {
        {
            let guard = self.machine.interrupt().disable();
            let now = self.machine.timer().get_time();
            let mut queue = self.queue.lock();
            while let Some(wake) = queue.pop_elapsed(now) {
                trace!(thread = wake.thread.name(), deadline = wake.wake_time, now, "waking");
                wake.thread.ready(&guard);
            }
        }
        KThread::yield_now();
    }

    /// Number of sleeping threads.
    pub fn pending(&self) -> usize {
        let _guard = self.machine.interrupt().disable();
        self.queue.lock().len()
    }

    /// Earliest deadline among sleeping threads.
    pub fn next_deadline(&self) -> Option<Tick> {
        let _guard = self.machine.interrupt().disable();
        self.queue.lock().next_deadline()
    }
}

impl std::fmt::Debug for Alarm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Alarm")
            .field("machine", &self.machine)
            .field("pending", &self.queue.lock().len())
            .finish()
    }
}
