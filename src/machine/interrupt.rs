//! Interrupt mask for the hosted machine.
//!
//! Masking interrupts gives a thread exclusive ownership of the machine with
//! respect to the timer interrupt path. Ownership is reentrant: a thread that
//! already holds the mask can disable again, and the outer guard restores the
//! enabled state.

use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

/// Interrupt state observed before a call to [`Interrupt::disable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntStatus {
    /// Interrupts were enabled for the calling thread.
    Enabled,
    /// The calling thread already had interrupts masked.
    Disabled,
}

#[derive(Debug, Default)]
struct MaskState {
    holder: Option<ThreadId>,
    depth: usize,
}

/// The machine's interrupt controller.
#[derive(Debug, Default)]
pub struct Interrupt {
    state: Mutex<MaskState>,
    released: Condvar,
}

impl Interrupt {
    /// Create a controller with interrupts enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mask interrupts for the calling thread.
    ///
    /// Blocks while another thread holds the mask. The returned guard restores
    /// the previous state when dropped.
    pub fn disable(&self) -> IntrGuard<'_> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        let previous = if state.holder == Some(me) {
            IntStatus::Disabled
        } else {
            while state.holder.is_some() {
                self.released.wait(&mut state);
            }
            state.holder = Some(me);
            IntStatus::Enabled
        };
        state.depth += 1;
        IntrGuard {
            interrupt: self,
            previous,
        }
    }

    /// Whether interrupts are enabled for the calling thread.
    pub fn enabled(&self) -> bool {
        self.state.lock().holder != Some(thread::current().id())
    }

    fn restore(&self) {
        let mut state = self.state.lock();
        debug_assert_eq!(state.holder, Some(thread::current().id()));
        state.depth -= 1;
        if state.depth == 0 {
            state.holder = None;
            drop(state);
            self.released.notify_one();
        }
    }

    /// Give up the mask entirely while the calling thread is suspended.
    ///
    /// Returns the nesting depth to hand back to [`Self::reacquire_after_switch`].
    pub(crate) fn release_for_switch(&self) -> usize {
        let mut state = self.state.lock();
        assert_eq!(
            state.holder,
            Some(thread::current().id()),
            "thread suspended without masking interrupts"
        );
        let depth = std::mem::take(&mut state.depth);
        state.holder = None;
        drop(state);
        self.released.notify_one();
        depth
    }

    /// Take the mask back after a suspended thread resumes.
    pub(crate) fn reacquire_after_switch(&self, depth: usize) {
        let mut state = self.state.lock();
        while state.holder.is_some() {
            self.released.wait(&mut state);
        }
        state.holder = Some(thread::current().id());
        state.depth = depth;
    }
}

/// Proof that the current thread has interrupts masked.
///
/// Dropping the guard restores the state observed when it was created.
#[must_use = "interrupts are re-enabled as soon as the guard is dropped"]
pub struct IntrGuard<'a> {
    interrupt: &'a Interrupt,
    previous: IntStatus,
}

impl<'a> IntrGuard<'a> {
    /// State before this guard masked interrupts.
    pub const fn previous(&self) -> IntStatus {
        self.previous
    }

    pub(crate) const fn interrupt(&self) -> &'a Interrupt {
        self.interrupt
    }
}

impl Drop for IntrGuard<'_> {
    fn drop(&mut self) {
        self.interrupt.restore();
    }
}
