//! Non-reentrant exclusion lock that suspends waiters.
//!
//! The lock is instrumented: it counts acquisitions and remembers the highest
//! number of holders ever observed inside the critical section, which must
//! never exceed one.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::machine::thread::KThread;

/// Kernel exclusion lock.
pub struct Lock {
    name: String,
    holder: Mutex<Option<u64>>,
    available: Condvar,
    occupancy: AtomicUsize,
    max_occupancy: AtomicUsize,
    acquisitions: AtomicU64,
}

impl Lock {
    /// Create an unheld lock.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            holder: Mutex::new(None),
            available: Condvar::new(),
            occupancy: AtomicUsize::new(0),
            max_occupancy: AtomicUsize::new(0),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Acquire the lock, suspending while another thread holds it.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread already holds the lock.
    pub fn acquire(&self) -> LockGuard<'_> {
        let me = KThread::current().id();
        let mut holder = self.holder.lock();
        assert_ne!(*holder, Some(me), "lock `{}` re-acquired by its holder", self.name);
        while holder.is_some() {
            self.available.wait(&mut holder);
        }
        *holder = Some(me);
        drop(holder);
        self.enter(me)
    }

    /// Acquire the lock only if nobody holds it.
    pub fn try_acquire(&self) -> Option<LockGuard<'_>> {
        let me = KThread::current().id();
        let mut holder = self.holder.lock();
        if holder.is_some() {
            return None;
        }
        *holder = Some(me);
        drop(holder);
        Some(self.enter(me))
    }

    fn enter(&self, owner: u64) -> LockGuard<'_> {
        let inside = self.occupancy.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_occupancy.fetch_max(inside, Ordering::AcqRel);
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        LockGuard {
            lock: self,
            owner,
            _not_send: PhantomData,
        }
    }

    fn release(&self, owner: u64) {
        self.occupancy.fetch_sub(1, Ordering::AcqRel);
        let mut holder = self.holder.lock();
        assert_eq!(*holder, Some(owner), "lock `{}` released by a non-holder", self.name);
        *holder = None;
        drop(holder);
        self.available.notify_one();
    }

    /// Whether any thread holds the lock right now.
    pub fn is_held(&self) -> bool {
        self.holder.lock().is_some()
    }

    /// Whether the calling thread holds the lock.
    pub fn is_held_by_current(&self) -> bool {
        *self.holder.lock() == Some(KThread::current().id())
    }

    /// Number of successful acquisitions so far.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Highest number of simultaneous holders ever observed.
    pub fn max_occupancy(&self) -> usize {
        self.max_occupancy.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("name", &self.name)
            .field("held", &self.is_held())
            .field("acquisitions", &self.acquisitions())
            .finish()
    }
}

/// Ownership of a [`Lock`]; released on drop by the acquiring thread.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    lock: &'a Lock,
    owner: u64,
    // Release must happen on the acquiring thread.
    _not_send: PhantomData<*const ()>,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release(self.owner);
    }
}
