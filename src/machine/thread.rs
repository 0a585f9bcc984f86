//! Kernel threads.
//!
//! A [`KThread`] is a cheap, cloneable handle to a thread control block. Each
//! forked kernel thread runs on its own OS thread; suspension and resumption
//! go through a per-thread wakeup permit so a `ready` that races ahead of
//! the matching `sleep` is never lost.

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::core::KernelError;
use crate::machine::interrupt::IntrGuard;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: RefCell<Option<KThread>> = const { RefCell::new(None) };
}

/// Lifecycle of a kernel thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    /// Created, not forked yet.
    New,
    /// Runnable, waiting for the processor.
    Ready,
    /// Executing.
    Running,
    /// Suspended until made ready.
    Blocked,
    /// Routine returned.
    Finished,
}

type Routine = Box<dyn FnOnce() + Send + 'static>;

struct Tcb {
    id: u64,
    name: String,
    status: Mutex<ThreadStatus>,
    wakeup: Mutex<bool>,
    wakeup_cv: Condvar,
    routine: Mutex<Option<Routine>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a kernel thread.
#[derive(Clone)]
pub struct KThread {
    tcb: Arc<Tcb>,
}

impl KThread {
    /// Create a thread that will run `routine` once forked.
    pub fn new<F>(name: impl Into<String>, routine: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::with_parts(name.into(), ThreadStatus::New, Some(Box::new(routine)))
    }

    fn with_parts(name: String, status: ThreadStatus, routine: Option<Routine>) -> Self {
        Self {
            tcb: Arc::new(Tcb {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                name,
                status: Mutex::new(status),
                wakeup: Mutex::new(false),
                wakeup_cv: Condvar::new(),
                routine: Mutex::new(routine),
                join: Mutex::new(None),
            }),
        }
    }

    /// Handle for an OS thread that was not created through [`KThread::fork`].
    fn adopt() -> Self {
        let name = std::thread::current()
            .name()
            .unwrap_or("main")
            .to_owned();
        Self::with_parts(name, ThreadStatus::Running, None)
    }

    /// Handle of the calling thread.
    pub fn current() -> Self {
        CURRENT.with(|slot| slot.borrow_mut().get_or_insert_with(Self::adopt).clone())
    }

    /// Unique thread identifier.
    pub fn id(&self) -> u64 {
        self.tcb.id
    }

    /// Thread name.
    pub fn name(&self) -> &str {
        &self.tcb.name
    }

    /// Current lifecycle state.
    pub fn status(&self) -> ThreadStatus {
        *self.tcb.status.lock()
    }

    fn set_status(&self, status: ThreadStatus) {
        *self.tcb.status.lock() = status;
    }

    /// Start the thread's routine concurrently with the caller.
    pub fn fork(&self) -> Result<(), KernelError> {
        let routine = self
            .tcb
            .routine
            .lock()
            .take()
            .ok_or_else(|| {
                KernelError::Spawn(format!("thread `{}` already forked", self.name()))
            })?;

        self.set_status(ThreadStatus::Ready);
        let me = self.clone();
        let handle = std::thread::Builder::new()
            .name(self.tcb.name.clone())
            .spawn(move || {
                CURRENT.with(|slot| *slot.borrow_mut() = Some(me.clone()));
                me.set_status(ThreadStatus::Running);
                routine();
                me.set_status(ThreadStatus::Finished);
                debug!(thread = me.name(), "kernel thread finished");
            })
            .map_err(|e| KernelError::Spawn(e.to_string()))?;

        *self.tcb.join.lock() = Some(handle);
        Ok(())
    }

    /// Wait for a forked thread to finish.
    ///
    /// Returns immediately for threads that were never forked or were
    /// already joined.
    pub fn join(&self) -> Result<(), KernelError> {
        let handle = self.tcb.join.lock().take();
        match handle {
            Some(handle) => handle
                .join()
                .map_err(|_| KernelError::ThreadPanicked(self.name().to_owned())),
            None => Ok(()),
        }
    }

    /// Relinquish the processor; the caller stays runnable.
    pub fn yield_now() {
        std::thread::yield_now();
    }

    /// Suspend the calling thread until another thread calls [`KThread::ready`].
    ///
    /// Interrupts must be masked; the mask is handed over while the thread is
    /// suspended and taken back before returning.
    pub fn sleep(guard: &IntrGuard<'_>) {
        let me = Self::current();
        me.set_status(ThreadStatus::Blocked);

        let interrupt = guard.interrupt();
        let depth = interrupt.release_for_switch();
        {
            let mut woken = me.tcb.wakeup.lock();
            while !*woken {
                me.tcb.wakeup_cv.wait(&mut woken);
            }
            *woken = false;
        }
        interrupt.reacquire_after_switch(depth);
        me.set_status(ThreadStatus::Running);
    }

    /// Make a suspended thread runnable. Does not yield.
    pub fn ready(&self, _guard: &IntrGuard<'_>) {
        self.set_status(ThreadStatus::Ready);
        let mut woken = self.tcb.wakeup.lock();
        *woken = true;
        self.tcb.wakeup_cv.notify_one();
    }
}

impl PartialEq for KThread {
    fn eq(&self, other: &Self) -> bool {
        self.tcb.id == other.tcb.id
    }
}

impl Eq for KThread {}

impl fmt::Debug for KThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KThread")
            .field("id", &self.tcb.id)
            .field("name", &self.tcb.name)
            .field("status", &self.status())
            .finish()
    }
}
