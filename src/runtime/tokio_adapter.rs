//! Tokio adapters: run a ferry without blocking the async executor, and
//! drive a machine timer from a tokio interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::FerryConfig;
use crate::core::{BoatActions, Ferry, FerryError, FerryOutcome, KernelError};
use crate::machine::Timer;

/// Run a ferry on tokio's blocking pool and await its outcome.
pub async fn begin_async(
    config: FerryConfig,
    actions: Arc<dyn BoatActions>,
) -> Result<FerryOutcome, FerryError> {
    let ferry = Ferry::with_config(config, actions);
    tokio::task::spawn_blocking(move || ferry.run())
        .await
        .map_err(|e| KernelError::ThreadPanicked(format!("ferry supervisor: {e}")))?
}

/// Handle to a timer driven by a tokio task.
#[derive(Debug)]
pub struct TimerTask {
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<u64>,
}

impl TimerTask {
    /// Stop driving the timer; returns the number of interrupts fired.
    pub async fn stop(mut self) -> Result<u64, KernelError> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        (&mut self.handle)
            .await
            .map_err(|e| KernelError::ThreadPanicked(format!("timer task: {e}")))
    }
}

/// Advance `timer` by one interrupt period every `period` on the current
/// tokio runtime.
///
/// Interrupt handlers may suspend the calling thread, so each advance runs
/// on the blocking pool.
pub fn drive_timer(timer: Arc<Timer>, period: Duration) -> TimerTask {
    let (stop, mut stopped) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut fired = 0;
        loop {
            tokio::select! {
                _ = &mut stopped => break,
                _ = interval.tick() => {
                    let timer = Arc::clone(&timer);
                    let step = timer.interrupt_period();
                    match tokio::task::spawn_blocking(move || timer.advance(step)).await {
                        Ok(n) => fired += n,
                        Err(err) => {
                            debug!(%err, "timer advance aborted");
                            break;
                        }
                    }
                }
            }
        }
        fired
    });
    TimerTask {
        stop: Some(stop),
        handle,
    }
}
