//! Tests for tokio runtime adapters

use std::sync::Arc;
use std::time::Duration;

use harbor_kernel::config::FerryConfig;
use harbor_kernel::core::{Alarm, CrossingLog, FerryError};
use harbor_kernel::machine::{KThread, Machine};
use harbor_kernel::runtime::{begin_async, drive_timer};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_begin_async_completes() {
    let log = Arc::new(CrossingLog::default());
    let outcome = begin_async(FerryConfig::new(2, 3), log.clone()).await.unwrap();
    assert_eq!(outcome.reported, 5);
    assert!(outcome.final_state.everyone_far());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_begin_async_rejects_invalid_config() {
    let err = begin_async(FerryConfig::new(1, 0), Arc::new(CrossingLog::default()))
        .await
        .unwrap_err();
    assert!(matches!(err, FerryError::InvalidConfig(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_drive_timer_wakes_sleeper() {
    let machine = Machine::new(10);
    let alarm = Alarm::new(Arc::clone(&machine));
    let task = drive_timer(Arc::clone(machine.timer()), Duration::from_millis(1));

    let sleeper = {
        let alarm = Arc::clone(&alarm);
        KThread::new("async-sleeper", move || alarm.sleep_for(50))
    };
    sleeper.fork().unwrap();
    tokio::task::spawn_blocking(move || sleeper.join())
        .await
        .unwrap()
        .unwrap();

    let fired = task.stop().await.unwrap();
    assert!(fired >= 5);
    assert_eq!(alarm.pending(), 0);
}
