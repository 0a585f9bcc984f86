//! Tests for builder modules

use std::sync::Arc;
use std::time::{Duration, Instant};

use harbor_kernel::builders::{build_alarm, build_driver, build_ferry, build_machine, KernelParts};
use harbor_kernel::config::{FerryConfig, KernelConfig, TimerConfig};
use harbor_kernel::core::{CrossingLog, FerryError, TracingActions};
use harbor_kernel::machine::KThread;
use harbor_kernel::KernelError;

fn kernel_config(adults: u32, children: u32) -> KernelConfig {
    KernelConfig {
        timer: TimerConfig::default(),
        ferry: FerryConfig::new(adults, children),
    }
}

#[test]
fn test_build_machine_from_config() {
    let machine = build_machine(&TimerConfig::default()).unwrap();
    assert_eq!(machine.timer().interrupt_period(), 500);
    assert_eq!(machine.timer().get_time(), 0);
}

#[test]
fn test_build_machine_rejects_zero_period() {
    let cfg = TimerConfig {
        interrupt_period: 0,
        driver_period_us: 1_000,
    };
    assert!(matches!(build_machine(&cfg), Err(KernelError::InvalidConfig(_))));
}

#[test]
fn test_build_alarm_installs_handler() {
    let alarm = build_alarm(&TimerConfig::default()).unwrap();
    assert_eq!(alarm.pending(), 0);
    // No sleepers: interrupts fire harmlessly.
    assert_eq!(alarm.machine().timer().advance(1_000), 2);
}

#[test]
fn test_build_ferry_runs() {
    let log = Arc::new(CrossingLog::default());
    let ferry = build_ferry(&kernel_config(1, 2), log.clone()).unwrap();
    let outcome = ferry.run().unwrap();
    assert_eq!(outcome.reported, 3);
    assert!(!log.events().is_empty());
}

#[test]
fn test_build_ferry_rejects_invalid_population() {
    let err = build_ferry(&kernel_config(2, 1), Arc::new(TracingActions)).unwrap_err();
    assert!(matches!(err, FerryError::InvalidConfig(_)));
}

#[test]
fn test_kernel_parts_build() {
    let parts = KernelParts::build(&kernel_config(0, 3), Arc::new(TracingActions)).unwrap();
    assert_eq!(parts.ferry.config().children, 3);
    assert_eq!(parts.alarm.pending(), 0);
}

#[test]
fn test_build_driver_advances_timer() {
    let cfg = TimerConfig {
        interrupt_period: 10,
        driver_period_us: 200,
    };
    let machine = build_machine(&cfg).unwrap();
    let driver = build_driver(&machine, &cfg).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while machine.timer().get_time() < 30 {
        assert!(Instant::now() < deadline, "driver never advanced the timer");
        std::thread::sleep(Duration::from_millis(1));
    }
    driver.stop();

    let stopped_at = machine.timer().get_time();
    assert_eq!(stopped_at % 10, 0);
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(machine.timer().get_time(), stopped_at);
}

#[test]
fn test_build_driver_rejects_zero_period() {
    let machine = build_machine(&TimerConfig::default()).unwrap();
    let cfg = TimerConfig {
        interrupt_period: 500,
        driver_period_us: 0,
    };
    assert!(matches!(build_driver(&machine, &cfg), Err(KernelError::InvalidConfig(_))));
}

#[test]
fn test_kernel_parts_timer_wakes_sleeper() {
    let parts = KernelParts::build(&kernel_config(0, 2), Arc::new(TracingActions)).unwrap();
    assert_eq!(parts.driver_period, Duration::from_micros(1_000));
    let driver = parts.start_timer().unwrap();

    let sleeper = {
        let alarm = Arc::clone(&parts.alarm);
        KThread::new("configured-sleeper", move || alarm.sleep_for(1_000))
    };
    sleeper.fork().unwrap();
    sleeper.join().unwrap();
    driver.stop();

    assert_eq!(parts.alarm.pending(), 0);
    assert!(parts.alarm.machine().timer().get_time() >= 1_000);
}
