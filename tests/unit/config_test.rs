//! Tests for configuration validation

use std::env;
use std::sync::Arc;
use std::time::Duration;

use harbor_kernel::config::{
    FerryConfig, KernelConfig, ReportPolicy, TimerConfig, WaitStrategy, MAX_ACTORS,
};
use harbor_kernel::core::{CrossingLog, Ferry, FerryError};
use parking_lot::{Mutex, MutexGuard};

/// Serializes tests that touch `HARBOR_*` variables.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const HARBOR_VARS: [&str; 8] = [
    "HARBOR_ADULTS",
    "HARBOR_CHILDREN",
    "HARBOR_WAIT",
    "HARBOR_REPORT",
    "HARBOR_WATCHDOG_MS",
    "HARBOR_PARK_BACKSTOP_MS",
    "HARBOR_INTERRUPT_PERIOD",
    "HARBOR_DRIVER_PERIOD_US",
];

/// Sets the given variables for the lifetime of the guard, clearing every
/// other `HARBOR_*` variable.
struct HarborEnv {
    _lock: MutexGuard<'static, ()>,
}

impl HarborEnv {
    fn set(vars: &[(&str, &str)]) -> Self {
        let lock = ENV_LOCK.lock();
        for key in HARBOR_VARS {
            env::remove_var(key);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
        Self { _lock: lock }
    }
}

impl Drop for HarborEnv {
    fn drop(&mut self) {
        for key in HARBOR_VARS {
            env::remove_var(key);
        }
    }
}

#[test]
fn test_ferry_config_defaults() {
    let cfg = FerryConfig::new(2, 3);
    assert_eq!(cfg.wait, WaitStrategy::Yield);
    assert_eq!(cfg.report, ReportPolicy::FirstObserver);
    assert_eq!(cfg.watchdog(), None);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_ferry_config_needs_two_children_for_adults() {
    assert!(FerryConfig::new(1, 1).validate().is_err());
    assert!(FerryConfig::new(3, 0).validate().is_err());
    assert!(FerryConfig::new(0, 1).validate().is_ok());
    assert!(FerryConfig::new(0, 0).validate().is_ok());
}

#[test]
fn test_ferry_config_invalid_watchdog() {
    let mut cfg = FerryConfig::new(0, 2);
    cfg.watchdog_ms = Some(0);
    assert!(cfg.validate().is_err());

    let cfg = FerryConfig::new(0, 2).with_watchdog(Duration::from_millis(250));
    assert_eq!(cfg.watchdog(), Some(Duration::from_millis(250)));
}

#[test]
fn test_timer_config_invalid_period() {
    let cfg = TimerConfig {
        interrupt_period: 0,
        driver_period_us: 1_000,
    };
    assert!(cfg.validate().is_err());
    assert!(TimerConfig::default().validate().is_ok());
}

#[test]
fn test_kernel_config_from_json() {
    let json = r#"{
        "ferry": { "adults": 2, "children": 3, "wait": "park", "report": "every_observer" }
    }"#;
    let cfg = KernelConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.timer.interrupt_period, 500);
    assert_eq!(cfg.ferry.wait, WaitStrategy::Park);
    assert_eq!(cfg.ferry.report, ReportPolicy::EveryObserver);
    assert_eq!(cfg.ferry.park_backstop_ms, 10);
}

#[test]
fn test_kernel_config_from_json_rejects_invalid() {
    let json = r#"{ "ferry": { "adults": 2, "children": 1 } }"#;
    let err = KernelConfig::from_json_str(json).unwrap_err();
    assert!(err.contains("ferry invalid"));

    assert!(KernelConfig::from_json_str("not json").is_err());
}

#[test]
fn test_policy_names_parse() {
    assert_eq!("park".parse::<WaitStrategy>().unwrap(), WaitStrategy::Park);
    assert_eq!(
        "first_observer".parse::<ReportPolicy>().unwrap(),
        ReportPolicy::FirstObserver
    );
    assert!("spin".parse::<WaitStrategy>().is_err());
}

#[test]
fn test_ferry_config_rejects_overflowing_population() {
    let cfg = FerryConfig::new(u32::MAX, 2);
    let err = cfg.validate().unwrap_err();
    assert!(err.contains("exceed the limit"));

    // Rejected before any actor thread starts.
    let err = Ferry::with_config(cfg, Arc::new(CrossingLog::default()))
        .run()
        .unwrap_err();
    assert!(matches!(err, FerryError::InvalidConfig(_)));
}

#[test]
fn test_ferry_config_caps_actor_count() {
    assert!(FerryConfig::new(MAX_ACTORS - 2, 2).validate().is_ok());
    assert!(FerryConfig::new(MAX_ACTORS - 1, 2).validate().is_err());
    assert!(FerryConfig::new(0, MAX_ACTORS + 1).validate().is_err());
}

#[test]
fn test_kernel_config_from_env() {
    let _env = HarborEnv::set(&[
        ("HARBOR_ADULTS", "2"),
        ("HARBOR_CHILDREN", " 3 "),
        ("HARBOR_WAIT", "park"),
        ("HARBOR_REPORT", "every_observer"),
        ("HARBOR_WATCHDOG_MS", "750"),
        ("HARBOR_INTERRUPT_PERIOD", "100"),
    ]);

    let cfg = KernelConfig::from_env().unwrap();
    assert_eq!((cfg.ferry.adults, cfg.ferry.children), (2, 3));
    assert_eq!(cfg.ferry.wait, WaitStrategy::Park);
    assert_eq!(cfg.ferry.report, ReportPolicy::EveryObserver);
    assert_eq!(cfg.ferry.watchdog(), Some(Duration::from_millis(750)));
    assert_eq!(cfg.ferry.park_backstop_ms, 10);
    assert_eq!(cfg.timer.interrupt_period, 100);
    assert_eq!(cfg.timer.driver_period_us, TimerConfig::default().driver_period_us);
}

#[test]
fn test_kernel_config_from_env_defaults_to_empty_run() {
    let _env = HarborEnv::set(&[]);

    let cfg = KernelConfig::from_env().unwrap();
    assert_eq!((cfg.ferry.adults, cfg.ferry.children), (0, 0));
    assert_eq!(cfg.ferry.wait, WaitStrategy::Yield);
    assert_eq!(cfg.ferry.watchdog(), None);
}

#[test]
fn test_kernel_config_from_env_reports_bad_value() {
    let _env = HarborEnv::set(&[("HARBOR_WAIT", "spin")]);

    let err = KernelConfig::from_env().unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("parsing HARBOR_WAIT=spin"), "{message}");
    assert!(message.contains("unknown wait strategy `spin`"), "{message}");
}

#[test]
fn test_kernel_config_from_env_validates() {
    let _env = HarborEnv::set(&[("HARBOR_ADULTS", "2"), ("HARBOR_CHILDREN", "1")]);

    let err = KernelConfig::from_env().unwrap_err();
    assert!(err.to_string().contains("ferry invalid"));
}
