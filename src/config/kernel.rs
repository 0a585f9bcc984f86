//! Timer and ferry configuration structures.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// How an actor waits when it has nothing to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStrategy {
    /// Yield the processor and re-check immediately.
    #[default]
    Yield,
    /// Block until the crossing state changes (or a short backstop elapses).
    Park,
}

/// Which actors speak on the completion channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPolicy {
    /// Only the first actor to observe completion speaks; later observers exit.
    #[default]
    FirstObserver,
    /// Every observer speaks. The supervisor listens once, so all speakers
    /// but one block forever.
    EveryObserver,
}

impl FromStr for WaitStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yield" => Ok(Self::Yield),
            "park" => Ok(Self::Park),
            other => Err(format!("unknown wait strategy `{other}`")),
        }
    }
}

impl FromStr for ReportPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_observer" => Ok(Self::FirstObserver),
            "every_observer" => Ok(Self::EveryObserver),
            other => Err(format!("unknown report policy `{other}`")),
        }
    }
}

/// Timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Ticks between timer interrupts.
    pub interrupt_period: u64,
    /// Real-time microseconds per interrupt period when a driver runs the timer.
    pub driver_period_us: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            interrupt_period: 500,
            driver_period_us: 1_000,
        }
    }
}

impl TimerConfig {
    /// Validate timer values.
    pub fn validate(&self) -> Result<(), String> {
        if self.interrupt_period == 0 {
            return Err("interrupt_period must be greater than 0".into());
        }
        if self.driver_period_us == 0 {
            return Err("driver_period_us must be greater than 0".into());
        }
        Ok(())
    }

    /// Real-time period of the timer driver.
    pub const fn driver_period(&self) -> Duration {
        Duration::from_micros(self.driver_period_us)
    }
}

/// Most actors a ferry run may start; each one is an OS thread.
pub const MAX_ACTORS: u32 = 4_096;

fn default_park_backstop_ms() -> u64 {
    10
}

/// Ferry coordination configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FerryConfig {
    /// Adult actors.
    pub adults: u32,
    /// Child actors.
    pub children: u32,
    /// Idle behaviour of actors.
    #[serde(default)]
    pub wait: WaitStrategy,
    /// Completion reporting policy.
    #[serde(default)]
    pub report: ReportPolicy,
    /// Give up when no crossing happens for this many milliseconds.
    #[serde(default)]
    pub watchdog_ms: Option<u64>,
    /// Longest a parked actor sleeps before re-checking on its own.
    #[serde(default = "default_park_backstop_ms")]
    pub park_backstop_ms: u64,
}

impl FerryConfig {
    /// Configuration for `adults` and `children` with default policies.
    pub fn new(adults: u32, children: u32) -> Self {
        Self {
            adults,
            children,
            wait: WaitStrategy::default(),
            report: ReportPolicy::default(),
            watchdog_ms: None,
            park_backstop_ms: default_park_backstop_ms(),
        }
    }

    /// Set the wait strategy.
    #[must_use]
    pub const fn with_wait(mut self, wait: WaitStrategy) -> Self {
        self.wait = wait;
        self
    }

    /// Set the report policy.
    #[must_use]
    pub const fn with_report(mut self, report: ReportPolicy) -> Self {
        self.report = report;
        self
    }

    /// Enable the stall watchdog.
    #[must_use]
    pub fn with_watchdog(mut self, period: Duration) -> Self {
        self.watchdog_ms = Some(u64::try_from(period.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Watchdog period, if enabled.
    pub fn watchdog(&self) -> Option<Duration> {
        self.watchdog_ms.map(Duration::from_millis)
    }

    /// Backstop for parked actors.
    pub const fn park_backstop(&self) -> Duration {
        Duration::from_millis(self.park_backstop_ms)
    }

    /// Validate ferry values.
    pub fn validate(&self) -> Result<(), String> {
        match self.adults.checked_add(self.children) {
            Some(total) if total <= MAX_ACTORS => {}
            _ => {
                return Err(format!(
                    "{} adults and {} children exceed the limit of {MAX_ACTORS} actors",
                    self.adults, self.children
                ));
            }
        }
        if self.adults > 0 && self.children < 2 {
            return Err(format!(
                "{} adults need at least 2 children to bring the boat back, got {}",
                self.adults, self.children
            ));
        }
        if self.watchdog_ms == Some(0) {
            return Err("watchdog_ms must be greater than 0".into());
        }
        if self.park_backstop_ms == 0 {
            return Err("park_backstop_ms must be greater than 0".into());
        }
        Ok(())
    }
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Timer device.
    #[serde(default)]
    pub timer: TimerConfig,
    /// Ferry run.
    pub ferry: FerryConfig,
}

impl KernelConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.timer
            .validate()
            .map_err(|e| format!("timer invalid: {e}"))?;
        self.ferry
            .validate()
            .map_err(|e| format!("ferry invalid: {e}"))?;
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `HARBOR_*` environment variables, loading a
    /// `.env` file first when present.
    ///
    /// Recognised: `HARBOR_ADULTS`, `HARBOR_CHILDREN`, `HARBOR_WAIT`,
    /// `HARBOR_REPORT`, `HARBOR_WATCHDOG_MS`, `HARBOR_PARK_BACKSTOP_MS`,
    /// `HARBOR_INTERRUPT_PERIOD`, `HARBOR_DRIVER_PERIOD_US`.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();

        let defaults = TimerConfig::default();
        let timer = TimerConfig {
            interrupt_period: env_or("HARBOR_INTERRUPT_PERIOD", defaults.interrupt_period)?,
            driver_period_us: env_or("HARBOR_DRIVER_PERIOD_US", defaults.driver_period_us)?,
        };

        let mut ferry = FerryConfig::new(env_or("HARBOR_ADULTS", 0)?, env_or("HARBOR_CHILDREN", 0)?)
            .with_wait(env_or("HARBOR_WAIT", WaitStrategy::default())?)
            .with_report(env_or("HARBOR_REPORT", ReportPolicy::default())?);
        ferry.park_backstop_ms = env_or("HARBOR_PARK_BACKSTOP_MS", ferry.park_backstop_ms)?;
        ferry.watchdog_ms = match env::var("HARBOR_WATCHDOG_MS") {
            Ok(raw) => Some(parse_var("HARBOR_WATCHDOG_MS", &raw)?),
            Err(_) => None,
        };

        let cfg = Self { timer, ferry };
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}

fn env_or<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env::var(key).map_or(Ok(default), |raw| parse_var(key, &raw))
}

fn parse_var<T>(key: &str, raw: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| anyhow::anyhow!("{e}"))
        .with_context(|| format!("parsing {key}={raw}"))
}
