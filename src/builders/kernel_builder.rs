//! Builders to construct the machine, alarm and ferry from configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{KernelConfig, TimerConfig};
use crate::core::{Alarm, BoatActions, Ferry, FerryError, KernelError};
use crate::machine::{Machine, TimerDriver};

/// Build a machine from timer configuration.
pub fn build_machine(cfg: &TimerConfig) -> Result<Arc<Machine>, KernelError> {
    Machine::from_config(cfg)
}

/// Build a machine and install an alarm as its timer interrupt handler.
pub fn build_alarm(cfg: &TimerConfig) -> Result<Arc<Alarm>, KernelError> {
    let machine = build_machine(cfg)?;
    Ok(Alarm::new(machine))
}

/// Drive `machine`'s timer in real time, one interrupt period per
/// `cfg.driver_period()`.
pub fn build_driver(machine: &Machine, cfg: &TimerConfig) -> Result<TimerDriver, KernelError> {
    cfg.validate().map_err(KernelError::InvalidConfig)?;
    machine.start_timer(cfg.driver_period())
}

/// Build a ferry run, validating the ferry section up front.
pub fn build_ferry(cfg: &KernelConfig, actions: Arc<dyn BoatActions>) -> Result<Ferry, FerryError> {
    cfg.ferry.validate().map_err(FerryError::InvalidConfig)?;
    Ok(Ferry::with_config(cfg.ferry.clone(), actions))
}

/// Every component described by one [`KernelConfig`].
#[derive(Debug)]
pub struct KernelParts {
    /// Wake scheduler bound to a fresh machine.
    pub alarm: Arc<Alarm>,
    /// Prepared ferry run.
    pub ferry: Ferry,
    /// Real-time period used by [`KernelParts::start_timer`].
    pub driver_period: Duration,
}

impl KernelParts {
    /// Validate `cfg` and build all components.
    pub fn build(cfg: &KernelConfig, actions: Arc<dyn BoatActions>) -> Result<Self, FerryError> {
        cfg.validate()
            .map_err(|e| KernelError::InvalidConfig(format!("config invalid: {e}")))?;
        Ok(Self {
            alarm: build_alarm(&cfg.timer)?,
            ferry: build_ferry(cfg, actions)?,
            driver_period: cfg.timer.driver_period(),
        })
    }

    /// Start driving the alarm's timer at the configured real-time period.
    pub fn start_timer(&self) -> Result<TimerDriver, KernelError> {
        self.alarm.machine().start_timer(self.driver_period)
    }
}
