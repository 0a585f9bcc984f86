//! Configuration models for the timer and ferry runs.

pub mod kernel;

pub use kernel::{FerryConfig, KernelConfig, MAX_ACTORS, ReportPolicy, TimerConfig, WaitStrategy};
