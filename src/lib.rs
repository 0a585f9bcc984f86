//! # Harbor Kernel
//!
//! Two pieces of an instructional kernel running on a hosted machine made
//! of OS threads:
//!
//! - **Alarm**: a timer-driven wake scheduler. Threads sleep for at least a
//!   number of ticks and are made runnable by the first timer interrupt at or
//!   after their deadline.
//! - **Ferry**: a coordination run in which adult and child threads share one
//!   two-seat boat to move everyone from the near side to the far side,
//!   reporting completion over a rendezvous channel.
//!
//! ## Alarm
//!
//! ```rust,ignore
//! use harbor_kernel::core::Alarm;
//! use harbor_kernel::machine::{KThread, Machine};
//!
//! let machine = Machine::new(500);
//! let alarm = Alarm::new(machine.clone());
//!
//! let sleeper = {
//!     let alarm = alarm.clone();
//!     KThread::new("sleeper", move || alarm.sleep_for(1_000))
//! };
//! sleeper.fork()?;
//! machine.timer().advance(1_500);
//! sleeper.join()?;
//! ```
//!
//! ## Ferry
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use harbor_kernel::core::{CrossingLog, Ferry};
//!
//! let log = Arc::new(CrossingLog::default());
//! let outcome = Ferry::begin(2, 3, log.clone())?;
//! assert_eq!(outcome.reported, 5);
//! ```
//!
//! See `tests/` for complete scenarios.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Wake scheduler, crossing state and ferry coordinator.
pub mod core;
/// Configuration models for the timer and ferry runs.
pub mod config;
/// Builders to construct kernel components from configuration.
pub mod builders;
/// Hosted machine and kernel synchronization primitives.
pub mod machine;
/// Async runtime adapters.
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::config::KernelConfig;
pub use crate::core::{Alarm, Ferry, FerryError, FerryOutcome, KernelError};
