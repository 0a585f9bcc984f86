//! Error types for kernel and coordinator operations.

use thiserror::Error;

use crate::core::crossing::{Class, Location};

/// Errors produced by the hosted machine and configuration layer.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Configuration failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// A kernel thread could not be started.
    #[error("thread spawn failed: {0}")]
    Spawn(String),
    /// A kernel thread panicked before finishing.
    #[error("thread `{0}` panicked")]
    ThreadPanicked(String),
}

/// Errors produced by the ferry coordinator.
#[derive(Debug, Error)]
pub enum FerryError {
    /// The requested population cannot be ferried.
    #[error("invalid ferry config: {0}")]
    InvalidConfig(String),
    /// No crossing happened within a whole watchdog period.
    #[error("ferry stalled after {crossings} crossings")]
    Stalled {
        /// Crossings completed before the stall was detected.
        crossings: u64,
    },
    /// Underlying machine failure while starting actors.
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

/// A crossing the current state does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrossingError {
    /// The boat is not on the side the crossing departs from.
    #[error("boat is at {boat}, cannot depart from {from}")]
    BoatElsewhere {
        /// Where the boat actually is.
        boat: Location,
        /// Side the crossing tried to leave from.
        from: Location,
    },
    /// Not enough people of the class on the departure side.
    #[error("need {needed} {class} at {side}, found {found}")]
    NobodyToMove {
        /// Class of the occupants.
        class: Class,
        /// Departure side.
        side: Location,
        /// Occupants the crossing needs.
        needed: u32,
        /// Occupants present.
        found: u32,
    },
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
