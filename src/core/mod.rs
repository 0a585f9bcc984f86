//! Wake scheduling and ferry coordination.

pub mod alarm;
pub mod audit;
pub mod crossing;
pub mod error;
pub mod ferry;
pub mod wake_queue;

pub use alarm::Alarm;
pub use audit::{
    replay, BoatActions, BoatEvent, CrossingLog, ReplayError, ReplaySummary, Role, TracingActions,
};
pub use crossing::{Class, Crossing, CrossingState, Helm, Location, Population, BOAT_CAPACITY};
pub use error::{AppResult, CrossingError, FerryError, KernelError};
pub use ferry::{Ferry, FerryOutcome};
pub use wake_queue::{PendingWake, WakeQueue};
