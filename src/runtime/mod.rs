//! Async runtime adapters.

pub mod tokio_adapter;

pub use tokio_adapter::{begin_async, drive_timer, TimerTask};
