//! Builders to construct kernel components from configuration.

pub mod kernel_builder;

pub use kernel_builder::{build_alarm, build_driver, build_ferry, build_machine, KernelParts};
