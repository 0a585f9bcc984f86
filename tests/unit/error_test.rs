//! Tests for error types

use harbor_kernel::core::{Class, CrossingError, FerryError, KernelError, Location};

#[test]
fn test_invalid_config_error() {
    let err = KernelError::InvalidConfig("interrupt_period must be greater than 0".to_string());
    assert_eq!(
        format!("{err}"),
        "invalid config: interrupt_period must be greater than 0"
    );
}

#[test]
fn test_thread_panicked_error() {
    let err = KernelError::ThreadPanicked("child-0".to_string());
    assert_eq!(format!("{err}"), "thread `child-0` panicked");
}

#[test]
fn test_stalled_error() {
    let err = FerryError::Stalled { crossings: 4 };
    assert_eq!(format!("{err}"), "ferry stalled after 4 crossings");
}

#[test]
fn test_kernel_error_is_transparent_in_ferry_error() {
    let err: FerryError = KernelError::Spawn("no threads".to_string()).into();
    assert_eq!(format!("{err}"), "thread spawn failed: no threads");
}

#[test]
fn test_crossing_error_messages() {
    let err = CrossingError::BoatElsewhere {
        boat: Location::Far,
        from: Location::Near,
    };
    assert_eq!(format!("{err}"), "boat is at far, cannot depart from near");

    let err = CrossingError::NobodyToMove {
        class: Class::Child,
        side: Location::Near,
        needed: 2,
        found: 1,
    };
    assert_eq!(format!("{err}"), "need 2 children at near, found 1");
}
