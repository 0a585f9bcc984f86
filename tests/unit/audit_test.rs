//! Tests for boat action recording and replay

use harbor_kernel::core::{
    replay, BoatActions, BoatEvent, CrossingLog, Location, Population, ReplayError, Role,
};

fn event(seq: u64, role: Role, to: Location) -> BoatEvent {
    BoatEvent {
        seq,
        role,
        to,
        at_ms: 0,
    }
}

#[test]
fn test_log_records_roles_in_order() {
    let log = CrossingLog::new(10);
    log.child_rows_with_passenger(Location::Far);
    log.child_rides_as_passenger(Location::Far);
    log.child_rows_alone(Location::Near);
    log.adult_rows(Location::Far);

    let roles: Vec<_> = log.events().iter().map(|e| e.role).collect();
    assert_eq!(
        roles,
        vec![
            Role::ChildRowsWithPassenger,
            Role::ChildRidesAsPassenger,
            Role::ChildRowsAlone,
            Role::AdultRows,
        ]
    );
}

#[test]
fn test_replay_full_run() {
    use Location::{Far, Near};
    let events = vec![
        event(0, Role::ChildRowsWithPassenger, Far),
        event(1, Role::ChildRidesAsPassenger, Far),
        event(2, Role::ChildRowsAlone, Near),
        event(3, Role::AdultRows, Far),
        event(4, Role::ChildRowsAlone, Near),
        event(5, Role::ChildRowsWithPassenger, Far),
        event(6, Role::ChildRidesAsPassenger, Far),
    ];

    let summary = replay(&events, Population::new(1, 2)).unwrap();
    assert_eq!(summary.crossings, 5);
    assert_eq!(summary.max_occupants, 2);
    assert!(summary.final_state.everyone_far());
    assert_eq!(summary.final_state.boat, Far);
}

#[test]
fn test_replay_rejects_boat_elsewhere() {
    let events = vec![event(0, Role::ChildRowsAlone, Location::Near)];
    let err = replay(&events, Population::new(0, 1)).unwrap_err();
    assert_eq!(
        err,
        ReplayError::BoatElsewhere {
            index: 0,
            boat: Location::Near,
            to: Location::Near
        }
    );
}

#[test]
fn test_replay_rejects_missing_passenger() {
    let events = vec![
        event(0, Role::ChildRowsWithPassenger, Location::Far),
        event(1, Role::ChildRowsAlone, Location::Near),
    ];
    let err = replay(&events, Population::new(0, 2)).unwrap_err();
    assert_eq!(err, ReplayError::MissingPassenger { index: 0 });
}

#[test]
fn test_replay_rejects_stray_passenger() {
    let events = vec![event(0, Role::ChildRidesAsPassenger, Location::Far)];
    let err = replay(&events, Population::new(0, 2)).unwrap_err();
    assert_eq!(err, ReplayError::UnexpectedPassenger { index: 0 });
}

#[test]
fn test_replay_rejects_missing_adult() {
    // An adult cannot row when no adult waits at the departure side.
    let events = vec![event(0, Role::AdultRows, Location::Far)];
    let err = replay(&events, Population::new(0, 2)).unwrap_err();
    assert_eq!(err, ReplayError::NobodyToMove { index: 0 });
}

#[test]
fn test_events_serialize_as_json() {
    let json = serde_json::to_string(&event(7, Role::AdultRows, Location::Far)).unwrap();
    assert!(json.contains("\"adult_rows\""));
    assert!(json.contains("\"far\""));
    let back: BoatEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(back.seq, 7);
}
