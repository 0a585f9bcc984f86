//! Boat action reporting.
//!
//! [`BoatActions`] is the capability through which the coordinator reports
//! every physical action. [`CrossingLog`] records them in a bounded buffer
//! and [`replay`] checks a recorded sequence for legality.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::crossing::{CrossingState, Location, Population, BOAT_CAPACITY};
use crate::util::clock::now_ms;

/// Receiver of physical boat actions, one call per occupant role per
/// crossing, in the order the crossings happen.
pub trait BoatActions: Send + Sync {
    /// An adult rows alone to `to`.
    fn adult_rows(&self, to: Location);
    /// A child rows alone to `to`.
    fn child_rows_alone(&self, to: Location);
    /// A child rows to `to` carrying another child.
    fn child_rows_with_passenger(&self, to: Location);
    /// A child rides to `to` as the passenger of the preceding rower.
    fn child_rides_as_passenger(&self, to: Location);
}

/// Kind of physical action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Adult rowing alone.
    AdultRows,
    /// Child rowing alone.
    ChildRowsAlone,
    /// Child rowing with a passenger.
    ChildRowsWithPassenger,
    /// Child riding as passenger.
    ChildRidesAsPassenger,
}

/// One recorded action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoatEvent {
    /// Position in the recording, starting at 0.
    pub seq: u64,
    /// What happened.
    pub role: Role,
    /// Destination side.
    pub to: Location,
    /// Timestamp milliseconds.
    pub at_ms: u128,
}

struct LogState {
    events: VecDeque<BoatEvent>,
    next_seq: u64,
}

/// Bounded in-memory recorder of boat actions.
pub struct CrossingLog {
    state: Mutex<LogState>,
    max_events: usize,
}

impl CrossingLog {
    /// Create a recorder keeping at most `max_events` actions; the oldest are
    /// dropped first.
    pub fn new(max_events: usize) -> Self {
        Self {
            state: Mutex::new(LogState {
                events: VecDeque::with_capacity(max_events.min(1024)),
                next_seq: 0,
            }),
            max_events,
        }
    }

    /// Snapshot of stored actions.
    pub fn events(&self) -> Vec<BoatEvent> {
        self.state.lock().events.iter().cloned().collect()
    }

    /// Whether older actions were dropped to respect the bound.
    pub fn truncated(&self) -> bool {
        let state = self.state.lock();
        state.next_seq > state.events.len() as u64
    }

    fn record(&self, role: Role, to: Location) {
        let mut state = self.state.lock();
        if state.events.len() >= self.max_events {
            state.events.pop_front();
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.events.push_back(BoatEvent {
            seq,
            role,
            to,
            at_ms: now_ms(),
        });
    }
}

impl Default for CrossingLog {
    fn default() -> Self {
        Self::new(65_536)
    }
}

impl BoatActions for CrossingLog {
    fn adult_rows(&self, to: Location) {
        self.record(Role::AdultRows, to);
    }

    fn child_rows_alone(&self, to: Location) {
        self.record(Role::ChildRowsAlone, to);
    }

    fn child_rows_with_passenger(&self, to: Location) {
        self.record(Role::ChildRowsWithPassenger, to);
    }

    fn child_rides_as_passenger(&self, to: Location) {
        self.record(Role::ChildRidesAsPassenger, to);
    }
}

/// Emits every action as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActions;

impl BoatActions for TracingActions {
    fn adult_rows(&self, to: Location) {
        tracing::info!(%to, "adult rows");
    }

    fn child_rows_alone(&self, to: Location) {
        tracing::info!(%to, "child rows");
    }

    fn child_rows_with_passenger(&self, to: Location) {
        tracing::info!(%to, "child rows with passenger");
    }

    fn child_rides_as_passenger(&self, to: Location) {
        tracing::info!(%to, "child rides");
    }
}

/// Illegal action found while replaying a recording.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// A crossing left from the side the boat was not on.
    #[error("event {index}: boat at {boat} cannot cross to {to}")]
    BoatElsewhere {
        /// Offending event index.
        index: usize,
        /// Boat position before the event.
        boat: Location,
        /// Requested destination.
        to: Location,
    },
    /// A rower announced a passenger that never boarded.
    #[error("event {index}: rower without passenger")]
    MissingPassenger {
        /// Offending event index.
        index: usize,
    },
    /// A passenger rode without a matching rower, or overloaded the boat.
    #[error("event {index}: passenger without rower")]
    UnexpectedPassenger {
        /// Offending event index.
        index: usize,
    },
    /// The departure side had nobody of the needed class.
    #[error("event {index}: nobody left to move")]
    NobodyToMove {
        /// Offending event index.
        index: usize,
    },
}

/// Result of a legal replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Physical crossings (a rower with passenger counts once).
    pub crossings: u64,
    /// Largest number of occupants seen in one crossing.
    pub max_occupants: u32,
    /// State after the last action.
    pub final_state: CrossingState,
}

/// Replay `events` from the initial state of `totals`.
///
/// Checks that each crossing departs from the boat's side, carries at most
/// two occupants, and moves people who are actually there.
pub fn replay(events: &[BoatEvent], totals: Population) -> Result<ReplaySummary, ReplayError> {
    let mut state = CrossingState::new(totals);
    let mut crossings = 0;
    let mut max_occupants = 0;
    let mut index = 0;

    while index < events.len() {
        let event = &events[index];
        if event.to != state.boat.opposite() {
            return Err(ReplayError::BoatElsewhere {
                index,
                boat: state.boat,
                to: event.to,
            });
        }
        let from = state.boat;
        let (adults, children, consumed) = match event.role {
            Role::AdultRows => (1, 0, 1),
            Role::ChildRowsAlone => (0, 1, 1),
            Role::ChildRowsWithPassenger => match events.get(index + 1) {
                Some(next) if next.role == Role::ChildRidesAsPassenger && next.to == event.to => {
                    (0, 2, 2)
                }
                _ => return Err(ReplayError::MissingPassenger { index }),
            },
            Role::ChildRidesAsPassenger => {
                return Err(ReplayError::UnexpectedPassenger { index });
            }
        };
        debug_assert!(adults + children <= BOAT_CAPACITY);

        let (adults_from, adults_to, children_from, children_to) = match from {
            Location::Near => (
                &mut state.adults_near,
                &mut state.adults_far,
                &mut state.children_near,
                &mut state.children_far,
            ),
            Location::Far => (
                &mut state.adults_far,
                &mut state.adults_near,
                &mut state.children_far,
                &mut state.children_near,
            ),
        };
        if *adults_from < adults || *children_from < children {
            return Err(ReplayError::NobodyToMove { index });
        }
        *adults_from -= adults;
        *adults_to += adults;
        *children_from -= children;
        *children_to += children;
        state.boat = event.to;

        crossings += 1;
        max_occupants = max_occupants.max(adults + children);
        index += consumed;
    }

    Ok(ReplaySummary {
        crossings,
        max_occupants,
        final_state: state,
    })
}
