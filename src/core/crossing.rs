//! Shared crossing state and its locked accessor.
//!
//! All actors share one [`Crossing`]. Counts and the boat position can be
//! read at any time without the boat lock through [`Crossing::snapshot`]; the
//! result may be stale. Every mutation goes through a [`Helm`], which exists
//! only while its owner holds the boat lock.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::audit::BoatActions;
use crate::core::CrossingError;
use crate::machine::{ChangeSignal, Lock, LockGuard};

/// Most occupants the boat carries in one crossing.
pub const BOAT_CAPACITY: u32 = 2;

/// One side of the crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Starting side.
    Near,
    /// Destination side.
    Far,
}

impl Location {
    /// The other side.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Near => Self::Far,
            Self::Far => Self::Near,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Near => f.write_str("near"),
            Self::Far => f.write_str("far"),
        }
    }
}

/// Actor class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Class {
    /// Rows alone only.
    Adult,
    /// Rows alone or with one other child.
    Child,
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adult => f.write_str("adults"),
            Self::Child => f.write_str("children"),
        }
    }
}

/// How many actors of each class take part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Population {
    /// Adult actors.
    pub adults: u32,
    /// Child actors.
    pub children: u32,
}

impl Population {
    /// Create a population.
    pub const fn new(adults: u32, children: u32) -> Self {
        Self { adults, children }
    }

    /// Everyone, regardless of class. Saturates at `u32::MAX`.
    pub const fn total(self) -> u32 {
        self.adults.saturating_add(self.children)
    }
}

/// Point-in-time view of the crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossingState {
    /// Where the boat is.
    pub boat: Location,
    /// Adults still at the near side.
    pub adults_near: u32,
    /// Adults relocated.
    pub adults_far: u32,
    /// Children at the near side.
    pub children_near: u32,
    /// Children at the far side.
    pub children_far: u32,
    /// Population the run started with.
    pub totals: Population,
}

impl CrossingState {
    /// Everyone and the boat at the near side.
    pub const fn new(totals: Population) -> Self {
        Self {
            boat: Location::Near,
            adults_near: totals.adults,
            adults_far: 0,
            children_near: totals.children,
            children_far: 0,
            totals,
        }
    }

    /// Whether every actor has been relocated.
    pub const fn everyone_far(&self) -> bool {
        self.adults_far == self.totals.adults && self.children_far == self.totals.children
    }

    /// Whether anybody still waits at the near side.
    pub const fn anyone_near(&self) -> bool {
        self.adults_near > 0 || self.children_near > 0
    }

    /// Whether per-class counts add up to the population.
    pub const fn is_consistent(&self) -> bool {
        self.adults_near + self.adults_far == self.totals.adults
            && self.children_near + self.children_far == self.totals.children
    }

    /// Occupants of `class` at `side`.
    pub const fn count(&self, class: Class, side: Location) -> u32 {
        match (class, side) {
            (Class::Adult, Location::Near) => self.adults_near,
            (Class::Adult, Location::Far) => self.adults_far,
            (Class::Child, Location::Near) => self.children_near,
            (Class::Child, Location::Far) => self.children_far,
        }
    }
}

/// Crossing state shared by every actor of a run.
pub struct Crossing {
    totals: Population,
    boat_far: AtomicBool,
    adults_near: AtomicU32,
    adults_far: AtomicU32,
    children_near: AtomicU32,
    children_far: AtomicU32,
    crossings: AtomicU64,
    lock: Lock,
    changes: ChangeSignal,
    actions: Arc<dyn BoatActions>,
}

impl Crossing {
    /// Everyone at the near side, reporting each physical action to `actions`.
    pub fn new(totals: Population, actions: Arc<dyn BoatActions>) -> Self {
        Self {
            totals,
            boat_far: AtomicBool::new(false),
            adults_near: AtomicU32::new(totals.adults),
            adults_far: AtomicU32::new(0),
            children_near: AtomicU32::new(totals.children),
            children_far: AtomicU32::new(0),
            crossings: AtomicU64::new(0),
            lock: Lock::new("boat"),
            changes: ChangeSignal::new(),
            actions,
        }
    }

    /// Population of the run.
    pub const fn totals(&self) -> Population {
        self.totals
    }

    /// Lock-free view; may be stale or mid-update.
    pub fn snapshot(&self) -> CrossingState {
        CrossingState {
            boat: if self.boat_far.load(Ordering::Acquire) {
                Location::Far
            } else {
                Location::Near
            },
            adults_near: self.adults_near.load(Ordering::Acquire),
            adults_far: self.adults_far.load(Ordering::Acquire),
            children_near: self.children_near.load(Ordering::Acquire),
            children_far: self.children_far.load(Ordering::Acquire),
            totals: self.totals,
        }
    }

    /// Take the boat lock, suspending while another actor holds it.
    pub fn helm(&self) -> Helm<'_> {
        let guard = self.lock.acquire();
        Helm {
            crossing: self,
            moved: 0,
            _guard: guard,
        }
    }

    /// The boat lock, for instrumentation.
    pub const fn lock(&self) -> &Lock {
        &self.lock
    }

    /// Signal advanced after every critical section that moved the boat.
    pub const fn changes(&self) -> &ChangeSignal {
        &self.changes
    }

    /// Crossings performed so far.
    pub fn crossings(&self) -> u64 {
        self.crossings.load(Ordering::Acquire)
    }

    const fn side(&self, class: Class, side: Location) -> &AtomicU32 {
        match (class, side) {
            (Class::Adult, Location::Near) => &self.adults_near,
            (Class::Adult, Location::Far) => &self.adults_far,
            (Class::Child, Location::Near) => &self.children_near,
            (Class::Child, Location::Far) => &self.children_far,
        }
    }
}

impl fmt::Debug for Crossing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crossing")
            .field("state", &self.snapshot())
            .field("crossings", &self.crossings())
            .finish_non_exhaustive()
    }
}

/// Exclusive control of the boat. The boat lock is released on drop.
pub struct Helm<'a> {
    crossing: &'a Crossing,
    moved: u32,
    _guard: LockGuard<'a>,
}

impl Helm<'_> {
    /// Current state; fresh, since nobody else can mutate it.
    pub fn state(&self) -> CrossingState {
        self.crossing.snapshot()
    }

    /// An adult rows alone to `to`.
    pub fn adult_rows(&mut self, to: Location) -> Result<(), CrossingError> {
        self.check(Class::Adult, 1, to)?;
        self.crossing.actions.adult_rows(to);
        self.commit(Class::Adult, 1, to);
        Ok(())
    }

    /// A child rows alone to `to`.
    pub fn child_rows_alone(&mut self, to: Location) -> Result<(), CrossingError> {
        self.check(Class::Child, 1, to)?;
        self.crossing.actions.child_rows_alone(to);
        self.commit(Class::Child, 1, to);
        Ok(())
    }

    /// Two children cross together to `to`: one rows, one rides.
    pub fn children_cross(&mut self, to: Location) -> Result<(), CrossingError> {
        self.check(Class::Child, BOAT_CAPACITY, to)?;
        self.crossing.actions.child_rows_with_passenger(to);
        self.crossing.actions.child_rides_as_passenger(to);
        self.commit(Class::Child, BOAT_CAPACITY, to);
        Ok(())
    }

    fn check(&self, class: Class, occupants: u32, to: Location) -> Result<(), CrossingError> {
        debug_assert!(occupants > 0 && occupants <= BOAT_CAPACITY);
        let from = to.opposite();
        let state = self.state();
        if state.boat != from {
            return Err(CrossingError::BoatElsewhere {
                boat: state.boat,
                from,
            });
        }
        let found = state.count(class, from);
        if found < occupants {
            return Err(CrossingError::NobodyToMove {
                class,
                side: from,
                needed: occupants,
                found,
            });
        }
        Ok(())
    }

    fn commit(&mut self, class: Class, occupants: u32, to: Location) {
        let from = to.opposite();
        self.crossing
            .side(class, from)
            .fetch_sub(occupants, Ordering::AcqRel);
        self.crossing
            .side(class, to)
            .fetch_add(occupants, Ordering::AcqRel);
        self.crossing
            .boat_far
            .store(to == Location::Far, Ordering::Release);
        let n = self.crossing.crossings.fetch_add(1, Ordering::AcqRel) + 1;
        self.moved += 1;
        debug!(crossing = n, %class, occupants, %from, %to, "boat crossed");
    }
}

impl Drop for Helm<'_> {
    fn drop(&mut self) {
        if self.moved > 0 {
            debug_assert!(self.state().is_consistent());
            self.crossing.changes.advance();
        }
    }
}
