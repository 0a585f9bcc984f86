//! Ferry coordination.
//!
//! Adults and children start at the near side and must all reach the far
//! side using one boat that carries at most two people. Adults always row
//! alone; children row alone or in pairs. Each actor runs on its own kernel
//! thread and repeatedly:
//!
//! 1. checks for global completion, reporting it on the rendezvous channel;
//! 2. reads the shared state without the boat lock and, if it looks
//!    eligible for a crossing, takes the lock, re-checks and crosses;
//! 3. otherwise waits according to the configured [`WaitStrategy`].
//!
//! The supervising caller of [`Ferry::run`] blocks on the channel until an
//! actor reports.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::{FerryConfig, ReportPolicy, WaitStrategy};
use crate::core::audit::BoatActions;
use crate::core::crossing::{Crossing, CrossingState, Location, Population};
use crate::core::{CrossingError, FerryError};
use crate::machine::{Communicator, KThread};

/// What a finished run observed.
#[derive(Debug, Clone)]
pub struct FerryOutcome {
    /// Identifier of the run, also attached to its tracing span.
    pub run_id: Uuid,
    /// Value received on the completion channel.
    pub reported: u32,
    /// Boat crossings performed.
    pub crossings: u64,
    /// State when the supervisor returned.
    pub final_state: CrossingState,
    /// Times the boat lock was taken.
    pub lock_acquisitions: u64,
    /// Most actors ever inside the boat lock at once.
    pub max_lock_occupancy: usize,
}

/// A configured ferry run.
#[derive(Clone)]
pub struct Ferry {
    config: FerryConfig,
    actions: Arc<dyn BoatActions>,
}

impl Ferry {
    /// Ferry `adults` and `children` with default policies, blocking until
    /// completion is reported.
    pub fn begin(
        adults: u32,
        children: u32,
        actions: Arc<dyn BoatActions>,
    ) -> Result<FerryOutcome, FerryError> {
        Self::with_config(FerryConfig::new(adults, children), actions).run()
    }

    /// Prepare a run from configuration.
    pub fn with_config(config: FerryConfig, actions: Arc<dyn BoatActions>) -> Self {
        Self { config, actions }
    }

    /// Configuration of this run.
    pub const fn config(&self) -> &FerryConfig {
        &self.config
    }

    /// Start every actor and block until completion is reported.
    ///
    /// Fails fast on invalid configuration before any thread starts.
    pub fn run(&self) -> Result<FerryOutcome, FerryError> {
        self.config.validate().map_err(FerryError::InvalidConfig)?;

        let run_id = Uuid::new_v4();
        let totals = Population::new(self.config.adults, self.config.children);
        let span = info_span!("ferry", %run_id, adults = totals.adults, children = totals.children);
        let _enter = span.enter();

        let shared = Arc::new(Coordination {
            crossing: Crossing::new(totals, Arc::clone(&self.actions)),
            completion: Communicator::new(),
            reported: AtomicBool::new(false),
            halted: AtomicBool::new(false),
            wait: self.config.wait,
            report: self.config.report,
            backstop: self.config.park_backstop(),
            run_id,
        });

        if totals.total() == 0 {
            info!("nobody to ferry");
            return Ok(shared.outcome(0));
        }

        info!(wait = ?self.config.wait, report = ?self.config.report, "ferry started");
        let actors = shared.fork_actors().inspect_err(|_| shared.halt())?;

        let reported = shared.await_completion(self.config.watchdog())?;
        if reported != totals.total() {
            warn!(reported, expected = totals.total(), "completion reported an unexpected count");
        }

        // Under EveryObserver extra speakers stay blocked on the channel, so
        // only FirstObserver runs can be joined.
        if self.config.report == ReportPolicy::FirstObserver {
            for actor in &actors {
                if let Err(err) = actor.join() {
                    error!(%err, "actor failed");
                }
            }
        }

        let outcome = shared.outcome(reported);
        info!(crossings = outcome.crossings, "ferry finished");
        Ok(outcome)
    }
}

impl std::fmt::Debug for Ferry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ferry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// State shared by the supervisor and every actor of one run.
struct Coordination {
    crossing: Crossing,
    completion: Communicator<u32>,
    reported: AtomicBool,
    /// Set when the supervisor gives up; actors exit at their next check.
    halted: AtomicBool,
    wait: WaitStrategy,
    report: ReportPolicy,
    backstop: Duration,
    run_id: Uuid,
}

impl Coordination {
    fn fork_actors(self: &Arc<Self>) -> Result<Vec<KThread>, FerryError> {
        let totals = self.crossing.totals();
        let mut actors = Vec::with_capacity(totals.total() as usize);

        for i in 0..totals.adults {
            let shared = Arc::clone(self);
            let actor = KThread::new(format!("adult-{i}"), move || shared.adult_itinerary());
            actor.fork()?;
            actors.push(actor);
        }
        for i in 0..totals.children {
            let shared = Arc::clone(self);
            let actor = KThread::new(format!("child-{i}"), move || shared.child_itinerary());
            actor.fork()?;
            actors.push(actor);
        }
        Ok(actors)
    }

    fn await_completion(&self, watchdog: Option<Duration>) -> Result<u32, FerryError> {
        let Some(period) = watchdog else {
            return Ok(self.completion.listen());
        };

        let mut seen = self.crossing.crossings();
        loop {
            if let Some(reported) = self.completion.listen_timeout(period) {
                return Ok(reported);
            }
            let crossings = self.crossing.crossings();
            if crossings == seen {
                warn!(crossings, ?period, "no crossing within watchdog period");
                self.halt();
                return Err(FerryError::Stalled { crossings });
            }
            seen = crossings;
        }
    }

    /// Tell every actor to stop and wake the parked ones.
    fn halt(&self) {
        self.halted.store(true, Ordering::Release);
        self.crossing.changes().advance();
    }

    fn halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    fn outcome(&self, reported: u32) -> FerryOutcome {
        FerryOutcome {
            run_id: self.run_id,
            reported,
            crossings: self.crossing.crossings(),
            final_state: self.crossing.snapshot(),
            lock_acquisitions: self.crossing.lock().acquisitions(),
            max_lock_occupancy: self.crossing.lock().max_occupancy(),
        }
    }

    fn adult_itinerary(&self) {
        let span = info_span!("actor", run_id = %self.run_id, role = "adult");
        let _enter = span.enter();
        let mut side = Location::Near;

        loop {
            if self.halted() {
                debug!("run halted, actor leaving");
                return;
            }
            let seen = self.crossing.changes().generation();
            let state = self.crossing.snapshot();
            if state.everyone_far() {
                self.report_completion();
                return;
            }

            let acted = if side == Location::Near && adult_may_cross(&state) {
                self.adult_crosses()
            } else {
                Ok(false)
            };
            match acted {
                Ok(true) => side = Location::Far,
                Ok(false) => self.idle(seen),
                Err(err) => {
                    error!(%err, "adult crossing rejected");
                    self.idle(seen);
                }
            }
        }
    }

    fn child_itinerary(&self) {
        let span = info_span!("actor", run_id = %self.run_id, role = "child");
        let _enter = span.enter();

        loop {
            if self.halted() {
                debug!("run halted, actor leaving");
                return;
            }
            let seen = self.crossing.changes().generation();
            let state = self.crossing.snapshot();
            if state.everyone_far() {
                self.report_completion();
                return;
            }

            let acted = match state.boat {
                Location::Near if state.adults_near == 0 => self.children_clear_near(),
                Location::Near if state.children_near >= 2 && !self.crossing.lock().is_held() => {
                    self.children_cross_pair()
                }
                Location::Near => Ok(false),
                Location::Far => self.children_return_boat(),
            };
            match acted {
                Ok(true) => {}
                Ok(false) => self.idle(seen),
                Err(err) => {
                    error!(%err, "child crossing rejected");
                    self.idle(seen);
                }
            }
        }
    }

    /// An adult rows over; a child brings the boat back if anyone is left.
    fn adult_crosses(&self) -> Result<bool, CrossingError> {
        let mut helm = self.crossing.helm();
        if !adult_may_cross(&helm.state()) {
            return Ok(false);
        }
        helm.adult_rows(Location::Far)?;
        if helm.state().anyone_near() {
            helm.child_rows_alone(Location::Near)?;
        }
        Ok(true)
    }

    /// No adults left at the near side: shuttle every remaining child over.
    fn children_clear_near(&self) -> Result<bool, CrossingError> {
        let mut helm = self.crossing.helm();
        let state = helm.state();
        if state.boat != Location::Near || state.adults_near != 0 || state.children_near == 0 {
            return Ok(false);
        }
        loop {
            match helm.state().children_near {
                0 => break,
                1 => helm.child_rows_alone(Location::Far)?,
                2 => helm.children_cross(Location::Far)?,
                _ => {
                    helm.children_cross(Location::Far)?;
                    helm.child_rows_alone(Location::Near)?;
                }
            }
        }
        Ok(true)
    }

    /// Two children cross; one returns because adults still wait.
    fn children_cross_pair(&self) -> Result<bool, CrossingError> {
        let mut helm = self.crossing.helm();
        let state = helm.state();
        if state.boat != Location::Near || state.adults_near == 0 || state.children_near < 2 {
            return Ok(false);
        }
        helm.children_cross(Location::Far)?;
        if helm.state().adults_near > 0 {
            helm.child_rows_alone(Location::Near)?;
        }
        Ok(true)
    }

    /// Boat left at the far side: drain the remaining children once the
    /// adults are over, otherwise bring the boat back for them.
    fn children_return_boat(&self) -> Result<bool, CrossingError> {
        let mut helm = self.crossing.helm();
        let state = helm.state();
        if state.boat != Location::Far || state.everyone_far() || state.children_far == 0 {
            return Ok(false);
        }
        if state.adults_near == 0 {
            while helm.state().children_near > 0 {
                helm.child_rows_alone(Location::Near)?;
                helm.children_cross(Location::Far)?;
            }
        } else {
            helm.child_rows_alone(Location::Near)?;
        }
        Ok(true)
    }

    fn report_completion(&self) {
        let total = self.crossing.totals().total();
        let already = self.reported.swap(true, Ordering::AcqRel);
        match (self.report, already) {
            (_, false) => {
                info!(total, "everyone relocated, reporting");
                self.completion.speak(total);
            }
            (ReportPolicy::FirstObserver, true) => {
                debug!("completion already reported");
            }
            (ReportPolicy::EveryObserver, true) => {
                warn!(
                    total,
                    "completion already reported; this speaker has no listener left and will block"
                );
                self.completion.speak(total);
            }
        }
    }

    fn idle(&self, seen: u64) {
        match self.wait {
            WaitStrategy::Yield => KThread::yield_now(),
            WaitStrategy::Park => {
                self.crossing.changes().wait_past(seen, self.backstop);
            }
        }
    }
}

/// An adult may cross when the boat is here and a child waits at the far
/// side to bring it back.
const fn adult_may_cross(state: &CrossingState) -> bool {
    matches!(state.boat, Location::Near) && state.adults_near >= 1 && state.children_far >= 1
}
