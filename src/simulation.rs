//! Discrete-event simulation management.
//!
//! This module contains the [`Simulation`] environment and the types it
//! hands out: [`FacilityId`], [`FacilityStatus`], [`RequestOutcome`] and the
//! [`SchedulingError`]/[`FacilityError`] error enums.
//!
//! # Simulation lifecycle
//!
//! A simulation program typically goes through the following stages:
//!
//! 1. creation of a [`Simulation`] instance with [`Simulation::new()`],
//! 2. creation of the facilities contended for by the simulated processes
//!    with [`Simulation::facility()`],
//! 3. scheduling of one or more bootstrap events with
//!    [`Simulation::schedule()`],
//! 4. the driving loop: each iteration calls [`Simulation::cause()`] to
//!    advance simulated time to the next event and dispatches on the
//!    returned event code, with handlers scheduling further events and
//!    acquiring or releasing facilities.
//!
//! The simulation owns all of its state and mutates it only inside calls
//! from the driving program; between calls it is quiescent. It can be reused
//! for another run with [`Simulation::init()`].
//!
//! # Blocked requests
//!
//! The contract of [`request()`](Simulation::request) is cooperative: when
//! it returns [`RequestOutcome::Queued`], the handler takes no further
//! action for that token and simply returns to the driving loop. Once a
//! server is handed over by a [`release()`](Simulation::release), the event
//! that was being handled when the request queued re-emerges from
//! [`cause()`](Simulation::cause) at the release time, and the re-invoked
//! `request` is then guaranteed to return
//! [`RequestOutcome::Reserved`]: the server was transferred at release time
//! and cannot be stolen by another same-time event.

mod event_queue;
mod facility;

pub use facility::{FacilityId, FacilityStatus};

use std::error::Error;
use std::fmt;

use tracing::{debug, trace};

use crate::time::SimTime;

use event_queue::{EventQueue, EventRecord};
use facility::{Facility, NotHeld};

/// Application-defined identifier for what an event does.
///
/// Event codes are opaque to the kernel: they are stored, compared and
/// returned, never interpreted.
pub type EventCode = i32;

/// Outcome of a facility request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
    /// The token now holds a server of the facility.
    Reserved,
    /// All servers were busy; the token was queued. The event being handled
    /// will fire again once a server is handed to this token.
    Queued,
}

/// Error returned when an event cannot be scheduled.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SchedulingError {
    /// The time to event is negative, NaN or infinite, or would push the
    /// firing time out of the representable range.
    InvalidTimeToEvent,
}

impl fmt::Display for SchedulingError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimeToEvent => {
                write!(fmt, "the time to event should be a finite nonnegative value")
            }
        }
    }
}

impl Error for SchedulingError {}

/// Error returned by facility operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FacilityError {
    /// The facility identifier does not designate a facility of this
    /// simulation run.
    NoSuchFacility,
    /// A facility cannot be created with zero servers.
    InvalidServerCount,
    /// The releasing token holds no server of the facility.
    NotHeld,
    /// The request would have queued, but no event is being dispatched so
    /// there is no event to re-fire when a server is handed over.
    RequestOutsideDispatch,
}

impl fmt::Display for FacilityError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchFacility => write!(fmt, "no such facility"),
            Self::InvalidServerCount => {
                write!(fmt, "a facility should have at least one server")
            }
            Self::NotHeld => write!(
                fmt,
                "the releasing token does not hold a server of the facility"
            ),
            Self::RequestOutsideDispatch => write!(
                fmt,
                "a request can only be queued while an event is being dispatched"
            ),
        }
    }
}

impl Error for FacilityError {}

/// Simulation environment.
///
/// A `Simulation` bundles the simulated clock, the future-event queue and
/// the facility table. The type parameter `T` is the token type: an opaque,
/// caller-defined handle identifying the logical process an event concerns.
/// The kernel only ever clones tokens and compares them for equality.
///
/// Simulated time advances exclusively inside [`cause()`](Simulation::cause),
/// which pops the earliest pending event, moves the clock to its firing time
/// and returns its `(code, token)` payload. Events sharing a firing time are
/// returned in scheduling order.
pub struct Simulation<T: Clone + Eq> {
    name: String,
    clock: SimTime,
    events: EventQueue<T>,
    facilities: Vec<Facility<T>>,
    in_flight: Option<EventRecord<T>>,
}

impl<T: Clone + Eq> Simulation<T> {
    /// Creates a new simulation environment with the provided run name.
    ///
    /// The clock starts at [`SimTime::ZERO`] with no pending events and no
    /// facilities.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clock: SimTime::ZERO,
            events: EventQueue::new(),
            facilities: Vec::new(),
            in_flight: None,
        }
    }

    /// Re-initializes the simulation environment for a new run.
    ///
    /// The clock is reset to [`SimTime::ZERO`], all pending events are
    /// discarded and all facilities are destroyed together with their
    /// measures. Previously issued [`FacilityId`]s become invalid.
    pub fn init(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.clock = SimTime::ZERO;
        self.events.clear();
        self.facilities.clear();
        self.in_flight = None;
    }

    /// Returns the run name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulated time.
    ///
    /// This value only changes inside [`cause()`](Simulation::cause).
    pub fn time(&self) -> SimTime {
        self.clock
    }

    /// Schedules an event to fire `delay` time units from now.
    ///
    /// A zero delay is valid: the event fires at the current time, after any
    /// event already scheduled for it.
    pub fn schedule(&mut self, code: EventCode, delay: f64, token: T) -> Result<(), SchedulingError> {
        let time = self
            .clock
            .checked_add(delay)
            .ok_or(SchedulingError::InvalidTimeToEvent)?;

        trace!(now = self.clock.as_f64(), code, at = time.as_f64(), "schedule");
        self.events.insert(time, EventRecord { code, token });

        Ok(())
    }

    /// Fires the next pending event: advances the clock to its firing time
    /// and returns its `(code, token)` payload.
    ///
    /// Returns `None` when no event is pending, which is the natural
    /// termination condition of the driving loop. Tokens queued on busy
    /// facilities do not count as pending events: a simulation whose event
    /// queue drains while waiters remain queued is stalled by construction,
    /// and `cause` reports it as finished.
    pub fn cause(&mut self) -> Option<(EventCode, T)> {
        let (time, event) = self.events.pull()?;

        self.clock = time;
        self.in_flight = Some(event.clone());
        trace!(now = time.as_f64(), code = event.code, "cause");

        Some((event.code, event.token))
    }

    /// Cancels the earliest-firing pending event with the provided code and
    /// returns its token, or `None` if no such event is pending.
    pub fn cancel(&mut self, code: EventCode) -> Option<T> {
        let (time, event) = self.events.remove_earliest(|event| event.code == code)?;

        trace!(now = self.clock.as_f64(), code, at = time.as_f64(), "cancel");

        Some(event.token)
    }

    /// Cancels the earliest-firing pending event matching both the provided
    /// code and token. Returns whether an event was cancelled.
    pub fn unschedule(&mut self, code: EventCode, token: &T) -> bool {
        let removed = self
            .events
            .remove_earliest(|event| event.code == code && event.token == *token);

        if let Some((time, _)) = &removed {
            trace!(
                now = self.clock.as_f64(),
                code,
                at = time.as_f64(),
                "unschedule"
            );
        }

        removed.is_some()
    }

    /// Creates a facility with the provided name and number of servers.
    ///
    /// The name is informational only and needs not be unique. At least one
    /// server is required.
    pub fn facility(
        &mut self,
        name: impl Into<String>,
        server_count: usize,
    ) -> Result<FacilityId, FacilityError> {
        if server_count < 1 {
            return Err(FacilityError::InvalidServerCount);
        }

        let name = name.into();
        let id = FacilityId(self.facilities.len());
        trace!(facility = %name, servers = server_count, "create facility");
        self.facilities
            .push(Facility::new(name, server_count, self.clock));

        Ok(id)
    }

    /// Returns the name of a facility.
    pub fn facility_name(&self, id: FacilityId) -> Result<&str, FacilityError> {
        self.facility_ref(id).map(Facility::name)
    }

    /// Attempts to reserve a server of a facility for a token.
    ///
    /// If a server is available (idle, or already handed to this token by a
    /// release), the token takes it and the outcome is
    /// [`RequestOutcome::Reserved`]. Otherwise the token is queued behind
    /// all waiters of equal or higher priority (higher values take
    /// precedence) and the outcome is [`RequestOutcome::Queued`]; the event
    /// currently being dispatched will fire again for this token once a
    /// server is handed over, and the handler is expected to re-invoke
    /// `request` at that point.
    ///
    /// Queueing is only possible while an event is being dispatched, since
    /// the event being handled is what gets re-fired; a request made outside
    /// the driving loop fails with
    /// [`FacilityError::RequestOutsideDispatch`] when it cannot be satisfied
    /// immediately.
    pub fn request(
        &mut self,
        id: FacilityId,
        token: T,
        priority: i32,
    ) -> Result<RequestOutcome, FacilityError> {
        let clock = self.clock;
        let in_flight_code = self.in_flight.as_ref().map(|event| event.code);
        let facility = self
            .facilities
            .get_mut(id.0)
            .ok_or(FacilityError::NoSuchFacility)?;

        if facility.claim_handoff(&token) {
            trace!(now = clock.as_f64(), facility = facility.name(), "request: reserved (hand-off)");
            return Ok(RequestOutcome::Reserved);
        }

        if facility.reserve_idle(&token, priority, clock) {
            trace!(now = clock.as_f64(), facility = facility.name(), "request: reserved");
            return Ok(RequestOutcome::Reserved);
        }

        // All servers busy: the request queues, which requires an event to
        // re-fire on hand-over.
        let code = in_flight_code.ok_or(FacilityError::RequestOutsideDispatch)?;

        if facility.holds_server(&token) {
            // Legal, but the waiter can only unblock on another token's
            // release. Almost certainly a model bug.
            debug!(
                now = clock.as_f64(),
                facility = facility.name(),
                "token queued on a facility it already holds"
            );
        }

        let in_queue = facility.enqueue(token, priority, code, clock);
        trace!(
            now = clock.as_f64(),
            facility = facility.name(),
            in_queue,
            "request: queued"
        );

        Ok(RequestOutcome::Queued)
    }

    /// Releases the server of a facility held by a token.
    ///
    /// If waiters are queued on the facility, the freed server is
    /// immediately handed to the highest-priority one (FIFO within a
    /// priority class) and the event that was being handled when that waiter
    /// queued is re-fired at the current time: after events already
    /// scheduled for this time, before any later event.
    pub fn release(&mut self, id: FacilityId, token: &T) -> Result<(), FacilityError> {
        let clock = self.clock;
        let facility = self
            .facilities
            .get_mut(id.0)
            .ok_or(FacilityError::NoSuchFacility)?;

        match facility.release(token, clock) {
            Err(NotHeld) => Err(FacilityError::NotHeld),
            Ok(None) => {
                trace!(now = clock.as_f64(), facility = facility.name(), "release");
                Ok(())
            }
            Ok(Some((code, waiter_token))) => {
                trace!(
                    now = clock.as_f64(),
                    facility = facility.name(),
                    code,
                    "release: hand-off, retry re-fired"
                );
                self.events.insert(
                    clock,
                    EventRecord {
                        code,
                        token: waiter_token,
                    },
                );
                Ok(())
            }
        }
    }

    /// Returns the current occupancy of a facility.
    pub fn status(&self, id: FacilityId) -> Result<FacilityStatus, FacilityError> {
        self.facility_ref(id).map(Facility::status)
    }

    /// Returns the time-weighted mean number of busy servers of a facility
    /// over the measurement window.
    ///
    /// For a facility with `n` servers the value ranges over `[0, n]`.
    pub fn utilization(&self, id: FacilityId) -> Result<f64, FacilityError> {
        let facility = self.facility_ref(id)?;

        Ok(facility.utilization(self.clock))
    }

    /// Returns the mean duration of the completed busy periods of a
    /// facility's servers.
    pub fn mean_busy_period(&self, id: FacilityId) -> Result<f64, FacilityError> {
        self.facility_ref(id).map(Facility::mean_busy_period)
    }

    /// Returns the time-weighted mean queue length of a facility over the
    /// measurement window.
    pub fn mean_queue_length(&self, id: FacilityId) -> Result<f64, FacilityError> {
        let facility = self.facility_ref(id)?;

        Ok(facility.mean_queue_length(self.clock))
    }

    /// Returns the number of completed busy periods across all servers of a
    /// facility since the start of the measurement window.
    pub fn release_count(&self, id: FacilityId) -> Result<u64, FacilityError> {
        self.facility_ref(id).map(Facility::release_count)
    }

    /// Returns the number of waiters that left a facility's queue for a
    /// server since the start of the measurement window.
    pub fn queue_exit_count(&self, id: FacilityId) -> Result<u64, FacilityError> {
        self.facility_ref(id).map(Facility::queue_exit_count)
    }

    /// Discards all measures taken so far and restarts every facility's
    /// measurement window at the current time.
    ///
    /// Occupancy, queued waiters and pending events are unaffected. This is
    /// typically called once the simulation has warmed up, so that steady
    /// state measures are not polluted by the initial transient.
    pub fn reset_measures(&mut self) {
        let clock = self.clock;
        for facility in &mut self.facilities {
            facility.reset_measures(clock);
        }
    }

    fn facility_ref(&self, id: FacilityId) -> Result<&Facility<T>, FacilityError> {
        self.facilities.get(id.0).ok_or(FacilityError::NoSuchFacility)
    }
}

impl<T: Clone + Eq> fmt::Debug for Simulation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("name", &self.name)
            .field("time", &self.clock)
            .field("pending_events", &self.events.len())
            .field("facilities", &self.facilities.len())
            .finish_non_exhaustive()
    }
}
