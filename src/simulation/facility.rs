//! Facilities: multi-server, priority-queued simulated resources.

use crate::time::SimTime;

use super::EventCode;

/// Identifier of a facility.
///
/// A `FacilityId` is issued by
/// [`Simulation::facility()`](super::Simulation::facility) and is only
/// meaningful for the simulation run that issued it: re-initializing the
/// simulation destroys all facilities and restarts the identifier sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FacilityId(pub(super) usize);

/// A snapshot of the occupancy of a facility.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FacilityStatus {
    /// Number of servers currently idle.
    pub idle_servers: usize,
    /// Number of servers currently busy, including servers already handed to
    /// a waiter whose retry event has not fired yet.
    pub busy_servers: usize,
    /// Number of waiters queued on the facility.
    pub queue_length: usize,
}

/// Error value returned by [`Facility::release`] when the releasing token
/// holds no server.
pub(super) struct NotHeld;

/// One server slot of a facility.
struct Server<T> {
    state: ServerState<T>,
    /// Number of completed busy periods.
    release_count: u64,
    /// Accumulated duration of completed busy periods.
    busy_total: f64,
}

enum ServerState<T> {
    Idle,
    Busy {
        token: T,
        priority: i32,
        since: SimTime,
        /// The server was transferred to this token by a release and the
        /// token's retry request has not claimed it yet.
        handoff: bool,
    },
}

/// A queued contender, carrying the payload of the event that will be
/// re-fired when a server is handed to it.
struct Waiter<T> {
    token: T,
    priority: i32,
    code: EventCode,
}

/// Time-weighted occupancy measures, maintained lazily: the integrals are
/// brought up to date with the pre-transition counts before every state
/// transition, and queries fold the live delta in on read.
struct Measures {
    busy_integral: f64,
    queue_integral: f64,
    last_change: SimTime,
    queue_exits: u64,
    window_start: SimTime,
}

/// A facility record: a fixed pool of server slots and a priority-ordered
/// waiter queue.
///
/// The waiter queue is kept in descending priority order, FIFO within a
/// priority class. The facility does not know about the event queue; the
/// simulation layer re-fires the payload returned by [`release`](Self::release).
pub(super) struct Facility<T> {
    name: String,
    servers: Box<[Server<T>]>,
    busy_servers: usize,
    queue: Vec<Waiter<T>>,
    measures: Measures,
}

impl<T: Clone + Eq> Facility<T> {
    /// Creates a facility with the specified number of servers, all idle.
    ///
    /// The measurement window starts at the creation time.
    pub(super) fn new(name: String, server_count: usize, now: SimTime) -> Self {
        debug_assert!(server_count >= 1);

        let servers = (0..server_count)
            .map(|_| Server {
                state: ServerState::Idle,
                release_count: 0,
                busy_total: 0.0,
            })
            .collect();

        Self {
            name,
            servers,
            busy_servers: 0,
            queue: Vec::new(),
            measures: Measures {
                busy_integral: 0.0,
                queue_integral: 0.0,
                last_change: now,
                queue_exits: 0,
                window_start: now,
            },
        }
    }

    pub(super) fn name(&self) -> &str {
        &self.name
    }

    pub(super) fn status(&self) -> FacilityStatus {
        FacilityStatus {
            idle_servers: self.servers.len() - self.busy_servers,
            busy_servers: self.busy_servers,
            queue_length: self.queue.len(),
        }
    }

    /// Brings both occupancy integrals up to date with the counts that held
    /// since the last transition.
    fn touch(&mut self, now: SimTime) {
        let delta = now.duration_since(self.measures.last_change);
        self.measures.busy_integral += self.busy_servers as f64 * delta;
        self.measures.queue_integral += self.queue.len() as f64 * delta;
        self.measures.last_change = now;
    }

    /// Claims a server previously handed to this token by a release.
    ///
    /// Returns `false` if no such server exists. Claiming changes no
    /// occupancy count: the server has been busy on the token's behalf since
    /// the release transferred it.
    pub(super) fn claim_handoff(&mut self, token: &T) -> bool {
        for server in self.servers.iter_mut() {
            if let ServerState::Busy {
                token: holder,
                handoff,
                ..
            } = &mut server.state
            {
                if *handoff && holder == token {
                    *handoff = false;
                    return true;
                }
            }
        }

        false
    }

    /// Marks the lowest-indexed idle server busy for the provided token.
    ///
    /// Returns `false` without touching any state if all servers are busy.
    pub(super) fn reserve_idle(&mut self, token: &T, priority: i32, now: SimTime) -> bool {
        if self.busy_servers == self.servers.len() {
            return false;
        }

        self.touch(now);
        let server = self
            .servers
            .iter_mut()
            .find(|server| matches!(server.state, ServerState::Idle))
            .expect("server accounting out of sync with slot states");
        server.state = ServerState::Busy {
            token: token.clone(),
            priority,
            since: now,
            handoff: false,
        };
        self.busy_servers += 1;

        true
    }

    /// Reports whether the token currently holds at least one server.
    pub(super) fn holds_server(&self, token: &T) -> bool {
        self.servers.iter().any(
            |server| matches!(&server.state, ServerState::Busy { token: holder, .. } if holder == token),
        )
    }

    /// Appends a contender to the waiter queue and returns the new queue
    /// length.
    ///
    /// The queue is ordered by descending priority; a contender goes after
    /// all waiters of equal or higher priority.
    pub(super) fn enqueue(&mut self, token: T, priority: i32, code: EventCode, now: SimTime) -> usize {
        self.touch(now);
        let position = self
            .queue
            .iter()
            .position(|waiter| waiter.priority < priority)
            .unwrap_or(self.queue.len());
        self.queue.insert(
            position,
            Waiter {
                token,
                priority,
                code,
            },
        );

        self.queue.len()
    }

    /// Releases the lowest-indexed server held by the provided token.
    ///
    /// If the waiter queue is non-empty, the freed server is immediately
    /// transferred to the head waiter and the payload of that waiter's retry
    /// event is returned so the caller can re-fire it at the current time.
    pub(super) fn release(
        &mut self,
        token: &T,
        now: SimTime,
    ) -> Result<Option<(EventCode, T)>, NotHeld> {
        let slot = self
            .servers
            .iter()
            .position(
                |server| matches!(&server.state, ServerState::Busy { token: holder, .. } if holder == token),
            )
            .ok_or(NotHeld)?;

        self.touch(now);

        let server = &mut self.servers[slot];
        if let ServerState::Busy { since, .. } = &server.state {
            server.busy_total += now.duration_since(*since);
        }
        server.release_count += 1;
        server.state = ServerState::Idle;
        self.busy_servers -= 1;

        if self.queue.is_empty() {
            return Ok(None);
        }

        // Transfer the freed server to the head waiter right away so that no
        // other same-time event can steal it before the retry fires.
        let waiter = self.queue.remove(0);
        self.measures.queue_exits += 1;
        self.servers[slot].state = ServerState::Busy {
            token: waiter.token.clone(),
            priority: waiter.priority,
            since: now,
            handoff: true,
        };
        self.busy_servers += 1;

        Ok(Some((waiter.code, waiter.token)))
    }

    /// Returns the busy-server time integral, folded up to `now`.
    pub(super) fn busy_integral(&self, now: SimTime) -> f64 {
        self.measures.busy_integral
            + self.busy_servers as f64 * now.duration_since(self.measures.last_change)
    }

    /// Returns the queue-length time integral, folded up to `now`.
    pub(super) fn queue_integral(&self, now: SimTime) -> f64 {
        self.measures.queue_integral
            + self.queue.len() as f64 * now.duration_since(self.measures.last_change)
    }

    /// Returns the time-weighted mean number of busy servers over the
    /// measurement window, or 0 if the window is empty.
    pub(super) fn utilization(&self, now: SimTime) -> f64 {
        let interval = now.duration_since(self.measures.window_start);
        if interval > 0.0 {
            self.busy_integral(now) / interval
        } else {
            0.0
        }
    }

    /// Returns the mean duration of completed busy periods, or the
    /// accumulated busy time if no period has completed yet.
    pub(super) fn mean_busy_period(&self) -> f64 {
        let mut releases = 0;
        let mut busy_total = 0.0;
        for server in self.servers.iter() {
            releases += server.release_count;
            busy_total += server.busy_total;
        }

        if releases > 0 {
            busy_total / releases as f64
        } else {
            busy_total
        }
    }

    /// Returns the number of completed busy periods across all servers.
    pub(super) fn release_count(&self) -> u64 {
        self.servers.iter().map(|server| server.release_count).sum()
    }

    /// Returns the number of waiters dequeued so far.
    pub(super) fn queue_exit_count(&self) -> u64 {
        self.measures.queue_exits
    }

    /// Returns the time-weighted mean queue length over the measurement
    /// window, or 0 if the window is empty.
    pub(super) fn mean_queue_length(&self, now: SimTime) -> f64 {
        let interval = now.duration_since(self.measures.window_start);
        if interval > 0.0 {
            self.queue_integral(now) / interval
        } else {
            0.0
        }
    }

    /// Discards all measures taken so far and restarts the measurement
    /// window at `now`. Occupancy itself is unaffected.
    ///
    /// Busy periods in progress are re-stamped at `now`, so the part served
    /// before the reset does not leak into the new window's busy periods.
    pub(super) fn reset_measures(&mut self, now: SimTime) {
        self.measures = Measures {
            busy_integral: 0.0,
            queue_integral: 0.0,
            last_change: now,
            queue_exits: 0,
            window_start: now,
        };
        for server in self.servers.iter_mut() {
            server.release_count = 0;
            server.busy_total = 0.0;
            if let ServerState::Busy { since, .. } = &mut server.state {
                *since = now;
            }
        }
    }
}
