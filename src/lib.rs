//! An event-driven, discrete-event simulation kernel.
//!
//! Eventix provides the two primitives at the heart of classic
//! discrete-event simulation: a simulated clock driven by a future-event
//! queue, and *facilities* (multi-server resources with priority queueing)
//! through which simulated processes contend for service.
//!
//! The kernel is deliberately small and synchronous: the simulation program
//! owns the driving loop, and the kernel owns time. Every call returns
//! before simulated time moves again, which keeps models straightforward to
//! write and to debug.
//!
//! # A practical overview
//!
//! A simulation built on this crate revolves around three activities:
//!
//! 1. *scheduling*: [`schedule()`](simulation::Simulation::schedule) files
//!    an event (an application-defined code paired with an opaque token
//!    identifying the process it concerns) to fire a given delay from now;
//! 2. *dispatching*: [`cause()`](simulation::Simulation::cause) pops the
//!    earliest pending event, advances the clock to its firing time and
//!    returns its payload; the program reacts by scheduling further events;
//! 3. *contending*: handlers call
//!    [`request()`](simulation::Simulation::request) and
//!    [`release()`](simulation::Simulation::release) to acquire and free
//!    the servers of a [facility](simulation::Simulation::facility).
//!
//! The loop terminates naturally when `cause()` returns `None`.
//!
//! When all servers of a facility are busy, `request` returns
//! [`Queued`](simulation::RequestOutcome::Queued) and the handler simply
//! returns to the loop: the kernel re-fires the event being handled once a
//! release hands a server to the queued token, at the time of that release.
//! From the model's point of view, the process just waited in line.
//!
//! # Example
//!
//! Three customers arrive at a single service desk; serving a customer
//! takes 5 time units. Customers that find the desk busy wait in line and
//! are served in arrival order:
//!
//! ```
//! use eventix::simulation::{RequestOutcome, Simulation};
//!
//! const ARRIVE: i32 = 1;
//! const DONE: i32 = 2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut simu: Simulation<u32> = Simulation::new("service desk");
//! let desk = simu.facility("desk", 1)?;
//!
//! simu.schedule(ARRIVE, 5.0, 1)?;
//! simu.schedule(ARRIVE, 6.0, 2)?;
//! simu.schedule(ARRIVE, 8.0, 3)?;
//!
//! let mut served = Vec::new();
//! while let Some((code, customer)) = simu.cause() {
//!     match code {
//!         ARRIVE => {
//!             if simu.request(desk, customer, 0)? == RequestOutcome::Reserved {
//!                 simu.schedule(DONE, 5.0, customer)?;
//!             }
//!             // On `Queued`, do nothing: the arrival will fire again once
//!             // the desk is handed to this customer.
//!         }
//!         DONE => {
//!             simu.release(desk, &customer)?;
//!             served.push((customer, simu.time().as_f64()));
//!         }
//!         _ => unreachable!(),
//!     }
//! }
//!
//! assert_eq!(served, vec![(1, 10.0), (2, 15.0), (3, 20.0)]);
//! assert_eq!(simu.utilization(desk)?, 0.75);
//! # Ok(())
//! # }
//! ```
//!
//! # Measures
//!
//! Facilities maintain exact time-weighted occupancy statistics (mean
//! utilization, mean busy period, mean queue length), updated at every
//! state transition. See
//! [`utilization()`](simulation::Simulation::utilization),
//! [`mean_busy_period()`](simulation::Simulation::mean_busy_period),
//! [`mean_queue_length()`](simulation::Simulation::mean_queue_length) and
//! [`reset_measures()`](simulation::Simulation::reset_measures).
//!
//! # Stochastic models
//!
//! The kernel consumes time deltas, not distributions. The [`random`]
//! module provides the customary variate generators (exponential, Erlang,
//! hyperexponential, normal, uniform) over reproducible streams for models
//! that need them.
//!
//! # Logging
//!
//! The kernel emits [`tracing`] events at `TRACE` level for every
//! scheduling, dispatch and facility transition (and at `DEBUG` level for
//! suspicious model behavior). Install any `tracing` subscriber to get a
//! full simulation trace; with no subscriber the cost is negligible.
//!
//! # Modules documentation
//!
//! * the [`simulation`] module covers the driving loop, facility
//!   arbitration and the error surface,
//! * the [`time`] module documents the simulated timestamp format
//!   ([`time::SimTime`]),
//! * the [`random`] module documents the variate generators and their
//!   streams.
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

pub mod random;
pub mod simulation;
pub mod time;
