//! Future-event queue.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::time::SimTime;

use super::EventCode;

/// A scheduled occurrence: at `time`, signal the simulation program with
/// `(code, token)`.
#[derive(Clone, Debug)]
pub(super) struct EventRecord<T> {
    pub(super) code: EventCode,
    pub(super) token: T,
}

/// An event record filed for dispatch.
///
/// The rank is the value of the queue's insertion counter when the event was
/// filed. It breaks ties between events sharing a firing time, so that
/// dispatch within a single simulated instant is first-scheduled,
/// first-fired.
struct Entry<T> {
    time: SimTime,
    rank: u64,
    event: EventRecord<T>,
}

impl<T> Entry<T> {
    /// The dispatch key: firing time first, scheduling rank second.
    fn dispatch_key(&self) -> (SimTime, u64) {
        (self.time, self.rank)
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dispatch_key().cmp(&other.dispatch_key())
    }
}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.dispatch_key() == other.dispatch_key()
    }
}

/// The future-event queue.
///
/// Entries order naturally by dispatch key, and `BinaryHeap` is a max-heap,
/// so they are stored under [`Reverse`] to make the earliest key the one
/// that pops. Events sharing a firing time come out in the order they were
/// scheduled.
pub(super) struct EventQueue<T> {
    heap: BinaryHeap<Reverse<Entry<T>>>,
    next_rank: u64,
}

impl<T> EventQueue<T> {
    /// Creates an empty `EventQueue`.
    pub(super) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_rank: 0,
        }
    }

    /// Files an event record for dispatch at the specified time.
    ///
    /// An event filed later always fires after events previously filed for
    /// the same time.
    pub(super) fn insert(&mut self, time: SimTime, event: EventRecord<T>) {
        let rank = self.next_rank;
        self.next_rank += 1;

        self.heap.push(Reverse(Entry { time, rank, event }));
    }

    /// Removes and returns the event record next in dispatch order.
    pub(super) fn pull(&mut self) -> Option<(SimTime, EventRecord<T>)> {
        let Reverse(entry) = self.heap.pop()?;

        Some((entry.time, entry.event))
    }

    /// Removes and returns the first event record in dispatch order that
    /// satisfies the provided predicate, if any.
    ///
    /// This operation is *O*(*N*): the heap is scanned for the best matching
    /// dispatch key, then rebuilt without that entry. Cancellation is
    /// expected to be much rarer than scheduling, so this trade keeps the
    /// hot insert/pull paths free of bookkeeping.
    pub(super) fn remove_earliest<F>(&mut self, mut matches: F) -> Option<(SimTime, EventRecord<T>)>
    where
        F: FnMut(&EventRecord<T>) -> bool,
    {
        let target_rank = self
            .heap
            .iter()
            .filter(|Reverse(entry)| matches(&entry.event))
            .min_by_key(|Reverse(entry)| entry.dispatch_key())
            .map(|Reverse(entry)| entry.rank)?;

        let mut removed = None;
        let entries = std::mem::take(&mut self.heap).into_vec();
        self.heap = entries
            .into_iter()
            .filter_map(|Reverse(entry)| {
                if entry.rank == target_rank {
                    removed = Some((entry.time, entry.event));
                    None
                } else {
                    Some(Reverse(entry))
                }
            })
            .collect();

        removed
    }

    /// Removes all queued events.
    pub(super) fn clear(&mut self) {
        self.heap.clear();
        self.next_rank = 0;
    }

    /// Returns the number of queued events.
    pub(super) fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARRIVAL: EventCode = 1;
    const DEPARTURE: EventCode = 2;
    const TIMEOUT: EventCode = 3;

    fn record(code: EventCode, token: &'static str) -> EventRecord<&'static str> {
        EventRecord { code, token }
    }

    fn at(time: f64) -> SimTime {
        SimTime::checked_new(time).unwrap()
    }

    #[test]
    fn pull_orders_by_time_then_scheduling_order() {
        let mut q = EventQueue::new();

        q.insert(at(7.5), record(DEPARTURE, "job-1"));
        q.insert(at(0.25), record(ARRIVAL, "job-2"));
        q.insert(at(3.0), record(TIMEOUT, "job-1"));
        q.insert(at(3.0), record(ARRIVAL, "job-3"));
        q.insert(at(3.0), record(DEPARTURE, "job-2"));
        q.insert(at(12.0), record(TIMEOUT, "job-3"));

        let mut fired = Vec::new();
        while let Some((time, event)) = q.pull() {
            fired.push((time.as_f64(), event.code, event.token));
        }

        // The three events filed for t = 3 must fire in filing order.
        assert_eq!(
            fired,
            vec![
                (0.25, ARRIVAL, "job-2"),
                (3.0, TIMEOUT, "job-1"),
                (3.0, ARRIVAL, "job-3"),
                (3.0, DEPARTURE, "job-2"),
                (7.5, DEPARTURE, "job-1"),
                (12.0, TIMEOUT, "job-3"),
            ]
        );
    }

    #[test]
    fn remove_earliest_takes_first_match_in_dispatch_order() {
        let mut q = EventQueue::new();

        q.insert(at(4.0), record(TIMEOUT, "job-1"));
        q.insert(at(1.0), record(ARRIVAL, "job-2"));
        q.insert(at(2.5), record(TIMEOUT, "job-2"));
        q.insert(at(6.0), record(TIMEOUT, "job-3"));

        // Three timeouts are queued; the one at t = 2.5 fires first.
        let (time, event) = q.remove_earliest(|e| e.code == TIMEOUT).unwrap();
        assert_eq!(time, at(2.5));
        assert_eq!(event.token, "job-2");

        // The remaining events are untouched and still properly ordered.
        let mut remaining = Vec::new();
        while let Some((_, event)) = q.pull() {
            remaining.push((event.code, event.token));
        }
        assert_eq!(
            remaining,
            vec![
                (ARRIVAL, "job-2"),
                (TIMEOUT, "job-1"),
                (TIMEOUT, "job-3")
            ]
        );
    }

    #[test]
    fn remove_earliest_without_match() {
        let mut q = EventQueue::new();

        q.insert(at(1.0), record(ARRIVAL, "job-1"));

        assert!(q.remove_earliest(|e| e.code == DEPARTURE).is_none());
        assert_eq!(q.len(), 1);
    }
}
