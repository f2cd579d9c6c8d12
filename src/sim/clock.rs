//! Virtual discrete-event clock.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

use super::event::SimEvent;

/// A point in simulated time, in seconds since the start of the run.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct SimTime(f64);

impl SimTime {
    /// The start of the simulation.
    pub const ZERO: SimTime = SimTime(0.0);

    /// Creates a timestamp from seconds.
    ///
    /// # Panics
    ///
    /// Panics if `secs` is negative or not finite.
    pub fn from_secs(secs: f64) -> Self {
        assert!(secs.is_finite() && secs >= 0.0, "invalid time {secs} s");
        Self(secs)
    }

    /// Returns the timestamp in seconds.
    pub fn as_secs(self) -> f64 {
        self.0
    }

    /// Signed number of seconds from `earlier` to `self`.
    ///
    /// Negative when `earlier` is actually later; callers decide whether
    /// that is an error.
    pub fn secs_since(self, earlier: SimTime) -> f64 {
        self.0 - earlier.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.0)
    }
}

/// Handle of a scheduled event, used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u64);

/// Capability to read the simulated time and register future events.
///
/// Components never own the clock; they receive it as `&mut dyn Scheduler`
/// in every operation that needs time or timers.
pub trait Scheduler {
    /// Current simulated time.
    fn now(&self) -> SimTime;

    /// Registers `event` to fire `delay_s` seconds from now.
    fn schedule(&mut self, delay_s: f64, event: SimEvent) -> EventId;

    /// Cancels a pending event. Cancelling a fired or unknown event is a no-op.
    fn cancel(&mut self, id: EventId);
}

#[derive(Debug)]
struct Pending {
    at: SimTime,
    seq: u64,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    // Reversed so the max-heap pops the earliest (time, seq) first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .0
            .total_cmp(&self.at.0)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A virtual clock with an event queue.
///
/// Events are delivered in nondecreasing time order; events scheduled for
/// the same instant are delivered in the order they were scheduled.
///
/// # Examples
///
/// ```
/// use radio_energy_sim::sim::clock::{Clock, Scheduler, SimTime};
/// use radio_energy_sim::sim::event::SimEvent;
///
/// let mut clock = Clock::new();
/// clock.schedule(2.0, SimEvent::ReturnToIdle);
/// let first = clock.schedule(1.0, SimEvent::ForcedIdle);
/// clock.cancel(first);
///
/// let (_, event) = clock.pop_until(SimTime::from_secs(10.0)).unwrap();
/// assert_eq!(event, SimEvent::ReturnToIdle);
/// assert_eq!(clock.now(), SimTime::from_secs(2.0));
/// assert!(clock.pop_until(SimTime::from_secs(10.0)).is_none());
/// ```
#[derive(Debug, Default)]
pub struct Clock {
    now: SimTime,
    next_seq: u64,
    queue: BinaryHeap<Pending>,
    /// Live events by sequence number; cancelled entries stay in the heap
    /// and are skipped when popped.
    live: HashMap<u64, (SimTime, SimEvent)>,
}

impl Clock {
    /// Creates a clock at time zero with no pending events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events that are scheduled and not cancelled.
    pub fn pending_count(&self) -> usize {
        self.live.len()
    }

    /// Returns when a pending event will fire, or `None` if it already fired
    /// or was cancelled.
    pub fn scheduled_time(&self, id: EventId) -> Option<SimTime> {
        self.live.get(&id.0).map(|(at, _)| *at)
    }

    /// Time of the earliest live event.
    pub fn peek_time(&mut self) -> Option<SimTime> {
        self.discard_cancelled();
        self.queue.peek().map(|p| p.at)
    }

    /// Moves time forward to `t` without delivering any event.
    ///
    /// # Panics
    ///
    /// Panics if `t` is earlier than the current time.
    pub fn advance_to(&mut self, t: SimTime) {
        assert!(
            t >= self.now,
            "clock cannot move backwards from {} to {t}",
            self.now
        );
        self.now = t;
    }

    /// Pops the next live event due at or before `horizon`, advancing the
    /// clock to its timestamp.
    pub fn pop_until(&mut self, horizon: SimTime) -> Option<(EventId, SimEvent)> {
        self.discard_cancelled();
        let next = self.queue.peek()?;
        if next.at > horizon {
            return None;
        }
        let pending = self.queue.pop()?;
        let (at, event) = self.live.remove(&pending.seq)?;
        self.now = at;
        Some((EventId(pending.seq), event))
    }

    fn discard_cancelled(&mut self) {
        while let Some(top) = self.queue.peek() {
            if self.live.contains_key(&top.seq) {
                break;
            }
            self.queue.pop();
        }
    }
}

impl Scheduler for Clock {
    fn now(&self) -> SimTime {
        self.now
    }

    /// # Panics
    ///
    /// Panics if `delay_s` is negative or not finite.
    fn schedule(&mut self, delay_s: f64, event: SimEvent) -> EventId {
        assert!(
            delay_s.is_finite() && delay_s >= 0.0,
            "invalid scheduling delay {delay_s} s"
        );
        let seq = self.next_seq;
        self.next_seq += 1;
        let at = SimTime(self.now.0 + delay_s);
        self.queue.push(Pending { at, seq });
        self.live.insert(seq, (at, event));
        EventId(seq)
    }

    fn cancel(&mut self, id: EventId) {
        self.live.remove(&id.0);
    }
}
