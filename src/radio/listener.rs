//! Translation of PHY activity notifications into state-change requests.

use log::debug;

use crate::sim::clock::{EventId, Scheduler};
use crate::sim::event::SimEvent;

use super::types::OperatingState;

/// Interface the upstream PHY calls at every activity boundary.
pub trait PhyListener {
    /// A reception of nominal length `duration_s` starts.
    fn notify_rx_start(&mut self, clock: &mut dyn Scheduler, duration_s: f64);

    /// The current reception ended and the frame was decoded.
    fn notify_rx_end_ok(&mut self, clock: &mut dyn Scheduler);

    /// The current reception ended with a corrupted frame.
    fn notify_rx_end_error(&mut self, clock: &mut dyn Scheduler);

    /// A transmission of length `duration_s` starts.
    fn notify_tx_start(&mut self, clock: &mut dyn Scheduler, duration_s: f64);
}

/// Callback through which the listener requests a state on its target.
pub type ChangeStateFn<T> = fn(&mut T, &mut dyn Scheduler, OperatingState);

/// Maps PHY activity onto operating states of a target `T`.
///
/// Receptions are ended explicitly by the PHY; transmissions are not, so the
/// listener times them itself and requests Idle once the announced airtime
/// has elapsed. The listener owns that return-to-idle timer; when it fires,
/// the owner routes it back through [`ActivityListener::return_to_idle`].
pub struct ActivityListener<T> {
    change_state: Option<ChangeStateFn<T>>,
    return_to_idle_event: Option<EventId>,
}

impl<T> Default for ActivityListener<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ActivityListener<T> {
    /// Creates a listener with no state-change callback bound.
    pub fn new() -> Self {
        Self {
            change_state: None,
            return_to_idle_event: None,
        }
    }

    /// Binds the callback used to request state changes.
    pub fn set_change_state_callback(&mut self, callback: ChangeStateFn<T>) {
        self.change_state = Some(callback);
    }

    /// Pending return-to-idle event, if a transmission is being timed.
    pub fn return_to_idle_event(&self) -> Option<EventId> {
        self.return_to_idle_event
    }

    /// Requests ReceiveData and drops any transmit timeout, since the PHY
    /// will report the end of the reception itself.
    ///
    /// # Panics
    ///
    /// Panics if no state-change callback is bound.
    pub fn on_receive_start(&mut self, target: &mut T, clock: &mut dyn Scheduler, duration_s: f64) {
        let change_state = self.callback();
        debug!("rx start at {} for {duration_s} s", clock.now());
        change_state(target, clock, OperatingState::ReceiveData);
        if let Some(id) = self.return_to_idle_event.take() {
            clock.cancel(id);
        }
    }

    /// Requests Idle.
    ///
    /// # Panics
    ///
    /// Panics if no state-change callback is bound.
    pub fn on_receive_end_ok(&mut self, target: &mut T, clock: &mut dyn Scheduler) {
        let change_state = self.callback();
        change_state(target, clock, OperatingState::Idle);
    }

    /// Requests Idle; a corrupted frame costs the same energy as a good one.
    ///
    /// # Panics
    ///
    /// Panics if no state-change callback is bound.
    pub fn on_receive_end_error(&mut self, target: &mut T, clock: &mut dyn Scheduler) {
        let change_state = self.callback();
        change_state(target, clock, OperatingState::Idle);
    }

    /// Requests Transmit and schedules the return to Idle `duration_s` later,
    /// replacing any pending one.
    ///
    /// # Panics
    ///
    /// Panics if no state-change callback is bound.
    pub fn on_transmit_start(&mut self, target: &mut T, clock: &mut dyn Scheduler, duration_s: f64) {
        let change_state = self.callback();
        debug!("tx start at {} for {duration_s} s", clock.now());
        change_state(target, clock, OperatingState::Transmit);
        if let Some(id) = self.return_to_idle_event.take() {
            clock.cancel(id);
        }
        self.return_to_idle_event = Some(clock.schedule(duration_s, SimEvent::ReturnToIdle));
    }

    /// Fires when the transmit airtime has elapsed; requests Idle.
    ///
    /// # Panics
    ///
    /// Panics if no state-change callback is bound.
    pub fn return_to_idle(&mut self, target: &mut T, clock: &mut dyn Scheduler) {
        let change_state = self.callback();
        self.return_to_idle_event = None;
        change_state(target, clock, OperatingState::Idle);
    }

    fn callback(&self) -> ChangeStateFn<T> {
        match self.change_state {
            Some(callback) => callback,
            None => panic!("change state callback not set"),
        }
    }
}
