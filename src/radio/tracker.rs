//! Energy ledger and state machine of a radio device.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::devices::types::{EnergySource, SourceSignal};
use crate::sim::clock::{EventId, Scheduler, SimTime};
use crate::sim::event::SimEvent;

use super::types::{
    CurrentProfile, EnergyHook, EnergyTrace, LedgerSample, NodeId, OperatingState, StateTrace,
};

/// Shared handle to the energy source powering a device.
pub type SharedSource = Rc<RefCell<dyn EnergySource>>;

/// Slack allowed when comparing the ledger against the source's initial
/// energy, absorbing rounding in `remaining / (draw * voltage)` projections.
const BUDGET_TOLERANCE_J: f64 = 1e-9;

/// Cumulative energy bookkeeping of one radio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyLedger {
    total_energy_j: f64,
    last_update: SimTime,
    state: OperatingState,
    pending_changes: u32,
}

impl EnergyLedger {
    fn new() -> Self {
        Self {
            total_energy_j: 0.0,
            last_update: SimTime::ZERO,
            state: OperatingState::Idle,
            pending_changes: 0,
        }
    }

    /// Energy accrued up to [`EnergyLedger::last_update`] (J).
    pub fn total_energy_j(&self) -> f64 {
        self.total_energy_j
    }

    /// Time of the last accrual.
    pub fn last_update(&self) -> SimTime {
        self.last_update
    }

    /// State the radio is in.
    pub fn state(&self) -> OperatingState {
        self.state
    }

    /// Number of state-change requests currently on the call stack.
    pub fn pending_changes(&self) -> u32 {
        self.pending_changes
    }
}

/// Tracks the operating state of a radio and the energy it has consumed.
///
/// Every state change settles the energy spent in the previous state at that
/// state's draw, then notifies the energy source. While the radio is in a
/// non-idle state a predictive-off timer is armed for the moment the source
/// would run dry at the current draw; when it fires the radio is forced back
/// to [`OperatingState::Idle`].
///
/// The tracker does not own the clock. Operations that need time or timers
/// take a [`Scheduler`], and timer expiry is routed back through
/// [`PowerStateTracker::on_forced_idle`].
pub struct PowerStateTracker {
    ledger: EnergyLedger,
    profile: CurrentProfile,
    source: Option<SharedSource>,
    node: Option<NodeId>,
    forced_idle_event: Option<EventId>,
    nested_idle: bool,
    depletion_hook: Option<EnergyHook>,
    recharged_hook: Option<EnergyHook>,
    energy_trace: Option<EnergyTrace>,
    state_trace: Option<StateTrace>,
}

impl PowerStateTracker {
    /// Creates an idle tracker with an empty ledger and no energy source.
    pub fn new(profile: CurrentProfile) -> Self {
        Self {
            ledger: EnergyLedger::new(),
            profile,
            source: None,
            node: None,
            forced_idle_event: None,
            nested_idle: false,
            depletion_hook: None,
            recharged_hook: None,
            energy_trace: None,
            state_trace: None,
        }
    }

    /// Binds the energy source and arms the predictive-off timer for the
    /// current state.
    pub fn attach_source(&mut self, clock: &mut dyn Scheduler, source: SharedSource) {
        debug!(
            "attaching {} to node {:?}",
            source.borrow().source_type(),
            self.node
        );
        self.source = Some(source);
        self.arm_forced_idle(clock, self.ledger.state);
    }

    /// Records the owning node.
    pub fn set_node(&mut self, node: NodeId) {
        self.node = Some(node);
    }

    /// Owning node, if set.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Ledger snapshot.
    pub fn ledger(&self) -> &EnergyLedger {
        &self.ledger
    }

    /// State the radio is in.
    pub fn current_state(&self) -> OperatingState {
        self.ledger.state
    }

    /// Current drawn in the present state (A).
    pub fn current_a(&self) -> f64 {
        self.profile.draw_a(self.ledger.state)
    }

    /// Current profile in use.
    pub fn current_profile(&self) -> &CurrentProfile {
        &self.profile
    }

    /// Pending predictive-off event, if one is armed.
    pub fn forced_idle_event(&self) -> Option<EventId> {
        self.forced_idle_event
    }

    /// Returns the deep-sleep current (A).
    pub fn deep_sleep_a(&self) -> f64 {
        self.profile.deep_sleep_a
    }

    /// Sets the deep-sleep current (A).
    ///
    /// # Panics
    ///
    /// Panics if `current_a` is negative.
    pub fn set_deep_sleep_a(&mut self, current_a: f64) {
        assert!(current_a >= 0.0, "deep sleep current must be >= 0");
        self.profile.deep_sleep_a = current_a;
    }

    /// Returns the light-sleep current (A).
    pub fn light_sleep_a(&self) -> f64 {
        self.profile.light_sleep_a
    }

    /// Sets the light-sleep current (A).
    ///
    /// # Panics
    ///
    /// Panics if `current_a` is negative.
    pub fn set_light_sleep_a(&mut self, current_a: f64) {
        assert!(current_a >= 0.0, "light sleep current must be >= 0");
        self.profile.light_sleep_a = current_a;
    }

    /// Returns the micro-sleep current (A).
    pub fn micro_sleep_a(&self) -> f64 {
        self.profile.micro_sleep_a
    }

    /// Sets the micro-sleep current (A).
    ///
    /// # Panics
    ///
    /// Panics if `current_a` is negative.
    pub fn set_micro_sleep_a(&mut self, current_a: f64) {
        assert!(current_a >= 0.0, "micro sleep current must be >= 0");
        self.profile.micro_sleep_a = current_a;
    }

    /// Returns the receive current (A).
    pub fn rx_current_a(&self) -> f64 {
        self.profile.rx_current_a
    }

    /// Sets the receive current (A).
    ///
    /// # Panics
    ///
    /// Panics if `current_a` is negative.
    pub fn set_rx_current_a(&mut self, current_a: f64) {
        assert!(current_a >= 0.0, "rx current must be >= 0");
        self.profile.rx_current_a = current_a;
    }

    /// Returns the transmit current (A).
    pub fn tx_current_a(&self) -> f64 {
        self.profile.tx_current_a
    }

    /// Sets the transmit current (A).
    ///
    /// # Panics
    ///
    /// Panics if `current_a` is negative.
    pub fn set_tx_current_a(&mut self, current_a: f64) {
        assert!(current_a >= 0.0, "tx current must be >= 0");
        self.profile.tx_current_a = current_a;
    }

    /// Replaces the depletion hook. `None` disables it.
    pub fn set_depletion_callback(&mut self, hook: Option<EnergyHook>) {
        if hook.is_none() {
            debug!("setting empty energy depletion callback");
        }
        self.depletion_hook = hook;
    }

    /// Replaces the recharged hook. `None` disables it.
    pub fn set_recharged_callback(&mut self, hook: Option<EnergyHook>) {
        if hook.is_none() {
            debug!("setting empty energy recharged callback");
        }
        self.recharged_hook = hook;
    }

    /// Installs an observer of every ledger accrual.
    pub fn set_energy_trace(&mut self, trace: Option<EnergyTrace>) {
        self.energy_trace = trace;
    }

    /// Installs an observer of every state transition.
    pub fn set_state_trace(&mut self, trace: Option<StateTrace>) {
        self.state_trace = trace;
    }

    /// Total energy consumed up to `clock.now()` (J).
    ///
    /// The energy spent in the current state since the last accrual is
    /// extrapolated into the returned value but not written to the ledger.
    /// The energy source is then asked to refresh its own bookkeeping.
    ///
    /// # Panics
    ///
    /// Panics if no source is attached or the clock reads earlier than the
    /// last accrual.
    pub fn total_energy_consumed(&mut self, clock: &mut dyn Scheduler) -> f64 {
        let now = clock.now();
        let elapsed_s = now.secs_since(self.ledger.last_update);
        assert!(
            elapsed_s >= 0.0,
            "negative elapsed time: now {now}, last update {}",
            self.ledger.last_update
        );
        let voltage = self.source().borrow().supply_voltage();
        let total = self.ledger.total_energy_j + elapsed_s * self.current_a() * voltage;

        self.notify_source(clock);
        total
    }

    /// Longest time the radio can stay in `state` before the source runs dry
    /// at that state's draw (s).
    ///
    /// Returns `f64::INFINITY` for a zero draw and `0.0` for an empty source.
    ///
    /// # Panics
    ///
    /// Panics if no source is attached.
    pub fn maximum_time_in_state(&self, state: OperatingState) -> f64 {
        let source = self.source().borrow();
        let remaining_j = source.remaining_energy();
        if remaining_j <= 0.0 {
            return 0.0;
        }
        let power_w = self.profile.draw_a(state) * source.supply_voltage();
        if power_w <= 0.0 {
            return f64::INFINITY;
        }
        remaining_j / power_w
    }

    /// Moves the radio to `state`, settling the energy spent in the previous
    /// state first.
    ///
    /// Requests may nest: a hook invoked while the source is notified can
    /// request another state. A nested request for Idle takes effect at once
    /// without accruing energy a second time and wins over the outer request.
    /// Otherwise the outer request commits its own state once every nested
    /// request has returned, and a non-idle state gets its predictive-off
    /// timer re-armed against the remaining energy the source just reported.
    ///
    /// # Panics
    ///
    /// Panics if no source is attached, the clock reads earlier than the last
    /// accrual, or the ledger would exceed the energy the source has supplied
    /// (its initial energy plus anything harvested since).
    pub fn request_state_change(&mut self, clock: &mut dyn Scheduler, state: OperatingState) {
        debug!("state change to {state} requested at {}", clock.now());
        self.ledger.pending_changes += 1;

        if self.ledger.pending_changes > 1 && state == OperatingState::Idle {
            self.nested_idle = true;
            self.set_state(clock.now(), state);
            self.ledger.pending_changes -= 1;
            return;
        }

        if state != OperatingState::Idle {
            self.arm_forced_idle(clock, state);
        }

        let now = clock.now();
        let elapsed_s = now.secs_since(self.ledger.last_update);
        assert!(
            elapsed_s >= 0.0,
            "negative elapsed time: now {now}, last update {}",
            self.ledger.last_update
        );

        let (voltage, budget_j) = {
            let source = self.source().borrow();
            (
                source.supply_voltage(),
                source.initial_energy() + source.harvested_energy(),
            )
        };
        let previous = self.ledger.state;
        let energy_j = elapsed_s * self.profile.draw_a(previous) * voltage;
        let total_j = self.ledger.total_energy_j + energy_j;
        assert!(
            total_j <= budget_j + BUDGET_TOLERANCE_J,
            "energy consumed ({total_j} J) exceeds the source's initial energy plus harvest ({budget_j} J)"
        );

        self.ledger.total_energy_j = total_j;
        self.ledger.last_update = now;
        if let Some(trace) = self.energy_trace.as_mut() {
            trace(&LedgerSample {
                time_s: now.as_secs(),
                state: previous,
                elapsed_s,
                energy_j,
                total_energy_j: total_j,
            });
        }
        if self.ledger.pending_changes == 1 {
            self.nested_idle = false;
        }
        self.notify_source(clock);

        if self.ledger.pending_changes <= 1 {
            if self.nested_idle {
                debug!("{state} overridden by a nested idle request");
            } else {
                self.set_state(now, state);
                if state != OperatingState::Idle {
                    self.arm_forced_idle(clock, state);
                }
                debug!("total energy consumption is {} J", self.ledger.total_energy_j);
            }
        }
        self.ledger.pending_changes -= 1;
    }

    /// Fires when the predictive-off timer expires.
    pub fn on_forced_idle(&mut self, clock: &mut dyn Scheduler) {
        self.forced_idle_event = None;
        debug!("energy projected exhausted, forcing idle at {}", clock.now());
        self.request_state_change(clock, OperatingState::Idle);
    }

    /// Invokes the depletion hook, if set.
    pub fn handle_energy_depleted(&mut self, clock: &mut dyn Scheduler) {
        debug!("energy is depleted");
        let requested = self.depletion_hook.as_mut().and_then(|hook| hook());
        if let Some(state) = requested {
            self.request_state_change(clock, state);
        }
    }

    /// Invokes the recharged hook, if set.
    pub fn handle_energy_recharged(&mut self, clock: &mut dyn Scheduler) {
        debug!("energy is recharged");
        let requested = self.recharged_hook.as_mut().and_then(|hook| hook());
        if let Some(state) = requested {
            self.request_state_change(clock, state);
        }
    }

    /// Re-arms the predictive-off timer against the new remaining energy.
    ///
    /// # Panics
    ///
    /// Panics if no source is attached.
    pub fn handle_energy_level_changed(&mut self, clock: &mut dyn Scheduler) {
        debug!("energy level changed");
        self.arm_forced_idle(clock, self.ledger.state);
    }

    /// Routes source notifications to the matching handler, in order.
    pub fn handle_source_signals(&mut self, clock: &mut dyn Scheduler, signals: Vec<SourceSignal>) {
        for signal in signals {
            match signal {
                SourceSignal::Depleted => self.handle_energy_depleted(clock),
                SourceSignal::Recharged => self.handle_energy_recharged(clock),
                SourceSignal::LevelChanged => self.handle_energy_level_changed(clock),
            }
        }
    }

    /// Asks the source to settle the draw up to now and handles whatever it
    /// reports back.
    ///
    /// # Panics
    ///
    /// Panics if no source is attached.
    pub fn notify_source(&mut self, clock: &mut dyn Scheduler) {
        let signals = self
            .source()
            .borrow_mut()
            .update_energy_source(clock.now(), self.current_a());
        self.handle_source_signals(clock, signals);
    }

    /// Cancels the predictive-off timer and drops the source and hooks.
    pub fn dispose(&mut self, clock: &mut dyn Scheduler) {
        if let Some(id) = self.forced_idle_event.take() {
            clock.cancel(id);
        }
        self.source = None;
        self.depletion_hook = None;
        self.recharged_hook = None;
    }

    fn source(&self) -> &SharedSource {
        match self.source.as_ref() {
            Some(source) => source,
            None => panic!("energy source not attached"),
        }
    }

    fn arm_forced_idle(&mut self, clock: &mut dyn Scheduler, state: OperatingState) {
        if let Some(id) = self.forced_idle_event.take() {
            clock.cancel(id);
        }
        let delay_s = self.maximum_time_in_state(state);
        if delay_s.is_finite() {
            debug!("forced idle armed in {delay_s} s for {state}");
            self.forced_idle_event = Some(clock.schedule(delay_s, SimEvent::ForcedIdle));
        } else {
            debug!("{state} draws no current, forced idle not armed");
        }
    }

    fn set_state(&mut self, now: SimTime, state: OperatingState) {
        let previous = self.ledger.state;
        self.ledger.state = state;
        debug!("switching to state {state} at {now}");
        if let Some(trace) = self.state_trace.as_mut() {
            trace(now, previous, state);
        }
    }
}
