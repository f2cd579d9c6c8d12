//! Device-level radio energy model.

use log::debug;

use crate::sim::clock::Scheduler;
use crate::sim::event::{PhyActivity, SimEvent};

use super::listener::{ActivityListener, PhyListener};
use super::tracker::PowerStateTracker;
use super::types::CurrentProfile;

/// Energy model of one radio: a [`PowerStateTracker`] and the
/// [`ActivityListener`] that feeds it PHY activity.
///
/// The listener is created together with the tracker, bound to
/// [`PowerStateTracker::request_state_change`], and dropped with it.
pub struct RadioEnergyModel {
    tracker: PowerStateTracker,
    listener: ActivityListener<PowerStateTracker>,
}

impl RadioEnergyModel {
    /// Creates an idle radio drawing currents from `profile`.
    pub fn new(profile: CurrentProfile) -> Self {
        let mut listener = ActivityListener::new();
        listener.set_change_state_callback(PowerStateTracker::request_state_change);
        Self {
            tracker: PowerStateTracker::new(profile),
            listener,
        }
    }

    /// The radio's state tracker.
    pub fn tracker(&self) -> &PowerStateTracker {
        &self.tracker
    }

    /// Mutable access to the state tracker, for configuration and queries.
    pub fn tracker_mut(&mut self) -> &mut PowerStateTracker {
        &mut self.tracker
    }

    /// The radio's activity listener.
    pub fn listener(&self) -> &ActivityListener<PowerStateTracker> {
        &self.listener
    }

    /// Delivers one PHY notification.
    pub fn apply_activity(&mut self, clock: &mut dyn Scheduler, activity: PhyActivity) {
        debug!("phy {} at {}", activity.label(), clock.now());
        match activity {
            PhyActivity::RxStart { duration_s } => self.notify_rx_start(clock, duration_s),
            PhyActivity::RxEndOk => self.notify_rx_end_ok(clock),
            PhyActivity::RxEndError => self.notify_rx_end_error(clock),
            PhyActivity::TxStart { duration_s } => self.notify_tx_start(clock, duration_s),
        }
    }

    /// Routes an event owned by the radio to the component that scheduled it.
    ///
    /// Returns `false` for events the radio does not handle (source updates
    /// and harvests belong to whoever drives the energy source).
    pub fn handle_event(&mut self, clock: &mut dyn Scheduler, event: SimEvent) -> bool {
        match event {
            SimEvent::ForcedIdle => self.tracker.on_forced_idle(clock),
            SimEvent::ReturnToIdle => self.listener.return_to_idle(&mut self.tracker, clock),
            SimEvent::Phy(activity) => self.apply_activity(clock, activity),
            SimEvent::SourceUpdate | SimEvent::Harvest { .. } => return false,
        }
        true
    }
}

impl PhyListener for RadioEnergyModel {
    fn notify_rx_start(&mut self, clock: &mut dyn Scheduler, duration_s: f64) {
        self.listener
            .on_receive_start(&mut self.tracker, clock, duration_s);
    }

    fn notify_rx_end_ok(&mut self, clock: &mut dyn Scheduler) {
        self.listener.on_receive_end_ok(&mut self.tracker, clock);
    }

    fn notify_rx_end_error(&mut self, clock: &mut dyn Scheduler) {
        self.listener.on_receive_end_error(&mut self.tracker, clock);
    }

    fn notify_tx_start(&mut self, clock: &mut dyn Scheduler, duration_s: f64) {
        self.listener
            .on_transmit_start(&mut self.tracker, clock, duration_s);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::devices::BasicEnergySource;
    use crate::radio::types::OperatingState;
    use crate::sim::clock::{Clock, SimTime};

    fn model_with_source(clock: &mut Clock) -> RadioEnergyModel {
        let mut model = RadioEnergyModel::new(CurrentProfile::default());
        let source = Rc::new(RefCell::new(BasicEnergySource::new(10.0, 3.0)));
        model.tracker_mut().attach_source(clock, source);
        model
    }

    fn run_until(model: &mut RadioEnergyModel, clock: &mut Clock, secs: f64) {
        while let Some((_, event)) = clock.pop_until(SimTime::from_secs(secs)) {
            assert!(model.handle_event(clock, event));
        }
        clock.advance_to(SimTime::from_secs(secs));
    }

    #[test]
    fn test_transmit_returns_to_idle_by_itself() {
        let mut clock = Clock::new();
        let mut model = model_with_source(&mut clock);

        model.notify_tx_start(&mut clock, 2.0);
        assert_eq!(model.tracker().current_state(), OperatingState::Transmit);

        run_until(&mut model, &mut clock, 3.0);
        assert_eq!(model.tracker().current_state(), OperatingState::Idle);
        assert_eq!(model.tracker().ledger().last_update(), SimTime::from_secs(2.0));
        assert!((model.tracker().ledger().total_energy_j() - 2.1).abs() < 1e-9);
    }

    #[test]
    fn test_phy_events_are_routed_through_the_listener() {
        let mut clock = Clock::new();
        let mut model = model_with_source(&mut clock);

        clock.schedule(1.0, SimEvent::Phy(PhyActivity::RxStart { duration_s: 1.0 }));
        clock.schedule(1.5, SimEvent::Phy(PhyActivity::RxEndError));
        run_until(&mut model, &mut clock, 5.0);

        assert_eq!(model.tracker().current_state(), OperatingState::Idle);
        // 1 s idle + 0.5 s receive
        let expected = 1.0 * 0.001 * 3.0 + 0.5 * 0.35 * 3.0;
        assert!((model.tracker().ledger().total_energy_j() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_source_events_are_not_handled() {
        let mut clock = Clock::new();
        let mut model = model_with_source(&mut clock);
        assert!(!model.handle_event(&mut clock, SimEvent::SourceUpdate));
        assert!(!model.handle_event(&mut clock, SimEvent::Harvest { energy_j: 1.0 }));
    }

    #[test]
    fn test_listener_starts_with_no_timer() {
        let model = RadioEnergyModel::new(CurrentProfile::default());
        assert_eq!(model.listener().return_to_idle_event(), None);
    }
}
