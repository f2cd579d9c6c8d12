//! Discrete-event engine driving one radio and its energy source.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{info, warn};

use crate::config::ScenarioConfig;
use crate::devices::{BasicEnergySource, EnergySource};
use crate::radio::model::RadioEnergyModel;
use crate::radio::types::{LedgerSample, NodeId, OperatingState};
use crate::traffic::TrafficGenerator;

use super::clock::{Clock, Scheduler, SimTime};
use super::event::SimEvent;
use super::kpi::{EnergyReport, RunOutcome, StateTransition};

/// Everything recorded during a run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Every ledger accrual, in time order.
    pub samples: Vec<LedgerSample>,
    /// Every state transition, in time order.
    pub transitions: Vec<StateTransition>,
    pub report: EnergyReport,
}

/// Simulation engine owning the clock, the radio and its battery.
///
/// The engine schedules the scripted and random PHY activity, the harvest
/// events and a periodic refresh of the battery, then dispatches events in
/// time order until the horizon. When the battery reports depletion the
/// radio is sent to Idle and the run stops at that instant.
pub struct Engine {
    clock: Clock,
    model: RadioEnergyModel,
    source: Rc<RefCell<BasicEnergySource>>,
    horizon: SimTime,
    update_interval_s: f64,
    samples: Rc<RefCell<Vec<LedgerSample>>>,
    transitions: Rc<RefCell<Vec<StateTransition>>>,
    depleted: Rc<Cell<bool>>,
    depleted_at: Option<SimTime>,
}

impl Engine {
    /// Builds the battery and radio described by `config` and schedules all
    /// of the scenario's events.
    ///
    /// # Panics
    ///
    /// Panics on values that [`ScenarioConfig::validate`] rejects.
    pub fn from_config(config: &ScenarioConfig) -> Self {
        let mut clock = Clock::new();
        let src = &config.source;
        let source = Rc::new(RefCell::new(BasicEnergySource::with_thresholds(
            src.initial_energy_j,
            src.supply_voltage_v,
            src.low_battery_threshold,
            src.high_battery_threshold,
        )));

        let samples = Rc::new(RefCell::new(Vec::new()));
        let transitions = Rc::new(RefCell::new(Vec::new()));
        let depleted = Rc::new(Cell::new(false));

        let mut model = RadioEnergyModel::new(config.radio.clone());
        let tracker = model.tracker_mut();
        tracker.set_node(NodeId(config.simulation.node_id));

        let sink = Rc::clone(&samples);
        tracker.set_energy_trace(Some(Box::new(move |s: &LedgerSample| {
            sink.borrow_mut().push(*s);
        })));
        let sink = Rc::clone(&transitions);
        tracker.set_state_trace(Some(Box::new(move |t: SimTime, from: OperatingState, to: OperatingState| {
            sink.borrow_mut().push(StateTransition {
                time_s: t.as_secs(),
                from,
                to,
            });
        })));
        let flag = Rc::clone(&depleted);
        tracker.set_depletion_callback(Some(Box::new(move || {
            flag.set(true);
            Some(OperatingState::Idle)
        })));
        tracker.set_recharged_callback(None);
        tracker.attach_source(&mut clock, source.clone());

        for activity in &config.activity {
            clock.schedule(activity.at_s, SimEvent::Phy(activity.to_activity()));
        }
        if let Some(traffic) = &config.traffic {
            let trace = TrafficGenerator::new(traffic).generate(config.simulation.duration_s);
            info!("generated {} random PHY notifications", trace.len());
            for (at_s, activity) in trace {
                clock.schedule(at_s, SimEvent::Phy(activity));
            }
        }
        for harvest in &config.harvest {
            clock.schedule(
                harvest.at_s,
                SimEvent::Harvest {
                    energy_j: harvest.energy_j,
                },
            );
        }
        let update_interval_s = config.simulation.source_update_interval_s;
        clock.schedule(update_interval_s, SimEvent::SourceUpdate);

        Self {
            clock,
            model,
            source,
            horizon: SimTime::from_secs(config.simulation.duration_s),
            update_interval_s,
            samples,
            transitions,
            depleted,
            depleted_at: None,
        }
    }

    /// Dispatches one event.
    pub fn step(&mut self, event: SimEvent) {
        match event {
            SimEvent::SourceUpdate => {
                self.model.tracker_mut().notify_source(&mut self.clock);
                self.clock
                    .schedule(self.update_interval_s, SimEvent::SourceUpdate);
            }
            SimEvent::Harvest { energy_j } => {
                let draw_a = self.model.tracker().current_a();
                let signals = self
                    .source
                    .borrow_mut()
                    .harvest(self.clock.now(), draw_a, energy_j);
                self.model
                    .tracker_mut()
                    .handle_source_signals(&mut self.clock, signals);
            }
            other => {
                self.model.handle_event(&mut self.clock, other);
            }
        }
        self.check_depletion();
    }

    /// Runs to the horizon or to depletion, whichever comes first, and
    /// returns the recorded traces with their report.
    pub fn run(&mut self) -> RunResult {
        info!(
            "starting run: horizon {}, {} events queued",
            self.horizon,
            self.clock.pending_count()
        );

        while self.depleted_at.is_none() {
            let Some((_, event)) = self.clock.pop_until(self.horizon) else {
                self.clock.advance_to(self.horizon);
                break;
            };
            self.step(event);
        }

        let total_energy_j = self
            .model
            .tracker_mut()
            .total_energy_consumed(&mut self.clock);
        self.check_depletion();

        let outcome = {
            let source = self.source.borrow();
            RunOutcome {
                end_s: self.clock.now().as_secs(),
                final_state: self.model.tracker().current_state(),
                total_energy_j,
                harvested_energy_j: source.harvested_energy(),
                final_state_of_charge: source.state_of_charge(),
                depleted_at_s: self.depleted_at.map(SimTime::as_secs),
            }
        };
        let samples = std::mem::take(&mut *self.samples.borrow_mut());
        let transitions = std::mem::take(&mut *self.transitions.borrow_mut());
        let report = EnergyReport::from_run(&samples, &transitions, &outcome);

        info!(
            "run finished at {}: {:.6} J consumed, {} transitions",
            self.clock.now(),
            report.total_energy_j,
            report.transition_count
        );
        RunResult {
            samples,
            transitions,
            report,
        }
    }

    /// The virtual clock.
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// The radio energy model.
    pub fn model(&self) -> &RadioEnergyModel {
        &self.model
    }

    /// The battery powering the radio.
    pub fn source(&self) -> &Rc<RefCell<BasicEnergySource>> {
        &self.source
    }

    fn check_depletion(&mut self) {
        if self.depleted.get() && self.depleted_at.is_none() {
            let now = self.clock.now();
            warn!(
                "energy source depleted at {now}, {:.1}% left",
                100.0 * self.source.borrow().state_of_charge()
            );
            self.depleted_at = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActivityConfig, ActivityKind, HarvestConfig};

    #[test]
    fn test_transmit_burst_settles_two_seconds_of_transmit() {
        let mut engine = Engine::from_config(&ScenarioConfig::transmit_burst());
        let result = engine.run();

        let tx = result.report.usage(OperatingState::Transmit).unwrap();
        assert!((tx.time_s - 2.0).abs() < 1e-12);
        assert!((tx.energy_j - 2.1).abs() < 1e-9);
        assert_eq!(result.report.final_state, OperatingState::Idle);
        assert_eq!(result.report.duration_s, 5.0);
        assert_eq!(result.report.depleted_at_s, None);
    }

    #[test]
    fn test_source_tracks_the_ledger() {
        let mut engine = Engine::from_config(&ScenarioConfig::transmit_burst());
        let result = engine.run();
        let remaining = engine.source().borrow().remaining_energy();
        assert!((10.0 - remaining - result.report.total_energy_j).abs() < 1e-9);
    }

    #[test]
    fn test_periodic_updates_keep_firing() {
        let mut cfg = ScenarioConfig::default();
        cfg.simulation.duration_s = 10.0;
        let mut engine = Engine::from_config(&cfg);
        let result = engine.run();
        assert!(result.transitions.is_empty());
        // the next refresh is queued past the horizon
        assert!(engine.clock().pending_count() >= 1);
        assert_eq!(engine.clock().now(), SimTime::from_secs(10.0));
    }

    #[test]
    fn test_depletion_stops_the_run_in_idle() {
        let mut cfg = ScenarioConfig::default();
        cfg.simulation.duration_s = 100.0;
        cfg.simulation.source_update_interval_s = 0.1;
        cfg.source.initial_energy_j = 2.0;
        cfg.activity = vec![ActivityConfig::new(0.0, ActivityKind::TxStart, 50.0)];
        let mut engine = Engine::from_config(&cfg);
        let result = engine.run();

        // 1.8 J of 2 J at 1.05 W after 1.714 s, seen by the next refresh
        let depleted_at = result.report.depleted_at_s.unwrap();
        assert!(depleted_at > 1.71 && depleted_at < 1.81, "{depleted_at}");
        assert_eq!(result.report.final_state, OperatingState::Idle);
        assert_eq!(result.report.duration_s, depleted_at);
        assert!(engine.source().borrow().is_depleted());
        // stopped before the forced idle at 2 J / 1.05 W
        assert!(result.report.total_energy_j < 2.0);
    }

    #[test]
    fn test_rare_refreshes_do_not_overrun_the_battery() {
        let mut cfg = ScenarioConfig::default();
        cfg.simulation.duration_s = 10.0;
        cfg.simulation.source_update_interval_s = 100.0;
        cfg.source.initial_energy_j = 2.0;
        cfg.activity = vec![
            ActivityConfig::new(0.0, ActivityKind::RxStart, 1.0),
            ActivityConfig::new(1.0, ActivityKind::TxStart, 5.0),
        ];
        assert!(cfg.validate().is_empty());
        let mut engine = Engine::from_config(&cfg);
        let result = engine.run();

        // 1.05 J received, then the remaining 0.95 J at 1.05 W
        let depleted_at = result.report.depleted_at_s.unwrap();
        assert!((depleted_at - (1.0 + 0.95 / 1.05)).abs() < 1e-9, "{depleted_at}");
        assert_eq!(result.report.final_state, OperatingState::Idle);
        assert!(result.report.total_energy_j <= 2.0 + 1e-9);
    }

    #[test]
    fn test_depletion_during_a_transition_leaves_the_radio_idle() {
        let mut cfg = ScenarioConfig::default();
        cfg.simulation.duration_s = 10.0;
        cfg.simulation.source_update_interval_s = 100.0;
        cfg.source.initial_energy_j = 2.0;
        cfg.activity = vec![
            ActivityConfig::new(0.0, ActivityKind::TxStart, 5.0),
            ActivityConfig::new(1.75, ActivityKind::RxStart, 1.0),
        ];
        let mut engine = Engine::from_config(&cfg);
        let result = engine.run();

        // 1.8375 J drawn by 1.75 s crosses the 0.2 J threshold
        assert_eq!(result.report.depleted_at_s, Some(1.75));
        assert_eq!(result.report.final_state, OperatingState::Idle);
        assert_eq!(engine.model().tracker().current_state(), OperatingState::Idle);
        let last = result.transitions.last().unwrap();
        assert_eq!((last.from, last.to), (OperatingState::Transmit, OperatingState::Idle));
        assert!(
            result
                .transitions
                .iter()
                .all(|t| t.to != OperatingState::ReceiveData)
        );
    }

    #[test]
    fn test_harvest_is_credited() {
        let mut cfg = ScenarioConfig::transmit_burst();
        cfg.harvest = vec![HarvestConfig {
            at_s: 3.0,
            energy_j: 1.0,
        }];
        let mut engine = Engine::from_config(&cfg);
        let result = engine.run();
        assert!((result.report.harvested_energy_j - 1.0).abs() < 1e-9);
        let remaining = engine.source().borrow().remaining_energy();
        assert!((11.0 - remaining - result.report.total_energy_j).abs() < 1e-9);
    }

    #[test]
    fn test_node_id_is_applied() {
        let mut cfg = ScenarioConfig::default();
        cfg.simulation.node_id = 9;
        let engine = Engine::from_config(&cfg);
        assert_eq!(engine.model().tracker().node(), Some(NodeId(9)));
    }
}
