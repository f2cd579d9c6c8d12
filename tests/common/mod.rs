//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use radio_energy_sim::devices::BasicEnergySource;
use radio_energy_sim::radio::{CurrentProfile, RadioEnergyModel};
use radio_energy_sim::sim::clock::{Clock, SimTime};

/// Tolerance for energy comparisons (J).
pub const EPS_J: f64 = 1e-9;

/// Battery with the default thresholds.
pub fn battery(initial_energy_j: f64, supply_voltage_v: f64) -> Rc<RefCell<BasicEnergySource>> {
    Rc::new(RefCell::new(BasicEnergySource::new(
        initial_energy_j,
        supply_voltage_v,
    )))
}

/// Battery that never reports depletion or recharge.
pub fn silent_battery(
    initial_energy_j: f64,
    supply_voltage_v: f64,
) -> Rc<RefCell<BasicEnergySource>> {
    Rc::new(RefCell::new(BasicEnergySource::with_thresholds(
        initial_energy_j,
        supply_voltage_v,
        0.0,
        0.0,
    )))
}

/// Radio with the default current profile attached to `source`.
pub fn attached_model(clock: &mut Clock, source: Rc<RefCell<BasicEnergySource>>) -> RadioEnergyModel {
    let mut model = RadioEnergyModel::new(CurrentProfile::default());
    model.tracker_mut().attach_source(clock, source);
    model
}

/// Delivers every event due up to `secs`, then moves the clock there.
pub fn run_until(model: &mut RadioEnergyModel, clock: &mut Clock, secs: f64) {
    let horizon = SimTime::from_secs(secs);
    while let Some((_, event)) = clock.pop_until(horizon) {
        assert!(model.handle_event(clock, event), "unexpected event {event:?}");
    }
    clock.advance_to(horizon);
}

/// Asserts two energies agree within [`EPS_J`].
pub fn assert_energy(actual_j: f64, expected_j: f64) {
    assert!(
        (actual_j - expected_j).abs() < EPS_J,
        "expected {expected_j} J, got {actual_j} J"
    );
}
