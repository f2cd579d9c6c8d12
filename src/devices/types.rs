//! Common types and traits for energy sources.

use crate::sim::clock::SimTime;

/// Notification an energy source raises towards the devices it powers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSignal {
    /// Remaining energy dropped to the low-battery threshold.
    Depleted,
    /// A depleted source climbed back above the high-battery threshold.
    Recharged,
    /// Remaining energy changed for a reason other than the device's own draw.
    LevelChanged,
}

/// Trait defining a reservoir that powers a device.
///
/// The device energy model reads voltage and energy levels from it and
/// tells it when to refresh its own bookkeeping. Any notification the source
/// wants to raise in response is returned from
/// [`EnergySource::update_energy_source`] and dispatched by the caller.
pub trait EnergySource {
    /// Supply voltage in volts.
    fn supply_voltage(&self) -> f64;

    /// Energy still stored, in joules.
    fn remaining_energy(&self) -> f64;

    /// Energy stored at the start of the run, in joules.
    fn initial_energy(&self) -> f64;

    /// Energy added since the start of the run, in joules.
    ///
    /// Sources without a harvester never add energy.
    fn harvested_energy(&self) -> f64 {
        0.0
    }

    /// Deducts the energy drawn since the previous update.
    ///
    /// # Arguments
    ///
    /// * `now` - Current simulated time
    /// * `draw_a` - Current the device has been drawing since the previous update (A)
    ///
    /// # Returns
    ///
    /// Notifications raised by this update, in the order they occurred.
    fn update_energy_source(&mut self, now: SimTime, draw_a: f64) -> Vec<SourceSignal>;

    /// Returns a human-readable type name for the source.
    fn source_type(&self) -> &'static str;
}
