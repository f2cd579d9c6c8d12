use crate::devices::types::{EnergySource, SourceSignal};
use crate::sim::clock::SimTime;

/// Default low-battery threshold as a fraction of the initial energy.
pub const DEFAULT_LOW_BATTERY_THRESHOLD: f64 = 0.10;
/// Default high-battery threshold as a fraction of the initial energy.
pub const DEFAULT_HIGH_BATTERY_THRESHOLD: f64 = 0.15;

/// A battery with a fixed supply voltage that discharges linearly.
///
/// `BasicEnergySource` keeps its own remaining-energy bookkeeping, refreshed
/// whenever the powered device asks for an update. It reports depletion once
/// the remaining energy falls to the low-battery threshold and a recharge
/// once a depleted battery climbs above the high-battery threshold, which
/// gives the two thresholds a hysteresis band.
#[derive(Debug, Clone)]
pub struct BasicEnergySource {
    /// Energy stored at the start of the run (J).
    pub initial_energy_j: f64,

    /// Supply voltage (V).
    pub supply_voltage_v: f64,

    /// Fraction of the initial energy at which the battery counts as depleted.
    pub low_battery_threshold: f64,

    /// Fraction of the initial energy above which a depleted battery counts as recharged.
    pub high_battery_threshold: f64,

    remaining_energy_j: f64,
    harvested_energy_j: f64,
    depleted: bool,
    last_update: SimTime,
}

impl BasicEnergySource {
    /// Creates a full battery with the default thresholds.
    ///
    /// # Arguments
    ///
    /// * `initial_energy_j` - Stored energy in J (must be > 0)
    /// * `supply_voltage_v` - Supply voltage in V (must be > 0)
    ///
    /// # Panics
    ///
    /// Panics if energy or voltage is zero/negative.
    pub fn new(initial_energy_j: f64, supply_voltage_v: f64) -> Self {
        Self::with_thresholds(
            initial_energy_j,
            supply_voltage_v,
            DEFAULT_LOW_BATTERY_THRESHOLD,
            DEFAULT_HIGH_BATTERY_THRESHOLD,
        )
    }

    /// Creates a full battery with explicit depletion/recharge thresholds.
    ///
    /// # Panics
    ///
    /// Panics if energy or voltage is zero/negative, a threshold lies outside
    /// `[0.0, 1.0]`, or `low > high`.
    pub fn with_thresholds(
        initial_energy_j: f64,
        supply_voltage_v: f64,
        low_battery_threshold: f64,
        high_battery_threshold: f64,
    ) -> Self {
        assert!(initial_energy_j > 0.0);
        assert!(supply_voltage_v > 0.0);
        assert!((0.0..=1.0).contains(&low_battery_threshold));
        assert!((0.0..=1.0).contains(&high_battery_threshold));
        assert!(low_battery_threshold <= high_battery_threshold);

        Self {
            initial_energy_j,
            supply_voltage_v,
            low_battery_threshold,
            high_battery_threshold,
            remaining_energy_j: initial_energy_j,
            harvested_energy_j: 0.0,
            depleted: false,
            last_update: SimTime::ZERO,
        }
    }

    /// Remaining energy as a fraction of the initial energy.
    pub fn state_of_charge(&self) -> f64 {
        self.remaining_energy_j / self.initial_energy_j
    }

    /// Whether the battery sits below its depletion threshold and has not
    /// been recharged since.
    pub fn is_depleted(&self) -> bool {
        self.depleted
    }

    /// Adds harvested energy after settling the draw up to `now`.
    ///
    /// The stored energy is capped at the initial energy; only the part
    /// that fits counts as harvested.
    ///
    /// # Panics
    ///
    /// Panics if `energy_j` is negative.
    pub fn harvest(&mut self, now: SimTime, draw_a: f64, energy_j: f64) -> Vec<SourceSignal> {
        assert!(energy_j >= 0.0, "harvested energy must be non-negative");

        let mut signals = self.update_energy_source(now, draw_a);
        let stored_j = (self.remaining_energy_j + energy_j).min(self.initial_energy_j);
        self.harvested_energy_j += stored_j - self.remaining_energy_j;
        self.remaining_energy_j = stored_j;
        signals.push(SourceSignal::LevelChanged);

        if self.depleted
            && self.remaining_energy_j > self.high_battery_threshold * self.initial_energy_j
        {
            self.depleted = false;
            signals.push(SourceSignal::Recharged);
        }
        signals
    }
}

impl EnergySource for BasicEnergySource {
    fn supply_voltage(&self) -> f64 {
        self.supply_voltage_v
    }

    fn remaining_energy(&self) -> f64 {
        self.remaining_energy_j
    }

    fn initial_energy(&self) -> f64 {
        self.initial_energy_j
    }

    fn harvested_energy(&self) -> f64 {
        self.harvested_energy_j
    }

    /// # Panics
    ///
    /// Panics if `now` lies before the previous update.
    fn update_energy_source(&mut self, now: SimTime, draw_a: f64) -> Vec<SourceSignal> {
        let elapsed_s = now.secs_since(self.last_update);
        assert!(
            elapsed_s >= 0.0,
            "energy source updated at {now}, before its last update at {}",
            self.last_update
        );

        let energy_j = draw_a * self.supply_voltage_v * elapsed_s;
        self.remaining_energy_j = (self.remaining_energy_j - energy_j).max(0.0);
        self.last_update = now;

        let mut signals = Vec::new();
        if !self.depleted
            && self.remaining_energy_j <= self.low_battery_threshold * self.initial_energy_j
        {
            self.depleted = true;
            signals.push(SourceSignal::Depleted);
        } else if self.depleted
            && self.remaining_energy_j > self.high_battery_threshold * self.initial_energy_j
        {
            self.depleted = false;
            signals.push(SourceSignal::Recharged);
        }
        signals
    }

    fn source_type(&self) -> &'static str {
        "BasicEnergySource"
    }
}
