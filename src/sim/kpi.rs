//! Post-hoc energy report computed from a recorded run.

use std::fmt;

use serde::Serialize;

use crate::radio::types::{LedgerSample, OperatingState};

/// One state transition observed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateTransition {
    /// Simulated time of the transition (s).
    pub time_s: f64,
    /// State left.
    pub from: OperatingState,
    /// State entered.
    pub to: OperatingState,
}

/// End-of-run values that the recorded samples cannot show.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOutcome {
    /// Time at which the run stopped (s).
    pub end_s: f64,
    /// State the radio was in when the run stopped.
    pub final_state: OperatingState,
    /// Energy consumed up to `end_s`, including the unsettled tail (J).
    pub total_energy_j: f64,
    /// Energy the source accepted from harvesting (J).
    pub harvested_energy_j: f64,
    /// Remaining energy as a fraction of the initial energy.
    pub final_state_of_charge: f64,
    /// Time at which the source reported depletion, if it did (s).
    pub depleted_at_s: Option<f64>,
}

/// Residence time and energy of one operating state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateUsage {
    pub state: OperatingState,
    /// Total time spent in the state (s).
    pub time_s: f64,
    /// Energy consumed in the state (J).
    pub energy_j: f64,
}

/// Aggregate figures of one simulation run.
///
/// Computed post-hoc from the ledger samples so the report always agrees
/// with the exported trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyReport {
    /// Simulated time covered (s).
    pub duration_s: f64,
    /// Energy consumed by the radio (J).
    pub total_energy_j: f64,
    /// Mean power over the run (W).
    pub average_power_w: f64,
    /// Energy harvested into the source (J).
    pub harvested_energy_j: f64,
    /// Remaining energy as a fraction of the initial energy.
    pub final_state_of_charge: f64,
    pub final_state: OperatingState,
    /// Number of state transitions.
    pub transition_count: usize,
    /// Depletion time, if the source ran down (s).
    pub depleted_at_s: Option<f64>,
    /// Per-state breakdown, in [`OperatingState::ALL`] order.
    pub states: Vec<StateUsage>,
}

impl EnergyReport {
    /// Builds the report from the recorded run.
    ///
    /// # Arguments
    ///
    /// * `samples` - Every ledger accrual, in time order
    /// * `transitions` - Every state transition, in time order
    /// * `outcome` - End-of-run values
    pub fn from_run(
        samples: &[LedgerSample],
        transitions: &[StateTransition],
        outcome: &RunOutcome,
    ) -> Self {
        let mut states: Vec<StateUsage> = OperatingState::ALL
            .iter()
            .map(|&state| StateUsage {
                state,
                time_s: 0.0,
                energy_j: 0.0,
            })
            .collect();

        for sample in samples {
            if let Some(usage) = states.iter_mut().find(|u| u.state == sample.state) {
                usage.time_s += sample.elapsed_s;
                usage.energy_j += sample.energy_j;
            }
        }

        // the final state has been running since the last accrual
        let (settled_s, settled_j) = samples
            .last()
            .map_or((0.0, 0.0), |s| (s.time_s, s.total_energy_j));
        if let Some(usage) = states.iter_mut().find(|u| u.state == outcome.final_state) {
            usage.time_s += (outcome.end_s - settled_s).max(0.0);
            usage.energy_j += (outcome.total_energy_j - settled_j).max(0.0);
        }

        let average_power_w = if outcome.end_s > 0.0 {
            outcome.total_energy_j / outcome.end_s
        } else {
            0.0
        };

        Self {
            duration_s: outcome.end_s,
            total_energy_j: outcome.total_energy_j,
            average_power_w,
            harvested_energy_j: outcome.harvested_energy_j,
            final_state_of_charge: outcome.final_state_of_charge,
            final_state: outcome.final_state,
            transition_count: transitions.len(),
            depleted_at_s: outcome.depleted_at_s,
            states,
        }
    }

    /// Usage of one state.
    pub fn usage(&self, state: OperatingState) -> Option<&StateUsage> {
        self.states.iter().find(|u| u.state == state)
    }
}

impl fmt::Display for EnergyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Energy Report ---")?;
        writeln!(f, "Duration:              {:.3} s", self.duration_s)?;
        writeln!(f, "Total energy:          {:.6} J", self.total_energy_j)?;
        writeln!(f, "Average power:         {:.6} W", self.average_power_w)?;
        writeln!(f, "Harvested energy:      {:.6} J", self.harvested_energy_j)?;
        writeln!(
            f,
            "Final state of charge: {:.1}%",
            100.0 * self.final_state_of_charge
        )?;
        writeln!(f, "Final state:           {}", self.final_state)?;
        writeln!(f, "Transitions:           {}", self.transition_count)?;
        match self.depleted_at_s {
            Some(t) => writeln!(f, "Depleted at:           {t:.3} s")?,
            None => writeln!(f, "Depleted at:           -")?,
        }
        write!(f, "Per state:")?;
        for usage in &self.states {
            write!(
                f,
                "\n  {:<8} {:>12.3} s {:>14.6} J",
                usage.state.name(),
                usage.time_s,
                usage.energy_j
            )?;
        }
        Ok(())
    }
}
