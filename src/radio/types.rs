//! Operating states, current profile, and hook types shared by the radio
//! energy components.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sim::clock::SimTime;

/// Mutually exclusive activity modes of the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperatingState {
    /// Sleeping between activities; draws the deep-sleep current.
    Idle,
    /// Receiving control information.
    ReceiveControl,
    /// Receiving payload data.
    ReceiveData,
    /// Transmitting.
    Transmit,
}

impl OperatingState {
    /// All states, in declaration order.
    pub const ALL: [OperatingState; 4] = [
        OperatingState::Idle,
        OperatingState::ReceiveControl,
        OperatingState::ReceiveData,
        OperatingState::Transmit,
    ];

    /// Short name used in logs and trace files.
    pub fn name(self) -> &'static str {
        match self {
            OperatingState::Idle => "IDLE",
            OperatingState::ReceiveControl => "RX_CTRL",
            OperatingState::ReceiveData => "RX_DATA",
            OperatingState::Transmit => "TX",
        }
    }
}

impl fmt::Display for OperatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-state current draw of the radio, in amperes.
///
/// Five magnitudes are configurable but only three feed the per-state
/// lookup: Idle draws `deep_sleep_a`, both receive states draw
/// `rx_current_a` and Transmit draws `tx_current_a`. The light- and
/// micro-sleep currents are stored for configuration compatibility; no
/// operating state maps to them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CurrentProfile {
    /// Deep-sleep current, used as the Idle baseline.
    pub deep_sleep_a: f64,
    /// Light-sleep current.
    pub light_sleep_a: f64,
    /// Micro-sleep current.
    pub micro_sleep_a: f64,
    /// Receive current.
    pub rx_current_a: f64,
    /// Transmit current.
    pub tx_current_a: f64,
}

impl Default for CurrentProfile {
    fn default() -> Self {
        Self {
            deep_sleep_a: 0.001,
            light_sleep_a: 0.020,
            micro_sleep_a: 0.045,
            rx_current_a: 0.350,
            tx_current_a: 0.350,
        }
    }
}

impl CurrentProfile {
    /// Current drawn while in `state`.
    pub fn draw_a(&self, state: OperatingState) -> f64 {
        match state {
            OperatingState::Idle => self.deep_sleep_a,
            OperatingState::ReceiveControl | OperatingState::ReceiveData => self.rx_current_a,
            OperatingState::Transmit => self.tx_current_a,
        }
    }

    /// Field names and values of every current, for validation and display.
    pub fn named_currents(&self) -> [(&'static str, f64); 5] {
        [
            ("deep_sleep_a", self.deep_sleep_a),
            ("light_sleep_a", self.light_sleep_a),
            ("micro_sleep_a", self.micro_sleep_a),
            ("rx_current_a", self.rx_current_a),
            ("tx_current_a", self.tx_current_a),
        ]
    }
}

/// Opaque identity of the node that owns a radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(pub u32);

/// Reaction to a depletion or recharge notification.
///
/// A hook may return a state to request; the tracker applies that request
/// immediately, nested inside whatever transition raised the notification.
pub type EnergyHook = Box<dyn FnMut() -> Option<OperatingState>>;

/// One ledger accrual, reported through the energy trace hook.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LedgerSample {
    /// Simulated time of the accrual (s).
    pub time_s: f64,
    /// State the radio was in during the accrued interval.
    pub state: OperatingState,
    /// Length of the accrued interval (s).
    pub elapsed_s: f64,
    /// Energy added by this accrual (J).
    pub energy_j: f64,
    /// Cumulative energy after this accrual (J).
    pub total_energy_j: f64,
}

/// Observer of the cumulative-energy ledger.
pub type EnergyTrace = Box<dyn FnMut(&LedgerSample)>;

/// Observer of state transitions: `(time, from, to)`.
pub type StateTrace = Box<dyn FnMut(SimTime, OperatingState, OperatingState)>;
