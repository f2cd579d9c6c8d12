//! Energy model of a radio whose PHY cycles through idle, receive and
//! transmit states.

/// PHY notification handling and the transmit timeout.
pub mod listener;
/// Device-level aggregate of tracker and listener.
pub mod model;
/// Energy ledger, predictive-off timer and state machine.
pub mod tracker;
pub mod types;

pub use listener::{ActivityListener, PhyListener};
pub use model::RadioEnergyModel;
pub use tracker::{EnergyLedger, PowerStateTracker, SharedSource};
pub use types::{CurrentProfile, NodeId, OperatingState};
