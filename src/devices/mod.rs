//! Energy sources that power simulated radio devices.

/// Linear battery with depletion/recharge thresholds.
pub mod battery;
pub mod types;

// Re-export the main types for convenience
pub use battery::BasicEnergySource;
pub use types::EnergySource;
pub use types::SourceSignal;
