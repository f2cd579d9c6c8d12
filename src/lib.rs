//! Energy model of a radio that charges a shared battery for the time it
//! spends receiving, transmitting and sleeping.

/// TOML scenario configuration and presets.
pub mod config;
pub mod devices;
pub mod io;
/// Radio state tracking and PHY activity listening.
pub mod radio;
/// Virtual clock, event engine and run report.
pub mod sim;
pub mod traffic;
