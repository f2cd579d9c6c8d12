//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::devices::battery::{DEFAULT_HIGH_BATTERY_THRESHOLD, DEFAULT_LOW_BATTERY_THRESHOLD};
use crate::radio::types::CurrentProfile;
use crate::sim::event::PhyActivity;

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or start from one of the presets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run length and driver parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Per-state radio currents.
    #[serde(default)]
    pub radio: CurrentProfile,
    /// Battery parameters.
    #[serde(default)]
    pub source: SourceConfig,
    /// Random traffic; absent means scripted activity only.
    #[serde(default)]
    pub traffic: Option<TrafficConfig>,
    /// Scripted PHY notifications.
    #[serde(default)]
    pub activity: Vec<ActivityConfig>,
    /// Scripted harvest events.
    #[serde(default)]
    pub harvest: Vec<HarvestConfig>,
}

/// Run length and driver parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Simulated duration in seconds (must be > 0).
    pub duration_s: f64,
    /// Identity of the node carrying the radio.
    pub node_id: u32,
    /// Period of the energy source's own refresh (s, must be > 0).
    pub source_update_interval_s: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_s: 60.0,
            node_id: 0,
            source_update_interval_s: 1.0,
        }
    }
}

/// Battery parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Stored energy at the start (J).
    pub initial_energy_j: f64,
    /// Supply voltage (V).
    pub supply_voltage_v: f64,
    /// Depletion threshold as a fraction of the initial energy.
    pub low_battery_threshold: f64,
    /// Recharge threshold as a fraction of the initial energy.
    pub high_battery_threshold: f64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            initial_energy_j: 10.0,
            supply_voltage_v: 3.0,
            low_battery_threshold: DEFAULT_LOW_BATTERY_THRESHOLD,
            high_battery_threshold: DEFAULT_HIGH_BATTERY_THRESHOLD,
        }
    }
}

/// Random traffic parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrafficConfig {
    /// Random seed.
    pub seed: u64,
    /// Mean gap between the end of one packet and the start of the next (s).
    pub mean_interval_s: f64,
    /// Probability that a packet is a transmission (0.0–1.0).
    pub tx_probability: f64,
    /// Transmit airtime (s).
    pub tx_duration_s: f64,
    /// Nominal receive airtime (s).
    pub rx_duration_s: f64,
    /// Probability that a reception ends in error (0.0–1.0).
    pub rx_error_probability: f64,
    /// Shortest fraction of the nominal airtime a reception lasts (0.0–1.0).
    pub rx_min_fraction: f64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            mean_interval_s: 5.0,
            tx_probability: 0.5,
            tx_duration_s: 0.2,
            rx_duration_s: 0.2,
            rx_error_probability: 0.1,
            rx_min_fraction: 1.0,
        }
    }
}

/// Kind of a scripted PHY notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    RxStart,
    RxEndOk,
    RxEndError,
    TxStart,
}

/// One scripted PHY notification.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivityConfig {
    /// Time of the notification (s).
    pub at_s: f64,
    /// Notification kind.
    pub kind: ActivityKind,
    /// Airtime for `rx_start` / `tx_start` (s); ignored otherwise.
    #[serde(default)]
    pub duration_s: f64,
}

impl ActivityConfig {
    /// Creates a scripted notification.
    pub fn new(at_s: f64, kind: ActivityKind, duration_s: f64) -> Self {
        Self {
            at_s,
            kind,
            duration_s,
        }
    }

    /// The PHY notification this entry stands for.
    pub fn to_activity(&self) -> PhyActivity {
        match self.kind {
            ActivityKind::RxStart => PhyActivity::RxStart {
                duration_s: self.duration_s,
            },
            ActivityKind::RxEndOk => PhyActivity::RxEndOk,
            ActivityKind::RxEndError => PhyActivity::RxEndError,
            ActivityKind::TxStart => PhyActivity::TxStart {
                duration_s: self.duration_s,
            },
        }
    }
}

/// One scripted harvest event.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarvestConfig {
    /// Time of the harvest (s).
    pub at_s: f64,
    /// Energy delivered (J).
    pub energy_j: f64,
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"source.initial_energy_j"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl ScenarioConfig {
    /// A single 2 s transmission from a 10 J, 3 V battery.
    pub fn transmit_burst() -> Self {
        Self {
            simulation: SimulationConfig {
                duration_s: 5.0,
                ..SimulationConfig::default()
            },
            activity: vec![ActivityConfig::new(0.0, ActivityKind::TxStart, 2.0)],
            ..Self::default()
        }
    }

    /// A 1 s reception that the PHY ends after 0.5 s.
    pub fn early_receive_end() -> Self {
        Self {
            simulation: SimulationConfig {
                duration_s: 5.0,
                ..SimulationConfig::default()
            },
            activity: vec![
                ActivityConfig::new(0.0, ActivityKind::RxStart, 1.0),
                ActivityConfig::new(0.5, ActivityKind::RxEndOk, 0.0),
            ],
            ..Self::default()
        }
    }

    /// An hour of random traffic on a larger battery.
    pub fn random_traffic() -> Self {
        Self {
            simulation: SimulationConfig {
                duration_s: 3600.0,
                ..SimulationConfig::default()
            },
            source: SourceConfig {
                initial_energy_j: 500.0,
                ..SourceConfig::default()
            },
            traffic: Some(TrafficConfig {
                rx_min_fraction: 0.5,
                ..TrafficConfig::default()
            }),
            ..Self::default()
        }
    }

    /// Busy traffic that drains a small battery, with a harvester topping it up.
    pub fn harvesting() -> Self {
        Self {
            simulation: SimulationConfig {
                duration_s: 600.0,
                ..SimulationConfig::default()
            },
            source: SourceConfig {
                initial_energy_j: 50.0,
                ..SourceConfig::default()
            },
            traffic: Some(TrafficConfig {
                mean_interval_s: 0.5,
                tx_duration_s: 0.5,
                rx_duration_s: 0.5,
                ..TrafficConfig::default()
            }),
            harvest: (1..=5)
                .map(|i| HarvestConfig {
                    at_s: 60.0 * f64::from(i),
                    energy_j: 8.0,
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &[
        "transmit_burst",
        "early_receive_end",
        "random_traffic",
        "harvesting",
    ];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "transmit_burst" => Ok(Self::transmit_burst()),
            "early_receive_end" => Ok(Self::early_receive_end()),
            "random_traffic" => Ok(Self::random_traffic()),
            "harvesting" => Ok(Self::harvesting()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: String, message: &str| {
            if !ok {
                errors.push(ConfigError {
                    field,
                    message: message.to_string(),
                });
            }
        };

        let s = &self.simulation;
        check(
            s.duration_s.is_finite() && s.duration_s > 0.0,
            "simulation.duration_s".into(),
            "must be > 0",
        );
        check(
            s.source_update_interval_s.is_finite() && s.source_update_interval_s > 0.0,
            "simulation.source_update_interval_s".into(),
            "must be > 0",
        );

        for (name, value) in self.radio.named_currents() {
            check(
                value.is_finite() && value >= 0.0,
                format!("radio.{name}"),
                "must be finite and >= 0",
            );
        }

        let src = &self.source;
        check(
            src.initial_energy_j.is_finite() && src.initial_energy_j > 0.0,
            "source.initial_energy_j".into(),
            "must be > 0",
        );
        check(
            src.supply_voltage_v.is_finite() && src.supply_voltage_v > 0.0,
            "source.supply_voltage_v".into(),
            "must be > 0",
        );
        check(
            src.low_battery_threshold > 0.0 && src.low_battery_threshold <= 1.0,
            "source.low_battery_threshold".into(),
            "must be in (0.0, 1.0]",
        );
        check(
            (0.0..=1.0).contains(&src.high_battery_threshold),
            "source.high_battery_threshold".into(),
            "must be in [0.0, 1.0]",
        );
        check(
            src.low_battery_threshold <= src.high_battery_threshold,
            "source.low_battery_threshold".into(),
            "must be <= source.high_battery_threshold",
        );

        if let Some(t) = &self.traffic {
            check(
                t.mean_interval_s.is_finite() && t.mean_interval_s > 0.0,
                "traffic.mean_interval_s".into(),
                "must be > 0",
            );
            check(
                (0.0..=1.0).contains(&t.tx_probability),
                "traffic.tx_probability".into(),
                "must be in [0.0, 1.0]",
            );
            check(
                t.tx_duration_s.is_finite() && t.tx_duration_s > 0.0,
                "traffic.tx_duration_s".into(),
                "must be > 0",
            );
            check(
                t.rx_duration_s.is_finite() && t.rx_duration_s > 0.0,
                "traffic.rx_duration_s".into(),
                "must be > 0",
            );
            check(
                (0.0..=1.0).contains(&t.rx_error_probability),
                "traffic.rx_error_probability".into(),
                "must be in [0.0, 1.0]",
            );
            check(
                t.rx_min_fraction > 0.0 && t.rx_min_fraction <= 1.0,
                "traffic.rx_min_fraction".into(),
                "must be in (0.0, 1.0]",
            );
        }

        for (i, a) in self.activity.iter().enumerate() {
            check(
                a.at_s >= 0.0 && a.at_s <= s.duration_s,
                format!("activity[{i}].at_s"),
                "must be within [0, simulation.duration_s]",
            );
            check(
                a.duration_s.is_finite() && a.duration_s >= 0.0,
                format!("activity[{i}].duration_s"),
                "must be >= 0",
            );
        }

        for (i, h) in self.harvest.iter().enumerate() {
            check(
                h.at_s >= 0.0 && h.at_s <= s.duration_s,
                format!("harvest[{i}].at_s"),
                "must be within [0, simulation.duration_s]",
            );
            check(
                h.energy_j.is_finite() && h.energy_j >= 0.0,
                format!("harvest[{i}].energy_j"),
                "must be finite and >= 0",
            );
        }

        errors
    }
}
