//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::sim::clock::Time;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation window and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Update cadence of the grid model.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    /// Baseload device parameters.
    #[serde(default)]
    pub baseload: BaseloadConfig,
    /// Solar PV device parameters.
    #[serde(default)]
    pub solar: SolarConfig,
    /// Battery storage parameters.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Feeder import/export limits.
    #[serde(default)]
    pub feeder: FeederConfig,
}

/// Simulation window and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// First simulated instant (seconds).
    pub start_time: Time,
    /// End of the window, exclusive (seconds).
    pub end_time: Time,
    /// Master random seed.
    pub seed: u64,
    /// Watchdog limit on updates at one instant; 0 disables it.
    pub max_updates_per_instant: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_time: Time::from_secs(0),
            end_time: Time::from_secs(86_400),
            seed: 42,
            max_updates_per_instant: 10_000,
        }
    }
}

impl SimulationConfig {
    /// The watchdog limit as the scheduler expects it.
    pub fn watchdog(&self) -> Option<u64> {
        (self.max_updates_per_instant > 0).then_some(self.max_updates_per_instant)
    }
}

/// Update cadence of the grid model.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeartbeatConfig {
    /// Seconds between beats (must be > 0).
    pub dt_secs: i64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { dt_secs: 3600 }
    }
}

/// Baseload device parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaseloadConfig {
    /// Baseline consumption (kW).
    pub base_kw: f32,
    /// Sinusoidal amplitude (kW).
    pub amp_kw: f32,
    /// Phase offset (radians).
    pub phase_rad: f32,
    /// Gaussian noise standard deviation (kW).
    pub noise_std: f32,
}

impl Default for BaseloadConfig {
    fn default() -> Self {
        Self {
            base_kw: 0.8,
            amp_kw: 0.7,
            phase_rad: 1.2,
            noise_std: 0.05,
        }
    }
}

/// Solar PV device parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarConfig {
    /// Peak generation (kW).
    pub kw_peak: f32,
    /// Sunrise hour of day (inclusive).
    pub sunrise_hr: f32,
    /// Sunset hour of day (exclusive).
    pub sunset_hr: f32,
    /// Relative noise standard deviation.
    pub noise_std: f32,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            kw_peak: 5.0,
            sunrise_hr: 6.0,
            sunset_hr: 18.0,
            noise_std: 0.05,
        }
    }
}

/// Battery storage parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Total energy capacity (kWh).
    pub capacity_kwh: f32,
    /// Initial state of charge (0.0–1.0).
    pub initial_soc: f32,
    /// Maximum charging power (kW).
    pub max_charge_kw: f32,
    /// Maximum discharging power (kW).
    pub max_discharge_kw: f32,
    /// Charge efficiency (0.0–1.0).
    pub eta_charge: f32,
    /// Discharge efficiency (0.0–1.0).
    pub eta_discharge: f32,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 10.0,
            initial_soc: 0.5,
            max_charge_kw: 5.0,
            max_discharge_kw: 5.0,
            eta_charge: 0.95,
            eta_discharge: 0.95,
        }
    }
}

/// Feeder import/export limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeederConfig {
    /// Maximum import power (kW).
    pub max_import_kw: f32,
    /// Maximum export power (kW, positive magnitude).
    pub max_export_kw: f32,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            max_import_kw: 5.0,
            max_export_kw: 4.0,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.end_time"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: one day at hourly cadence.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            baseload: BaseloadConfig::default(),
            solar: SolarConfig::default(),
            battery: BatteryConfig::default(),
            feeder: FeederConfig::default(),
        }
    }

    /// Returns the high-solar preset: large PV array at 15-minute cadence.
    pub fn high_solar() -> Self {
        Self {
            heartbeat: HeartbeatConfig { dt_secs: 900 },
            baseload: BaseloadConfig {
                base_kw: 0.6,
                amp_kw: 0.4,
                noise_std: 0.03,
                ..BaseloadConfig::default()
            },
            solar: SolarConfig {
                kw_peak: 12.0,
                sunrise_hr: 5.0,
                sunset_hr: 19.0,
                noise_std: 0.1,
            },
            battery: BatteryConfig {
                capacity_kwh: 15.0,
                initial_soc: 0.3,
                max_charge_kw: 7.0,
                max_discharge_kw: 7.0,
                ..BatteryConfig::default()
            },
            feeder: FeederConfig {
                max_export_kw: 10.0,
                ..FeederConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Returns the tight-feeder preset: heavy load, small battery, tight limits.
    pub fn tight_feeder() -> Self {
        Self {
            simulation: SimulationConfig {
                end_time: Time::from_secs(2 * 86_400),
                ..SimulationConfig::default()
            },
            heartbeat: HeartbeatConfig { dt_secs: 1800 },
            baseload: BaseloadConfig {
                base_kw: 1.2,
                amp_kw: 0.8,
                ..BaseloadConfig::default()
            },
            solar: SolarConfig {
                kw_peak: 4.0,
                ..SolarConfig::default()
            },
            battery: BatteryConfig {
                capacity_kwh: 4.0,
                max_charge_kw: 2.0,
                max_discharge_kw: 2.0,
                eta_charge: 0.90,
                eta_discharge: 0.90,
                ..BatteryConfig::default()
            },
            feeder: FeederConfig {
                max_import_kw: 1.0,
                max_export_kw: 1.0,
            },
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "high_solar", "tight_feeder"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "high_solar" => Ok(Self::high_solar()),
            "tight_feeder" => Ok(Self::tight_feeder()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let s = &self.simulation;
        if !s.start_time.is_finite() {
            errors.push(ConfigError::new("simulation.start_time", "must be finite"));
        }
        if s.start_time >= s.end_time {
            errors.push(ConfigError::new(
                "simulation.end_time",
                "must be > simulation.start_time",
            ));
        }

        if self.heartbeat.dt_secs <= 0 {
            errors.push(ConfigError::new("heartbeat.dt_secs", "must be > 0"));
        }

        let sol = &self.solar;
        if !(0.0..24.0).contains(&sol.sunrise_hr) {
            errors.push(ConfigError::new("solar.sunrise_hr", "must be in [0, 24)"));
        }
        if sol.sunset_hr > 24.0 {
            errors.push(ConfigError::new("solar.sunset_hr", "must be <= 24"));
        }
        if sol.sunrise_hr >= sol.sunset_hr {
            errors.push(ConfigError::new(
                "solar.sunrise_hr",
                "must be < solar.sunset_hr",
            ));
        }

        let bat = &self.battery;
        if bat.capacity_kwh <= 0.0 {
            errors.push(ConfigError::new("battery.capacity_kwh", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&bat.initial_soc) {
            errors.push(ConfigError::new(
                "battery.initial_soc",
                "must be in [0.0, 1.0]",
            ));
        }
        if bat.max_charge_kw < 0.0 {
            errors.push(ConfigError::new("battery.max_charge_kw", "must be >= 0"));
        }
        if bat.max_discharge_kw < 0.0 {
            errors.push(ConfigError::new("battery.max_discharge_kw", "must be >= 0"));
        }
        for (field, eta) in [
            ("battery.eta_charge", bat.eta_charge),
            ("battery.eta_discharge", bat.eta_discharge),
        ] {
            if !(eta > 0.0 && eta <= 1.0) {
                errors.push(ConfigError::new(field, "must be in (0.0, 1.0]"));
            }
        }

        let fdr = &self.feeder;
        if fdr.max_import_kw < 0.0 {
            errors.push(ConfigError::new("feeder.max_import_kw", "must be >= 0"));
        }
        if fdr.max_export_kw < 0.0 {
            errors.push(ConfigError::new("feeder.max_export_kw", "must be >= 0"));
        }

        errors
    }
}
