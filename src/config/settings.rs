//! Application settings loading from config.toml
//!
//! The file holds reservation policy and an optional fleet of owners and cars
//! used to seed an empty database. Every section is optional; a missing file
//! yields [`Settings::default`].

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "CAR_RENTAL_CONFIG";

/// Which existing reservations block a new booking for the same car.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Every reservation blocks its dates, whatever its status
    #[default]
    AllStatuses,
    /// Rejected and cancelled reservations release their dates
    ActiveOnly,
}

/// Reservation behaviour knobs
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReservationSettings {
    /// Overlap policy used by the conflict checker
    pub conflict_policy: ConflictPolicy,
}

/// A car listed under an owner in the fleet section
#[derive(Debug, Clone, Deserialize)]
pub struct CarConfig {
    pub brand: String,
    pub model: String,
    pub year: i32,
    #[serde(default)]
    pub description: String,
    pub price_per_day: f64,
    pub location: String,
}

/// An owner account and the cars it lists
#[derive(Debug, Clone, Deserialize)]
pub struct OwnerConfig {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub cars: Vec<CarConfig>,
}

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub reservations: ReservationSettings,
    /// Owners and cars to seed on startup
    pub owners: Vec<OwnerConfig>,
}

/// Parses settings from TOML text.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    debug!("Loading configuration from {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;
    parse_settings(&contents)
}

/// Loads settings from `CAR_RENTAL_CONFIG` or `./config.toml`.
///
/// A missing file is not an error: the defaults are returned instead.
pub fn load_default_settings() -> Result<Settings> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        info!("No config file at {path}, using defaults");
        return Ok(Settings::default());
    }
    load_settings(path)
}
