// src/config.rs
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::types::Strategy;

/// Validated configuration, built once at startup and passed by reference
/// into each component. Invalid configuration is the only process-fatal
/// error in the program.
#[derive(Debug, Clone)]
pub struct Config {
    /// Price area code, e.g. "SE3".
    pub area: String,
    /// Provider base URL, ending in '/'.
    pub price_api_url: String,
    pub request_timeout: Duration,
    pub update_interval: Duration,
    /// Host[:port] of the Tellstick unit.
    pub tellstick_host: String,
    /// Value of the Authorization header sent to the unit.
    pub tellstick_auth: String,
    pub strategy: Strategy,
    /// Repeat the device command every cycle even when unchanged.
    pub override_repeat: bool,
    /// Optional local commands launched before switching devices.
    pub on_command: String,
    pub off_command: String,
    pub cache_dir: PathBuf,
    pub devices_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let strategy = match required("CONTROL_MODE")?.to_lowercase().as_str() {
            "fixed" => Strategy::Fixed(parse_required("FIXED_PRICE")?),
            "ratio" => {
                let hours: u8 = parse_required("RATIO_HOURS")?;
                if !(1..=23).contains(&hours) {
                    return Err(ConfigError::Invalid {
                        key: "RATIO_HOURS",
                        value: hours.to_string(),
                    });
                }
                Strategy::Ratio(hours)
            }
            other => {
                return Err(ConfigError::Invalid {
                    key: "CONTROL_MODE",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            area: required("PRICE_AREA")?,
            price_api_url: required("PRICE_API_URL")?,
            request_timeout: Duration::from_secs(parse_or("REQUEST_TIMEOUT_SECS", 10)?),
            update_interval: Duration::from_secs(parse_or("UPDATE_INTERVAL_SECS", 300)?),
            tellstick_host: required("TELLSTICK_HOST")?,
            tellstick_auth: required("TELLSTICK_AUTH")?,
            strategy,
            override_repeat: parse_or("OVERRIDE_REPEAT", false)?,
            on_command: env::var("ON_COMMAND").unwrap_or_default(),
            off_command: env::var("OFF_COMMAND").unwrap_or_default(),
            cache_dir: PathBuf::from(
                env::var("PRICE_CACHE_DIR").unwrap_or_else(|_| "price_cache".to_string()),
            ),
            devices_file: PathBuf::from(
                env::var("DEVICES_FILE").unwrap_or_else(|_| "devices.json".to_string()),
            ),
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn parse_required<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let value = required(key)?;
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.clone(),
    })
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                key,
                value: value.clone(),
            })
        }
        _ => Ok(default),
    }
}
