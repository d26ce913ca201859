// src/types.rs
use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One price interval as published by the provider. Interval length is
/// 15 or 60 minutes depending on source granularity, so nothing here may
/// assume a fixed entry count per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    #[serde(rename = "SEK_per_kWh")]
    pub sek_per_kwh: f64,
    #[serde(rename = "EUR_per_kWh", default, skip_serializing_if = "Option::is_none")]
    pub eur_per_kwh: Option<f64>,
    #[serde(rename = "EXR", default, skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<f64>,
    #[serde(rename = "time_start")]
    pub interval_start: DateTime<FixedOffset>,
    #[serde(rename = "time_end", default, skip_serializing_if = "Option::is_none")]
    pub interval_end: Option<DateTime<FixedOffset>>,
}

impl PriceEntry {
    /// The fallback generator emits entries without an explicit end; those
    /// are treated as one hour long.
    pub fn interval_end_or_default(&self) -> DateTime<FixedOffset> {
        self.interval_end
            .unwrap_or_else(|| self.interval_start + Duration::hours(1))
    }

    /// Whether `[interval_start, interval_end)` contains the given instant.
    pub fn contains(&self, instant: DateTime<FixedOffset>) -> bool {
        self.interval_start <= instant && instant < self.interval_end_or_default()
    }
}

/// A full day's price entries for one price area, ordered by interval start.
pub type PriceSeries = Vec<PriceEntry>;

/// How the trigger price is derived from a day's series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    /// A fixed SEK/kWh threshold, independent of series content.
    Fixed(f64),
    /// "Best hours": the cheapest h/24 fraction of intervals is the ON window.
    Ratio(u8),
}

/// Trigger prices for the rolling two-day window. Both fields are replaced
/// together each cycle; `tomorrow` is None until tomorrow's series exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerState {
    pub today: f64,
    pub tomorrow: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    On,
    Off,
}

impl PowerAction {
    /// Tellstick API command name for this action.
    pub fn as_command(&self) -> &'static str {
        match self {
            PowerAction::On => "turnOn",
            PowerAction::Off => "turnOff",
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerAction::On => write!(f, "ON"),
            PowerAction::Off => write!(f, "OFF"),
        }
    }
}

/// A device under control, keyed by id in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    pub name: String,
}

/// The outcome of one cycle's price comparison. Transient, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlDecision {
    pub desired_state: PowerAction,
    pub current_price: f64,
    pub trigger_price: f64,
    pub last_action: Option<PowerAction>,
    pub override_active: bool,
}

impl ControlDecision {
    /// Commands are only repeated when the desired state changed or override
    /// forces a repeat every cycle.
    pub fn should_dispatch(&self) -> bool {
        self.override_active || self.last_action != Some(self.desired_state)
    }
}

// --- Tellstick wire types ---

#[derive(Debug, Clone, Deserialize)]
pub struct TellstickDevice {
    #[serde(deserialize_with = "deserialize_device_id")]
    pub id: String,
    pub name: String,
}

/// Response of /api/devices/list. A missing "device" key is a valid empty
/// response, not a protocol violation.
#[derive(Debug, Default, Deserialize)]
pub struct TellstickDeviceList {
    #[serde(default)]
    pub device: Vec<TellstickDevice>,
}

// The unit reports device ids as JSON numbers in some firmware versions and
// strings in others.
fn deserialize_device_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unexpected device id value: {}",
            other
        ))),
    }
}
