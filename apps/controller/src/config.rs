//! Startup configuration.
//!
//! Loaded once from a TOML file and never reloaded. Every field has a
//! default matching the values the controller originally shipped with, so an
//! empty file is a valid configuration.

use anyhow::{Context, Result};
use chrono::Weekday;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::schedule::ScheduleEntry;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub broker: Broker,
    pub devices: Devices,
    pub thresholds: Thresholds,
    /// Liveness window and pump state query interval, in seconds.
    pub poll_interval_secs: u64,
    pub schedule: Vec<ScheduleEntryConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Broker {
    pub host: String,
    pub port: u16,
}

impl Default for Broker {
    fn default() -> Broker {
        Broker {
            host: "mosquitto".to_string(),
            port: 1883,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Devices {
    /// Chip id of the otb-iot device carrying both DS18B20 sensors.
    pub temp_chip_id: String,
    /// Chip id of the otb-iot device switching the pump relay.
    pub pump_chip_id: String,
    pub floor_sensor: String,
    pub wall_sensor: String,
    pub pump_gpio: u8,
}

impl Default for Devices {
    fn default() -> Devices {
        Devices {
            temp_chip_id: "289cde".to_string(),
            pump_chip_id: "d76a7d".to_string(),
            floor_sensor: "28-021562ab19ff".to_string(),
            wall_sensor: "28-0415a18a8fff".to_string(),
            pump_gpio: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Margin above/below a trigger before the pump toggles.
    pub hysteresis: f64,
    /// Minimum temperature the floor may reach.
    pub min_floor_temp: f64,
    /// Maximum floor temperature, to avoid damaging it. May be exceeded if
    /// and only if the room is below `min_room_temp`.
    pub max_floor_temp: f64,
    /// Room must not go below this (frozen pipes), even at the floor's expense.
    pub min_room_temp: f64,
    /// Room setpoint when the schedule has no entry within a week.
    pub fallback_room_temp: f64,
}

impl Default for Thresholds {
    fn default() -> Thresholds {
        Thresholds {
            hysteresis: 0.5,
            min_floor_temp: 8.0,
            max_floor_temp: 25.0,
            min_room_temp: 5.0,
            fallback_room_temp: 13.0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleEntryConfig {
    /// Weekday names, e.g. ["mon", "tue"]. Full names are accepted too.
    pub days: Vec<String>,
    pub hour: u8,
    pub minute: u8,
    pub room_temp: f64,
}

const ALL_WEEK: &[&str] = &["mon", "tue", "wed", "thu", "fri", "sat", "sun"];
const WORK_WEEK: &[&str] = &["mon", "tue", "wed", "thu", "fri"];

fn entry(days: &[&str], hour: u8, minute: u8, room_temp: f64) -> ScheduleEntryConfig {
    ScheduleEntryConfig {
        days: days.iter().map(|d| d.to_string()).collect(),
        hour,
        minute,
        room_temp,
    }
}

/// Winter schedule the controller originally shipped with.
fn default_schedule() -> Vec<ScheduleEntryConfig> {
    vec![
        entry(ALL_WEEK, 6, 0, 19.0),
        entry(WORK_WEEK, 10, 0, 19.0),
        entry(WORK_WEEK, 16, 0, 19.0),
        entry(ALL_WEEK, 20, 0, 19.0),
    ]
}

impl Default for Config {
    fn default() -> Config {
        Config {
            broker: Broker::default(),
            devices: Devices::default(),
            thresholds: Thresholds::default(),
            poll_interval_secs: 60,
            schedule: default_schedule(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses the configured schedule into runtime entries. Day names must
    /// be valid and times in range; ordering is checked by the resolver.
    pub fn schedule_entries(&self) -> Result<Vec<ScheduleEntry>> {
        self.schedule
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let days = e
                    .days
                    .iter()
                    .map(|d| {
                        d.parse::<Weekday>()
                            .map_err(|_| anyhow::anyhow!("schedule entry {}: bad day {:?}", i, d))
                    })
                    .collect::<Result<Vec<Weekday>>>()?;
                ScheduleEntry::new(days, e.hour, e.minute, e.room_temp)
                    .with_context(|| format!("schedule entry {}", i))
            })
            .collect()
    }
}
