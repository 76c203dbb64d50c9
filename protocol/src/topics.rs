//! Topic conventions for otb-iot devices.
//!
//! Temperature devices report on the new-style API (`/otb-iot/...`), the
//! pump relay still speaks the old-style API (`/otb_iot/...`). Both spellings
//! are load-bearing wire contracts, do not "fix" them.

/// Sensor zone for the heating circuit being controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Floor,
    Wall,
}

/// Where an inbound message should be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Temperature(Zone),
    PumpStatus,
}

pub fn temp_topic(temp_chip_id: &str, sensor_addr: &str) -> String {
    format!("/otb-iot/{}/temp/{}", temp_chip_id, sensor_addr)
}

pub fn temp_subscription(temp_chip_id: &str) -> String {
    format!("/otb-iot/{}/temp/#", temp_chip_id)
}

pub fn pump_status_topic(pump_chip_id: &str) -> String {
    format!("/otb_iot/{}/status", pump_chip_id)
}

pub fn pump_system_topic(pump_chip_id: &str) -> String {
    format!("/otb_iot/{}/system", pump_chip_id)
}

/// Splits a new-style temperature topic into (chip id, sensor address).
pub fn parse_temp_topic(topic: &str) -> Option<(&str, &str)> {
    let rest = topic.strip_prefix("/otb-iot/")?;
    let (chip_id, rest) = rest.split_once('/')?;
    let sensor_addr = rest.strip_prefix("temp/")?;
    if chip_id.is_empty() || sensor_addr.is_empty() || sensor_addr.contains('/') {
        return None;
    }
    Some((chip_id, sensor_addr))
}

/// Fixed topic-to-route mapping, resolved once at startup.
#[derive(Debug)]
pub struct TopicMap {
    floor: String,
    wall: String,
    status: String,
    /// Subscription filter covering both temperature sensors.
    pub temp_filter: String,
    /// Topic pump commands are published to.
    pub command: String,
}

impl TopicMap {
    pub fn new(
        temp_chip_id: &str,
        floor_sensor: &str,
        wall_sensor: &str,
        pump_chip_id: &str,
    ) -> TopicMap {
        TopicMap {
            floor: temp_topic(temp_chip_id, floor_sensor),
            wall: temp_topic(temp_chip_id, wall_sensor),
            status: pump_status_topic(pump_chip_id),
            temp_filter: temp_subscription(temp_chip_id),
            command: pump_system_topic(pump_chip_id),
        }
    }

    pub fn route(&self, topic: &str) -> Option<Route> {
        if topic == self.floor {
            Some(Route::Temperature(Zone::Floor))
        } else if topic == self.wall {
            Some(Route::Temperature(Zone::Wall))
        } else if topic == self.status {
            Some(Route::PumpStatus)
        } else {
            None
        }
    }

    pub fn status_topic(&self) -> &str {
        &self.status
    }
}
