//! MQTT to InfluxDB bridge for otb-iot temperature readings.
//!
//! Subscribes to the temperature topics of every configured chip, tags each
//! reading with chip, sensor and location, and writes it to InfluxDB. Same
//! liveness policy as the controller: if nothing arrives for a full
//! interval, exit and let the supervisor restart the process.

mod influx;

use anyhow::{bail, Context, Result};
use chrono::Local;
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use heating_protocol::topics::{parse_temp_topic, temp_subscription};
use heating_protocol::transport::{MqttTransport, TransportEvent};

use crate::influx::{InfluxWriter, Point};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    broker: Broker,
    influx: Influx,
    /// Chip id -> human readable location tag.
    locations: HashMap<String, String>,
    poll_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Broker {
    host: String,
    port: u16,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Influx {
    url: String,
    database: String,
    username: Option<String>,
    password: Option<String>,
}

impl Default for Broker {
    fn default() -> Broker {
        Broker {
            host: "mosquitto".to_string(),
            port: 1883,
        }
    }
}

impl Default for Influx {
    fn default() -> Influx {
        Influx {
            url: "http://localhost:8086".to_string(),
            database: "otbiot".to_string(),
            username: None,
            password: None,
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            broker: Broker::default(),
            influx: Influx::default(),
            locations: HashMap::new(),
            poll_interval_secs: 60,
        }
    }
}

impl Config {
    fn load(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }
}

/// Turns one inbound publish into a data point, or None when the topic is
/// not a temperature reading for a configured chip or the payload is bad.
fn point_for(
    locations: &HashMap<String, String>,
    topic: &str,
    payload: &[u8],
    timestamp_ms: i64,
) -> Option<Point> {
    let (chip_id, sensor_addr) = parse_temp_topic(topic)?;
    let location = match locations.get(chip_id) {
        Some(location) => location,
        None => {
            debug!("reading from unconfigured chip {}, skipped", chip_id);
            return None;
        }
    };
    let text = std::str::from_utf8(payload).ok()?.trim();
    let value: f64 = match text.parse() {
        Ok(value) => value,
        Err(_) => {
            warn!("malformed temperature {:?} on {}, skipped", text, topic);
            return None;
        }
    };
    Some(Point {
        measurement: "temperature",
        tags: vec![
            ("chipId", chip_id.to_string()),
            ("sensorId", sensor_addr.to_string()),
            ("location", location.clone()),
        ],
        timestamp_ms,
        value,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    info!("telemetry: starting");

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&PathBuf::from(path))?,
        None => Config::default(),
    };
    if config.locations.is_empty() {
        bail!("no chip locations configured, nothing to bridge");
    }
    if config.poll_interval_secs == 0 {
        bail!("poll_interval_secs must be at least 1");
    }

    let writer = InfluxWriter::new(
        &config.influx.url,
        &config.influx.database,
        config.influx.username.as_deref(),
        config.influx.password.as_deref(),
    );
    let mut transport =
        MqttTransport::connect("heating-telemetry", &config.broker.host, config.broker.port);

    let mut tick = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tick.tick().await;

    let mut points_seen: u64 = 0;
    let mut seen_at_last_tick: u64 = 0;

    loop {
        tokio::select! {
            event = transport.next_event() => match event {
                Ok(TransportEvent::Connected) => {
                    info!("connected to broker");
                    for chip_id in config.locations.keys() {
                        transport.subscribe(&temp_subscription(chip_id)).await?;
                    }
                }
                Ok(TransportEvent::Message { topic, payload }) => {
                    let now_ms = Local::now().timestamp_millis();
                    if let Some(point) = point_for(&config.locations, &topic, &payload, now_ms) {
                        points_seen += 1;
                        if let Err(e) = writer.write(&point).await {
                            // Telemetry is best effort; drop the point.
                            warn!("influx write failed: {:#}", e);
                        }
                    }
                }
                Err(e) => {
                    error!("telemetry: disconnected from broker: {:#}", e);
                    return Err(e);
                }
            },
            _ = tick.tick() => {
                if points_seen == seen_at_last_tick {
                    bail!(
                        "no readings received in {}s, exiting",
                        config.poll_interval_secs
                    );
                }
                seen_at_last_tick = points_seen;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locations() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("289cde".to_string(), "Hall".to_string());
        map
    }

    #[test]
    fn reading_becomes_point() {
        let point = point_for(
            &locations(),
            "/otb-iot/289cde/temp/28-021562ab19ff",
            b"19.5",
            1000,
        )
        .unwrap();
        assert_eq!(point.measurement, "temperature");
        assert_eq!(point.value, 19.5);
        assert_eq!(point.timestamp_ms, 1000);
        assert_eq!(point.tags[2], ("location", "Hall".to_string()));
    }

    #[test]
    fn unconfigured_chip_is_skipped() {
        assert_eq!(
            point_for(&locations(), "/otb-iot/ffffff/temp/28-x", b"19.5", 1000),
            None
        );
    }

    #[test]
    fn non_temperature_topic_is_skipped() {
        assert_eq!(
            point_for(&locations(), "/otb_iot/289cde/status", b"19.5", 1000),
            None
        );
    }

    #[test]
    fn malformed_payload_is_skipped() {
        assert_eq!(
            point_for(
                &locations(),
                "/otb-iot/289cde/temp/28-021562ab19ff",
                b"oops",
                1000
            ),
            None
        );
    }
}
