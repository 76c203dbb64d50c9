pub mod config;
pub mod decision;
pub mod pump;
pub mod schedule;
pub mod session;

use anyhow::{bail, Result};
use log::{error, info};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use heating_protocol::topics::TopicMap;
use heating_protocol::transport::{MqttTransport, TransportEvent};

use crate::config::Config;
use crate::pump::PumpSynchronizer;
use crate::schedule::SetpointResolver;
use crate::session::{Session, TickOutcome};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    info!("heating: starting");

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&PathBuf::from(path))?,
        None => Config::default(),
    };

    if config.poll_interval_secs == 0 {
        bail!("poll_interval_secs must be at least 1");
    }

    let resolver = SetpointResolver::new(
        config.schedule_entries()?,
        config.thresholds.fallback_room_temp,
    )?;
    let topics = TopicMap::new(
        &config.devices.temp_chip_id,
        &config.devices.floor_sensor,
        &config.devices.wall_sensor,
        &config.devices.pump_chip_id,
    );
    let mut session = Session::new(
        topics,
        resolver,
        config.thresholds.clone(),
        PumpSynchronizer::new(config.devices.pump_gpio),
    );

    let mut transport =
        MqttTransport::connect("heating-controller", &config.broker.host, config.broker.port);

    let mut tick = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; swallow it so the liveness window
    // spans a full interval.
    tick.tick().await;

    loop {
        tokio::select! {
            event = transport.next_event() => match event {
                Ok(TransportEvent::Connected) => {
                    info!("connected to broker");
                    let topics = session.topics();
                    let temp_filter = topics.temp_filter.clone();
                    let status = topics.status_topic().to_string();
                    transport.subscribe(&temp_filter).await?;
                    transport.subscribe(&status).await?;
                    let query = session.initial_query();
                    let command_topic = session.topics().command.clone();
                    transport.publish(&command_topic, &query.encode()).await?;
                }
                Ok(TransportEvent::Message { topic, payload }) => {
                    if let Some(command) = session.handle_message(&topic, &payload) {
                        let command_topic = session.topics().command.clone();
                        transport.publish(&command_topic, &command.encode()).await?;
                    }
                }
                // Disconnects are fatal: exit and let the supervisor restart us.
                Err(e) => {
                    error!("heating: disconnected from broker: {:#}", e);
                    return Err(e);
                }
            },
            _ = tick.tick() => {
                match session.on_tick() {
                    TickOutcome::Stalled => {
                        bail!(
                            "no temp updates received in {}s, exiting",
                            config.poll_interval_secs
                        );
                    }
                    TickOutcome::Query(query) => {
                        let command_topic = session.topics().command.clone();
                        transport.publish(&command_topic, &query.encode()).await?;
                    }
                }
            }
        }
    }
}
