//! Broker transport adapter.
//!
//! Wraps a `rumqttc` async client so applications see a serial stream of
//! events: one `next_event()` call at a time, no concurrent delivery. State
//! owned by the handler therefore needs no synchronization. A broken
//! connection surfaces as an error from `next_event()`; reconnecting is
//! deliberately not attempted here, the process is expected to exit and be
//! restarted by its supervisor.

use anyhow::{Context, Result};
use log::debug;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;

#[derive(Debug)]
pub enum TransportEvent {
    /// Broker accepted the connection (also fires on session resume).
    Connected,
    Message { topic: String, payload: Vec<u8> },
}

pub struct MqttTransport {
    client: AsyncClient,
    eventloop: EventLoop,
}

impl MqttTransport {
    pub fn connect(client_id: &str, host: &str, port: u16) -> MqttTransport {
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(Duration::from_secs(60));
        let (client, eventloop) = AsyncClient::new(options, 16);
        MqttTransport { client, eventloop }
    }

    pub async fn subscribe(&self, filter: &str) -> Result<()> {
        self.client
            .subscribe(filter, QoS::AtMostOnce)
            .await
            .with_context(|| format!("subscribe {}", filter))
    }

    pub async fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        debug!("publish {} <- {}", topic, payload);
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .with_context(|| format!("publish {}", topic))
    }

    /// Next connection or message event. Packets that carry no application
    /// payload (pings, acks, outgoing halves) are skipped. An `Err` means
    /// the broker connection is gone.
    pub async fn next_event(&mut self) -> Result<TransportEvent> {
        loop {
            let event = self
                .eventloop
                .poll()
                .await
                .context("broker connection lost")?;
            match event {
                Event::Incoming(Packet::ConnAck(_)) => return Ok(TransportEvent::Connected),
                Event::Incoming(Packet::Publish(publish)) => {
                    debug!("recv {} ({} bytes)", publish.topic, publish.payload.len());
                    return Ok(TransportEvent::Message {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    });
                }
                _ => {}
            }
        }
    }
}
