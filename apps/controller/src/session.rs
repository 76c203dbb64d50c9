//! Connection session state.
//!
//! One `Session` per broker connection, owning the last readings, the
//! schedule resolver and the pump synchronizer. All methods are called from
//! a single task (message or timer context), so there is no locking; the
//! transport serializes delivery. Outgoing commands are returned to the
//! caller rather than published here.

use chrono::{DateTime, Local};
use heating_protocol::gpio::{self, GpioCommand};
use heating_protocol::topics::{Route, TopicMap, Zone};
use log::{debug, info, warn};

use crate::config::Thresholds;
use crate::decision::decide;
use crate::pump::{AckOutcome, PumpState, PumpSynchronizer};
use crate::schedule::{DayTime, SetpointResolver};

/// Latest reading for one zone; no history is kept.
#[derive(Debug, Clone, Copy)]
pub struct Reading {
    pub temperature: f64,
    pub received_at: DateTime<Local>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// No temperature update arrived during the whole window; the session
    /// is stalled and the process should exit.
    Stalled,
    /// Session alive; publish this state query.
    Query(GpioCommand),
}

pub struct Session {
    topics: TopicMap,
    resolver: SetpointResolver,
    thresholds: Thresholds,
    pump: PumpSynchronizer,
    floor: Reading,
    wall: Reading,
    updates_seen: u64,
    seen_at_last_tick: u64,
}

impl Session {
    pub fn new(
        topics: TopicMap,
        resolver: SetpointResolver,
        thresholds: Thresholds,
        pump: PumpSynchronizer,
    ) -> Session {
        let now = Local::now();
        // Safe-ish placeholders until real readings arrive: neither triggers
        // an on/off rule on its own.
        let floor = Reading {
            temperature: thresholds.min_floor_temp,
            received_at: now,
        };
        let wall = Reading {
            temperature: thresholds.fallback_room_temp,
            received_at: now,
        };
        Session {
            topics,
            resolver,
            thresholds,
            pump,
            floor,
            wall,
            updates_seen: 0,
            seen_at_last_tick: 0,
        }
    }

    pub fn topics(&self) -> &TopicMap {
        &self.topics
    }

    /// State query to send right after connecting.
    pub fn initial_query(&self) -> GpioCommand {
        self.pump.poll()
    }

    /// Handles one inbound message; may yield a pump command to publish.
    pub fn handle_message(&mut self, topic: &str, payload: &[u8]) -> Option<GpioCommand> {
        match self.topics.route(topic) {
            Some(Route::Temperature(zone)) => self.on_temperature(zone, payload),
            Some(Route::PumpStatus) => {
                self.on_pump_status(payload);
                None
            }
            None => {
                debug!("ignoring message on unexpected topic {}", topic);
                None
            }
        }
    }

    /// Periodic reconciliation and liveness check.
    pub fn on_tick(&mut self) -> TickOutcome {
        if self.updates_seen == self.seen_at_last_tick {
            return TickOutcome::Stalled;
        }
        self.seen_at_last_tick = self.updates_seen;
        TickOutcome::Query(self.pump.poll())
    }

    fn on_temperature(&mut self, zone: Zone, payload: &[u8]) -> Option<GpioCommand> {
        let text = match std::str::from_utf8(payload) {
            Ok(text) => text.trim(),
            Err(_) => {
                warn!("non-utf8 temperature payload for {:?}, ignored", zone);
                return None;
            }
        };
        let temperature: f64 = match text.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("malformed temperature {:?} for {:?}, ignored", text, zone);
                return None;
            }
        };
        debug!("got temp {}C from {:?}", temperature, zone);
        let reading = Reading {
            temperature,
            received_at: Local::now(),
        };
        match zone {
            Zone::Floor => self.floor = reading,
            Zone::Wall => self.wall = reading,
        }
        self.updates_seen += 1;
        self.make_decision()
    }

    fn make_decision(&mut self) -> Option<GpioCommand> {
        let pump = self.pump.confirmed();
        if pump == PumpState::Unknown {
            info!("not yet read pump state, no action");
            return None;
        }
        let target = self.resolver.resolve(DayTime::from_local(Local::now()));
        debug!(
            "deciding: floor {:.2}C wall {:.2}C target {:.2}C pump {}",
            self.floor.temperature,
            self.wall.temperature,
            target,
            pump.as_str()
        );
        let decision = decide(
            pump,
            self.floor.temperature,
            self.wall.temperature,
            target,
            &self.thresholds,
        );
        if decision.desired == pump {
            return None;
        }
        if let Some(rule) = decision.rule {
            info!("{}", rule.describe());
        }
        if decision.frost_risk {
            warn!("turning pump on even though max floor temp exceeded, as room temp below minimum");
        }
        let command = self.pump.request(decision.desired)?;
        info!(
            "set pump state to {}, wall={:.2}C, floor={:.2}C",
            decision.desired.as_str(),
            self.wall.temperature,
            self.floor.temperature
        );
        Some(command)
    }

    fn on_pump_status(&mut self, payload: &[u8]) {
        let text = String::from_utf8_lossy(payload);
        match self.pump.on_ack(gpio::parse_status(text.trim())) {
            AckOutcome::Committed(state) => {
                info!("pump successfully set to {}", state.as_str());
            }
            AckOutcome::SpuriousAck(state) => {
                info!("pump set ok with no request pending, still {}", state.as_str());
            }
            AckOutcome::QueryReport { state, previous } => {
                if previous == state {
                    debug!("pump state is {}", state.as_str());
                } else if previous == PumpState::Unknown {
                    info!("pump state is {}", state.as_str());
                } else {
                    warn!(
                        "pump state corrected from {} to {}",
                        previous.as_str(),
                        state.as_str()
                    );
                }
            }
            AckOutcome::Failed => {
                warn!(
                    "pump command failed, confirmed state left as {}",
                    self.pump.confirmed().as_str()
                );
            }
        }
    }
}
