//! Pump state synchronization against the relay device.
//!
//! Tracks the last confirmed relay state plus at most one in-flight command.
//! Commands are returned as values for the caller to publish, so this stays
//! free of transport concerns.

use heating_protocol::gpio::{GpioCommand, StatusPayload};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    On,
    Off,
    Unknown,
}

impl PumpState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PumpState::On => "on",
            PumpState::Off => "off",
            PumpState::Unknown => "unknown",
        }
    }
}

/// What an inbound status payload meant for our view of the pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// In-flight command confirmed; state committed.
    Committed(PumpState),
    /// A set-ok arrived with nothing pending (set by someone else).
    SpuriousAck(PumpState),
    /// State query response; `previous` is what we believed before.
    QueryReport {
        state: PumpState,
        previous: PumpState,
    },
    /// Command failed; pending cleared, confirmed state untouched.
    Failed,
}

#[derive(Debug)]
pub struct PumpSynchronizer {
    confirmed: PumpState,
    pending: Option<PumpState>,
    pin: u8,
}

impl PumpSynchronizer {
    pub fn new(pin: u8) -> PumpSynchronizer {
        PumpSynchronizer {
            confirmed: PumpState::Unknown,
            pending: None,
            pin,
        }
    }

    pub fn confirmed(&self) -> PumpState {
        self.confirmed
    }

    pub fn pending(&self) -> Option<PumpState> {
        self.pending
    }

    /// Asks for the pump to be switched to `desired` (On or Off). Returns
    /// the command to publish, or None when a request is already in flight
    /// (not queued, not retried; the next reconciliation sorts it out) or
    /// nothing needs to change.
    pub fn request(&mut self, desired: PumpState) -> Option<GpioCommand> {
        debug_assert!(desired != PumpState::Unknown);
        if self.pending.is_some() {
            debug!("previous pump state update not yet completed");
            return None;
        }
        if desired == self.confirmed {
            return None;
        }
        self.pending = Some(desired);
        Some(GpioCommand::Set {
            pin: self.pin,
            on: desired == PumpState::On,
        })
    }

    pub fn on_ack(&mut self, status: StatusPayload) -> AckOutcome {
        match status {
            StatusPayload::SetOk => match self.pending.take() {
                Some(state) => {
                    self.confirmed = state;
                    AckOutcome::Committed(state)
                }
                None => AckOutcome::SpuriousAck(self.confirmed),
            },
            StatusPayload::GetState(on) => {
                let state = if on { PumpState::On } else { PumpState::Off };
                let previous = self.confirmed;
                // Direct overwrite: the device is the authority. Covers
                // external changes and the relay rebooting with a different
                // default.
                self.confirmed = state;
                AckOutcome::QueryReport { state, previous }
            }
            StatusPayload::Unrecognized => {
                self.pending = None;
                AckOutcome::Failed
            }
        }
    }

    /// Periodic state query; sent regardless of pending status.
    pub fn poll(&self) -> GpioCommand {
        GpioCommand::Get { pin: self.pin }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_emits_single_command() {
        let mut p = PumpSynchronizer::new(5);
        let cmd = p.on_ack(StatusPayload::GetState(false));
        assert_eq!(
            cmd,
            AckOutcome::QueryReport {
                state: PumpState::Off,
                previous: PumpState::Unknown
            }
        );
        let cmd = p.request(PumpState::On).unwrap();
        assert_eq!(cmd.encode(), "gpio:set:5:1");
        // Second request with no intervening ack: no-op, even for the
        // opposite state.
        assert_eq!(p.request(PumpState::On), None);
        assert_eq!(p.request(PumpState::Off), None);
        assert_eq!(p.confirmed(), PumpState::Off);
    }

    #[test]
    fn ack_commits_pending() {
        let mut p = PumpSynchronizer::new(5);
        p.on_ack(StatusPayload::GetState(false));
        p.request(PumpState::On).unwrap();
        assert_eq!(
            p.on_ack(StatusPayload::SetOk),
            AckOutcome::Committed(PumpState::On)
        );
        assert_eq!(p.confirmed(), PumpState::On);
        assert_eq!(p.pending(), None);
    }

    #[test]
    fn spurious_ack_leaves_state_alone() {
        let mut p = PumpSynchronizer::new(5);
        p.on_ack(StatusPayload::GetState(true));
        assert_eq!(
            p.on_ack(StatusPayload::SetOk),
            AckOutcome::SpuriousAck(PumpState::On)
        );
        assert_eq!(p.confirmed(), PumpState::On);
    }

    #[test]
    fn query_overwrites_belief() {
        let mut p = PumpSynchronizer::new(5);
        p.on_ack(StatusPayload::GetState(true));
        // Someone flipped the relay behind our back.
        let outcome = p.on_ack(StatusPayload::GetState(false));
        assert_eq!(
            outcome,
            AckOutcome::QueryReport {
                state: PumpState::Off,
                previous: PumpState::On
            }
        );
        assert_eq!(p.confirmed(), PumpState::Off);
    }

    #[test]
    fn failure_clears_pending_keeps_confirmed() {
        let mut p = PumpSynchronizer::new(5);
        p.on_ack(StatusPayload::GetState(false));
        p.request(PumpState::On).unwrap();
        assert_eq!(p.on_ack(StatusPayload::Unrecognized), AckOutcome::Failed);
        assert_eq!(p.confirmed(), PumpState::Off);
        assert_eq!(p.pending(), None);
        // A new request may now be issued.
        assert!(p.request(PumpState::On).is_some());
    }

    #[test]
    fn request_matching_confirmed_is_noop() {
        let mut p = PumpSynchronizer::new(5);
        p.on_ack(StatusPayload::GetState(true));
        assert_eq!(p.request(PumpState::On), None);
    }

    #[test]
    fn poll_is_state_query() {
        let p = PumpSynchronizer::new(5);
        assert_eq!(p.poll().encode(), "gpio:get:5");
    }
}
