//! Pump on/off decision engine.
//!
//! A pure function of the last readings, the believed pump state and the
//! resolved setpoint. Rules are evaluated as sequential overwrites in source
//! order: a later matching rule replaces the outcome of an earlier one.

use crate::config::Thresholds;
use crate::pump::PumpState;

/// Which rule produced the decision, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Floor above max and the room warm enough to stop protecting it.
    FloorAboveMax,
    /// Both floor and wall above their targets.
    FloorAndWallAboveTarget,
    /// Floor below its minimum.
    FloorBelowMin,
    /// Wall below setpoint while the floor has headroom.
    WallBelowTarget,
    /// Room below the absolute minimum; overrides the floor limit.
    FrostProtection,
}

impl Rule {
    pub fn describe(&self) -> &'static str {
        match self {
            Rule::FloorAboveMax => {
                "turning pump off as wall temp above min room temp, and floor temp above max floor temp"
            }
            Rule::FloorAndWallAboveTarget => {
                "turning pump off as floor temp above min floor temp, and wall temp above target room temp"
            }
            Rule::FloorBelowMin => "turning pump on as floor temp is below min floor temp",
            Rule::WallBelowTarget => {
                "turning pump on as wall temp below target room temp and floor doesn't exceed max"
            }
            Rule::FrostProtection => "turning pump on as wall temp below min room temp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub desired: PumpState,
    pub rule: Option<Rule>,
    /// Frost protection fired while the floor already exceeds its maximum;
    /// the caller must surface this as a warning.
    pub frost_risk: bool,
}

impl Decision {
    fn stay(pump: PumpState) -> Decision {
        Decision {
            desired: pump,
            rule: None,
            frost_risk: false,
        }
    }
}

pub fn decide(
    pump: PumpState,
    floor: f64,
    wall: f64,
    target_room_temp: f64,
    t: &Thresholds,
) -> Decision {
    let mut decision = Decision::stay(pump);

    match pump {
        PumpState::On => {
            // Only turn off when the floor is too hot (unless the room is
            // dangerously cold), or both floor and wall are above target.
            if floor > t.max_floor_temp + t.hysteresis && wall > t.min_room_temp {
                decision.desired = PumpState::Off;
                decision.rule = Some(Rule::FloorAboveMax);
            }
            if floor > t.min_floor_temp + t.hysteresis && wall > target_room_temp + t.hysteresis {
                decision.desired = PumpState::Off;
                decision.rule = Some(Rule::FloorAndWallAboveTarget);
            }
        }
        PumpState::Off => {
            if floor < t.min_floor_temp - t.hysteresis {
                decision.desired = PumpState::On;
                decision.rule = Some(Rule::FloorBelowMin);
            }
            if wall < target_room_temp - t.hysteresis && floor < t.max_floor_temp - t.hysteresis {
                decision.desired = PumpState::On;
                decision.rule = Some(Rule::WallBelowTarget);
            }
            // No hysteresis: frozen pipes beat a cooked floor.
            if wall < t.min_room_temp {
                decision.desired = PumpState::On;
                decision.rule = Some(Rule::FrostProtection);
                decision.frost_risk = floor > t.max_floor_temp;
            }
        }
        // Pump state not read yet; wait for the next state query response.
        PumpState::Unknown => {}
    }

    decision
}
