// Message types exchanged with the rest of the robot over zenoh

use serde::{Deserialize, Serialize};

use crate::chassis::{ControlFlags, MotorFeedback, PowerBudget};

// Keyboard state from the remote-control link -> runtime
// Raw bitmask, decoded into ControlFlags on arrival
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct KeyInput {
    pub key_bits: u16,
}

impl From<&KeyInput> for ControlFlags {
    fn from(input: &KeyInput) -> Self {
        ControlFlags::from_key_bits(input.key_bits)
    }
}

// Motor speed feedback from the ESCs -> runtime
// Rotor rpm in dispatch order [front_right, back_right, back_left, front_left]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MotorFeedbackMsg {
    pub rotor_rpm: [i16; 4],
}

impl From<&MotorFeedbackMsg> for MotorFeedback {
    fn from(msg: &MotorFeedbackMsg) -> Self {
        let [front_right, back_right, back_left, front_left] = msg.rotor_rpm.map(f32::from);
        Self {
            front_right,
            back_right,
            back_left,
            front_left,
        }
    }
}

// Chassis power limit from the referee system -> runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PowerLimitMsg {
    pub chassis_power_limit: u16,
}

impl From<&PowerLimitMsg> for PowerBudget {
    fn from(msg: &PowerLimitMsg) -> Self {
        PowerBudget(f32::from(msg.chassis_power_limit))
    }
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    InputStale,
    FeedbackStale,
}
