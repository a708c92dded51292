// Operator input -> chassis motion command
//
// The remote-control link reports the keyboard as a bitmask. It is decoded
// into named flags once, here, and the rest of the pipeline only sees flags.

use serde::{Deserialize, Serialize};

/// Keyboard bit positions as reported by the remote-control link
pub const KEY_W: u16 = 1 << 0;
pub const KEY_S: u16 = 1 << 1;
pub const KEY_A: u16 = 1 << 2;
pub const KEY_D: u16 = 1 << 3;
pub const KEY_SHIFT: u16 = 1 << 4;
pub const KEY_CTRL: u16 = 1 << 5;
pub const KEY_Q: u16 = 1 << 6;
pub const KEY_E: u16 = 1 << 7;

/// Operator intent for one tick
///
/// Flags are independent. Opposite directions held together cancel out in
/// [`map_motion`] instead of being rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlags {
    pub forward: bool,
    pub backward: bool,
    pub strafe_left: bool,
    pub strafe_right: bool,
    pub rotate_left: bool,
    pub rotate_right: bool,
    pub slow_mode: bool,
}

impl ControlFlags {
    /// No keys held
    pub fn idle() -> Self {
        Self::default()
    }

    /// Decode the raw keyboard bitmask (W/S/A/D/Q/E + SHIFT)
    pub fn from_key_bits(bits: u16) -> Self {
        Self {
            forward: bits & KEY_W != 0,
            backward: bits & KEY_S != 0,
            strafe_left: bits & KEY_A != 0,
            strafe_right: bits & KEY_D != 0,
            rotate_left: bits & KEY_Q != 0,
            rotate_right: bits & KEY_E != 0,
            slow_mode: bits & KEY_SHIFT != 0,
        }
    }

    pub fn speed_mode(&self) -> SpeedMode {
        if self.slow_mode {
            SpeedMode::SlowWalk
        } else {
            SpeedMode::Full
        }
    }
}

/// Which of the two configured speed levels is active
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedMode {
    #[default]
    Full,
    SlowWalk,
}

/// Speed levels the mapper chooses between
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedLevels {
    pub full: f32,
    pub slow_walk: f32,
}

impl SpeedLevels {
    pub fn for_mode(&self, mode: SpeedMode) -> f32 {
        match mode {
            SpeedMode::Full => self.full,
            SpeedMode::SlowWalk => self.slow_walk,
        }
    }
}

/// Desired chassis motion for one tick
///
/// `x` is forward, `y` is strafe (right positive), `rotate` is yaw (right
/// positive). Magnitudes are not bounded here; kinematics normalizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionCommand {
    pub x: f32,
    pub y: f32,
    pub rotate: f32,
}

/// Map operator flags to a motion command
pub fn map_motion(flags: &ControlFlags, levels: &SpeedLevels) -> MotionCommand {
    let speed = levels.for_mode(flags.speed_mode());

    MotionCommand {
        x: axis(flags.forward, flags.backward, speed),
        y: axis(flags.strafe_right, flags.strafe_left, speed),
        rotate: axis(flags.rotate_right, flags.rotate_left, speed),
    }
}

fn axis(positive: bool, negative: bool, speed: f32) -> f32 {
    let mut value = 0.0;
    if positive {
        value += speed;
    }
    if negative {
        value -= speed;
    }
    value
}
