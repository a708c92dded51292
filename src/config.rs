// Loop rate, watchdog timeouts, topics, chassis calibration
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chassis::pid::ControllerGains;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 500;

// Watchdogs
// Input older than this is treated as "no keys pressed"
pub const INPUT_TIMEOUT: Duration = Duration::from_millis(250);
// Feedback older than this means the tick cannot run
pub const FEEDBACK_TIMEOUT: Duration = Duration::from_millis(50);

// Zenoh topics
pub const TOPIC_KEYS: &str = "chassis/cmd/keys"; // operator keyboard state
pub const TOPIC_MOTOR_FEEDBACK: &str = "chassis/state/motors"; // rotor speeds
pub const TOPIC_POWER_LIMIT: &str = "chassis/referee/power"; // referee power budget
pub const TOPIC_CURRENT: &str = "chassis/rt/current"; // current commands
pub const TOPIC_HEALTH: &str = "chassis/state/health"; // health status

/// Calibration for the chassis: speed levels, controller tuning and the
/// M3508/C620 motor constants used by the governor and the current output.
///
/// Built once at startup and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChassisConfig {
    /// Motion magnitude when no slow-mode key is held
    pub full_speed: f32,
    /// Motion magnitude while slow mode is held
    pub slow_walk_speed: f32,
    /// Rotor rpm -> output shaft rpm (1/19.2 planetary gearbox)
    pub reduction_ratio: f32,
    /// Output shaft rpm reached at wheel fraction 1.0
    pub max_wheel_rpm: f32,
    /// Motor current (A) at a power fraction of 1.0
    pub motor_current_max: f32,
    /// Nominal battery bus voltage (V)
    pub bus_voltage: f32,
    /// Multiplier applied to the estimated wattage before scaling
    pub power_margin: f32,
    /// Power fraction -> raw ESC current command
    pub current_scale: f32,
    /// Budget used until the referee reports one (W)
    pub default_power_limit: f32,
    pub gains: ControllerGains,
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            full_speed: 1.0,
            slow_walk_speed: 0.4,
            reduction_ratio: 187.0 / 3591.0,
            max_wheel_rpm: 469.0,
            motor_current_max: 20.0,
            bus_voltage: 24.0,
            power_margin: 1.05,
            current_scale: 16384.0,
            default_power_limit: 60.0,
            gains: ControllerGains {
                kp: 0.0008,
                ki: 0.000001,
                kd: 0.0,
            },
        }
    }
}
