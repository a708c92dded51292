// Per-wheel velocity controller
//
// The orchestrator only depends on the `VelocityController` trait. `SpeedPid`
// is the controller the chassis ships with.

use serde::{Deserialize, Serialize};

/// Tuning shared by all four wheel controllers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

/// Feedback memory for one wheel
///
/// Each wheel owns exactly one of these; it is only ever handed to the
/// controller call for that wheel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerState {
    /// Sum of all errors seen so far
    pub accumulated_error: f32,
    /// Error from the previous tick
    pub last_error: f32,
}

/// Closes the speed loop for a single wheel
pub trait VelocityController {
    /// Returns a corrective power fraction for one wheel and updates `state`.
    ///
    /// The result is nominally in [-1.0, 1.0] but is not clamped.
    fn update(
        &self,
        measured: f32,
        target: f32,
        gains: &ControllerGains,
        state: &mut ControllerState,
    ) -> f32;
}

/// Discrete PID on speed error, one step per control tick
///
/// Gains are per tick, so the tick period does not enter the math.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeedPid;

impl VelocityController for SpeedPid {
    fn update(
        &self,
        measured: f32,
        target: f32,
        gains: &ControllerGains,
        state: &mut ControllerState,
    ) -> f32 {
        let error = target - measured;

        state.accumulated_error += error;
        let derivative = error - state.last_error;
        state.last_error = error;

        gains.kp * error + gains.ki * state.accumulated_error + gains.kd * derivative
    }
}
