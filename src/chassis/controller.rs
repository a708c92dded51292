// Per-tick chassis control loop
//
// input flags -> motion command -> wheel fractions -> per-wheel speed loop
// -> power governor -> integer current commands

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::governor::{govern, GovernorReport, PowerBudget, PowerModel};
use super::input::{map_motion, ControlFlags, SpeedLevels, SpeedMode};
use super::kinematics::{motion_to_wheels, Wheel, WheelFractions};
use super::pid::{ControllerState, SpeedPid, VelocityController};
use crate::config::ChassisConfig;

/// Measured rotor speed of each motor in rpm, before the gearbox
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotorFeedback {
    pub front_right: f32,
    pub back_right: f32,
    pub back_left: f32,
    pub front_left: f32,
}

impl MotorFeedback {
    pub fn rotor_rpm(&self, wheel: Wheel) -> f32 {
        match wheel {
            Wheel::FrontRight => self.front_right,
            Wheel::BackRight => self.back_right,
            Wheel::BackLeft => self.back_left,
            Wheel::FrontLeft => self.front_left,
        }
    }
}

/// Raw current command per motor, in the ESC's command range
///
/// Field order is the dispatch order on the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCommand {
    pub front_right: i16,
    pub back_right: i16,
    pub back_left: i16,
    pub front_left: i16,
}

impl CurrentCommand {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Multiply each fraction by `current_scale` and truncate toward zero.
    ///
    /// Values outside the i16 range saturate.
    pub fn from_fractions(fractions: &WheelFractions, current_scale: f32) -> Self {
        let raw = |wheel| (fractions.get(wheel) * current_scale) as i16;
        Self {
            front_right: raw(Wheel::FrontRight),
            back_right: raw(Wheel::BackRight),
            back_left: raw(Wheel::BackLeft),
            front_left: raw(Wheel::FrontLeft),
        }
    }

    /// Returns commands as array [front_right, back_right, back_left, front_left]
    pub fn as_array(&self) -> [i16; 4] {
        [
            self.front_right,
            self.back_right,
            self.back_left,
            self.front_left,
        ]
    }
}

/// Everything one tick computed, for logging and inspection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickTrace {
    pub wheels: WheelFractions,
    pub controller_outputs: WheelFractions,
    pub governor: GovernorReport,
    pub command: CurrentCommand,
}

/// Owns the per-wheel controller state and runs the control pipeline
pub struct ChassisController<C = SpeedPid> {
    config: ChassisConfig,
    controller: C,
    states: [ControllerState; 4], // indexed by Wheel
    speed_mode: SpeedMode,
}

impl ChassisController<SpeedPid> {
    /// Create a controller using the default speed PID
    pub fn new(config: ChassisConfig) -> Self {
        Self::with_controller(config, SpeedPid)
    }
}

impl<C: VelocityController> ChassisController<C> {
    /// Create with a custom velocity controller
    ///
    /// All four wheel states start zeroed.
    pub fn with_controller(config: ChassisConfig, controller: C) -> Self {
        info!(
            "Chassis controller initialized: kp={}, ki={}, kd={}",
            config.gains.kp, config.gains.ki, config.gains.kd
        );
        Self {
            config,
            controller,
            states: [ControllerState::default(); 4],
            speed_mode: SpeedMode::default(),
        }
    }

    pub fn config(&self) -> &ChassisConfig {
        &self.config
    }

    /// Speed mode selected by the most recent tick
    pub fn speed_mode(&self) -> SpeedMode {
        self.speed_mode
    }

    pub fn state(&self, wheel: Wheel) -> &ControllerState {
        &self.states[wheel.index()]
    }

    fn speed_levels(&self) -> SpeedLevels {
        SpeedLevels {
            full: self.config.full_speed,
            slow_walk: self.config.slow_walk_speed,
        }
    }

    fn power_model(&self) -> PowerModel {
        PowerModel {
            motor_current_max: self.config.motor_current_max,
            bus_voltage: self.config.bus_voltage,
            margin: self.config.power_margin,
        }
    }

    /// Run one control tick and return the command to dispatch
    ///
    /// `dt` is the tick period; the speed loop works in per-tick units and
    /// does not use it.
    pub fn tick(
        &mut self,
        input: &ControlFlags,
        feedback: &MotorFeedback,
        budget: PowerBudget,
        dt: Duration,
    ) -> CurrentCommand {
        self.tick_traced(input, feedback, budget, dt).command
    }

    /// Same as [`tick`](Self::tick) but also returns the intermediate values
    pub fn tick_traced(
        &mut self,
        input: &ControlFlags,
        feedback: &MotorFeedback,
        budget: PowerBudget,
        dt: Duration,
    ) -> TickTrace {
        self.speed_mode = input.speed_mode();

        let motion = map_motion(input, &self.speed_levels());
        let wheels = motion_to_wheels(&motion);

        let mut outputs = WheelFractions::zero();
        for wheel in Wheel::ALL {
            let measured = feedback.rotor_rpm(wheel) * self.config.reduction_ratio;
            let target = wheels.get(wheel) * self.config.max_wheel_rpm;
            let state = &mut self.states[wheel.index()];
            let output = self
                .controller
                .update(measured, target, &self.config.gains, state);
            outputs.set(wheel, output);
            trace!(wheel = wheel.name(), measured, target, output, "Wheel speed loop");
        }
        let controller_outputs = outputs;

        let governor = govern(&mut outputs, budget, &self.power_model());
        let command = CurrentCommand::from_fractions(&outputs, self.config.current_scale);

        debug!(
            ?motion,
            dt_us = dt.as_micros() as u64,
            budget_w = budget.watts(),
            estimated_w = governor.estimated_watts,
            scale = governor.scale,
            "Chassis tick: current={:?}",
            command.as_array()
        );

        TickTrace {
            wheels,
            controller_outputs,
            governor,
            command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chassis::governor::estimate_watts;
    use crate::chassis::input::{KEY_D, KEY_SHIFT, KEY_W};
    use crate::chassis::pid::ControllerGains;

    const DT: Duration = Duration::from_millis(2);

    /// Passes the target straight through as the output, scaled to a fraction
    struct TargetEcho {
        max_rpm: f32,
    }

    impl VelocityController for TargetEcho {
        fn update(
            &self,
            _measured: f32,
            target: f32,
            _gains: &ControllerGains,
            state: &mut ControllerState,
        ) -> f32 {
            state.last_error = target;
            target / self.max_rpm
        }
    }

    fn echo_controller() -> ChassisController<TargetEcho> {
        let config = ChassisConfig::default();
        let max_rpm = config.max_wheel_rpm;
        ChassisController::with_controller(config, TargetEcho { max_rpm })
    }

    #[test]
    fn test_forward_end_to_end() {
        let mut chassis = echo_controller();
        let input = ControlFlags::from_key_bits(KEY_W);
        // Budget equal to the draw of the unscaled outputs leaves them as they are
        let expected = WheelFractions::new(-1.0, 1.0, -1.0, 1.0);
        let budget = PowerBudget(estimate_watts(&expected, &chassis.power_model()));
        let trace = chassis.tick_traced(&input, &MotorFeedback::default(), budget, DT);

        assert_eq!(trace.wheels, expected);
        assert_eq!(trace.controller_outputs, expected);
        assert_eq!(trace.governor.scale, 1.0);
        assert_eq!(
            trace.command,
            CurrentCommand {
                front_right: -16384,
                back_right: -16384,
                back_left: 16384,
                front_left: 16384,
            }
        );
    }

    #[test]
    fn test_forward_strafe_right_end_to_end() {
        let mut chassis = echo_controller();
        let input = ControlFlags::from_key_bits(KEY_W | KEY_D);
        let expected = WheelFractions::new(0.0, 1.0, -1.0, 0.0);
        let budget = PowerBudget(estimate_watts(&expected, &chassis.power_model()));
        let trace = chassis.tick_traced(&input, &MotorFeedback::default(), budget, DT);
        assert_eq!(trace.wheels, expected);
        assert_eq!(trace.governor.scale, 1.0);
        assert_eq!(trace.command.as_array(), [0, -16384, 0, 16384]);
    }

    #[test]
    fn test_budget_limits_command() {
        let mut chassis = echo_controller();
        let input = ControlFlags::from_key_bits(KEY_W);
        let trace = chassis.tick_traced(
            &input,
            &MotorFeedback::default(),
            PowerBudget(80.0),
            DT,
        );

        let expected_scale = 80.0 / (4.0 * 20.0 * 24.0 * 1.05);
        assert!((trace.governor.scale - expected_scale).abs() < 1e-6);
        let expected = (expected_scale * 16384.0) as i16;
        for value in trace.command.as_array() {
            assert!((value.abs() - expected).abs() <= 1);
        }
    }

    #[test]
    fn test_init_zeroes_every_wheel_state() {
        let chassis = ChassisController::new(ChassisConfig::default());
        for wheel in Wheel::ALL {
            assert_eq!(*chassis.state(wheel), ControllerState::default());
        }
        assert_eq!(chassis.speed_mode(), SpeedMode::Full);
    }

    #[test]
    fn test_idle_with_zero_feedback_sends_zero() {
        let mut chassis = ChassisController::new(ChassisConfig::default());
        let cmd = chassis.tick(
            &ControlFlags::idle(),
            &MotorFeedback::default(),
            PowerBudget(60.0),
            DT,
        );
        assert_eq!(cmd, CurrentCommand::zero());
    }

    #[test]
    fn test_each_wheel_state_is_its_own() {
        let mut chassis = ChassisController::new(ChassisConfig::default());
        // Only the back-left rotor is spinning; everything should be at rest
        let feedback = MotorFeedback {
            back_left: 1920.0,
            ..Default::default()
        };
        chassis.tick(&ControlFlags::idle(), &feedback, PowerBudget(60.0), DT);

        assert_eq!(*chassis.state(Wheel::FrontRight), ControllerState::default());
        assert_eq!(*chassis.state(Wheel::BackRight), ControllerState::default());
        assert_eq!(*chassis.state(Wheel::FrontLeft), ControllerState::default());

        let back_left = chassis.state(Wheel::BackLeft);
        let expected_error = -1920.0 * ChassisConfig::default().reduction_ratio;
        assert!((back_left.last_error - expected_error).abs() < 1e-4);
        assert!((back_left.accumulated_error - expected_error).abs() < 1e-4);
    }

    #[test]
    fn test_state_accumulates_across_ticks() {
        let mut chassis = ChassisController::new(ChassisConfig::default());
        let input = ControlFlags::from_key_bits(KEY_W);
        for _ in 0..3 {
            chassis.tick(&input, &MotorFeedback::default(), PowerBudget(60.0), DT);
        }
        let max_rpm = ChassisConfig::default().max_wheel_rpm;
        let state = chassis.state(Wheel::FrontLeft);
        assert!((state.accumulated_error - 3.0 * max_rpm).abs() < 1e-3);
        assert!((chassis.state(Wheel::FrontRight).accumulated_error + 3.0 * max_rpm).abs() < 1e-3);
    }

    #[test]
    fn test_speed_mode_tracks_input() {
        let mut chassis = ChassisController::new(ChassisConfig::default());
        assert_eq!(chassis.speed_mode(), SpeedMode::Full);

        let slow = ControlFlags::from_key_bits(KEY_W | KEY_SHIFT);
        chassis.tick(&slow, &MotorFeedback::default(), PowerBudget(60.0), DT);
        assert_eq!(chassis.speed_mode(), SpeedMode::SlowWalk);

        chassis.tick(&ControlFlags::idle(), &MotorFeedback::default(), PowerBudget(60.0), DT);
        assert_eq!(chassis.speed_mode(), SpeedMode::Full);
    }

    #[test]
    fn test_current_truncates_toward_zero() {
        let fractions = WheelFractions::new(0.00009, -0.00009, 0.5, -0.5);
        let cmd = CurrentCommand::from_fractions(&fractions, 16384.0);
        // 0.00009 * 16384 = 1.47 -> 1, -1.47 -> -1
        assert_eq!(cmd.front_right, 1);
        assert_eq!(cmd.front_left, -1);
        assert_eq!(cmd.back_right, 8192);
        assert_eq!(cmd.back_left, -8192);
    }

    #[test]
    fn test_current_saturates_out_of_range() {
        let fractions = WheelFractions::new(3.0, -3.0, 0.0, 0.0);
        let cmd = CurrentCommand::from_fractions(&fractions, 16384.0);
        assert_eq!(cmd.front_right, i16::MAX);
        assert_eq!(cmd.front_left, i16::MIN);
    }
}
