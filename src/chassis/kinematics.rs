// Mecanum inverse kinematics for the 4-wheel chassis
// Converts a motion command (x, y, rotate) into per-wheel power fractions.

use serde::{Deserialize, Serialize};

use super::input::MotionCommand;

/// Logical wheel positions
///
/// Discriminants follow the motor id order on the bus (ids 1..4), which is
/// also the order current commands are dispatched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wheel {
    FrontRight = 0,
    BackRight = 1,
    BackLeft = 2,
    FrontLeft = 3,
}

impl Wheel {
    /// All wheels, in dispatch order
    pub const ALL: [Wheel; 4] = [
        Wheel::FrontRight,
        Wheel::BackRight,
        Wheel::BackLeft,
        Wheel::FrontLeft,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Wheel::FrontRight => "front_right",
            Wheel::BackRight => "back_right",
            Wheel::BackLeft => "back_left",
            Wheel::FrontLeft => "front_left",
        }
    }
}

/// Signed power fraction per wheel, nominally in [-1.0, 1.0]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelFractions {
    pub front_right: f32,
    pub front_left: f32,
    pub back_right: f32,
    pub back_left: f32,
}

impl WheelFractions {
    pub fn new(front_right: f32, front_left: f32, back_right: f32, back_left: f32) -> Self {
        Self {
            front_right,
            front_left,
            back_right,
            back_left,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, wheel: Wheel) -> f32 {
        match wheel {
            Wheel::FrontRight => self.front_right,
            Wheel::BackRight => self.back_right,
            Wheel::BackLeft => self.back_left,
            Wheel::FrontLeft => self.front_left,
        }
    }

    pub fn set(&mut self, wheel: Wheel, value: f32) {
        match wheel {
            Wheel::FrontRight => self.front_right = value,
            Wheel::BackRight => self.back_right = value,
            Wheel::BackLeft => self.back_left = value,
            Wheel::FrontLeft => self.front_left = value,
        }
    }

    /// Returns fractions in dispatch order [front_right, back_right, back_left, front_left]
    pub fn as_array(&self) -> [f32; 4] {
        Wheel::ALL.map(|wheel| self.get(wheel))
    }

    /// Largest absolute fraction among the four wheels
    pub fn max_magnitude(&self) -> f32 {
        self.as_array().iter().fold(0.0f32, |max, v| max.max(v.abs()))
    }

    /// Multiply every wheel by the same factor
    pub fn scale(&mut self, factor: f32) {
        self.front_right *= factor;
        self.front_left *= factor;
        self.back_right *= factor;
        self.back_left *= factor;
    }
}

/// Convert a motion command to wheel fractions
///
/// Raw powers are normalized by the largest magnitude only when it exceeds
/// 1.0, so the ratios between wheels are preserved. Right-side wheels are
/// mounted mirrored and get negated last.
pub fn motion_to_wheels(cmd: &MotionCommand) -> WheelFractions {
    let MotionCommand { x, y, rotate } = *cmd;

    let mut wheels = WheelFractions {
        front_right: x - y - rotate,
        front_left: x + y + rotate,
        back_right: x + y - rotate,
        back_left: x - y + rotate,
    };

    let max = wheels.max_magnitude();
    if max > 1.0 {
        wheels.front_right /= max;
        wheels.front_left /= max;
        wheels.back_right /= max;
        wheels.back_left /= max;
    }

    // Invert right side so "forward" is consistent for all motors
    wheels.front_right = -wheels.front_right;
    wheels.back_right = -wheels.back_right;

    wheels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(x: f32, y: f32, rotate: f32) -> MotionCommand {
        MotionCommand { x, y, rotate }
    }

    #[test]
    fn test_zero_motion() {
        assert_eq!(motion_to_wheels(&cmd(0.0, 0.0, 0.0)), WheelFractions::zero());
    }

    #[test]
    fn test_pure_forward_sign_convention() {
        let wheels = motion_to_wheels(&cmd(1.0, 0.0, 0.0));
        assert_eq!(wheels, WheelFractions::new(-1.0, 1.0, -1.0, 1.0));
        assert!(wheels.front_right < 0.0 && wheels.back_right < 0.0);
        assert!(wheels.front_left > 0.0 && wheels.back_left > 0.0);
    }

    #[test]
    fn test_forward_and_strafe_right_normalized() {
        // Raw: fr=0, fl=2, br=2, bl=0 -> /2 -> right side negated
        let wheels = motion_to_wheels(&cmd(1.0, 1.0, 0.0));
        assert_eq!(wheels.front_right, 0.0);
        assert_eq!(wheels.front_left, 1.0);
        assert_eq!(wheels.back_right, -1.0);
        assert_eq!(wheels.back_left, 0.0);
    }

    #[test]
    fn test_small_command_passes_through() {
        // max raw magnitude 0.6, no normalization
        let wheels = motion_to_wheels(&cmd(0.3, 0.2, 0.1));
        let expected = WheelFractions::new(-(0.3 - 0.2 - 0.1), 0.3 + 0.2 + 0.1, -(0.3 + 0.2 - 0.1), 0.3 - 0.2 + 0.1);
        assert_eq!(wheels, expected);
    }

    #[test]
    fn test_rotation_only() {
        // Rotating right: left wheels forward, right wheels backward (before mirroring)
        let wheels = motion_to_wheels(&cmd(0.0, 0.0, 0.5));
        assert_eq!(wheels, WheelFractions::new(0.5, 0.5, 0.5, 0.5));
    }

    #[test]
    fn test_normalization_bound_over_grid() {
        let steps = [-3.0f32, -1.5, -1.0, -0.4, 0.0, 0.25, 0.7, 1.0, 2.0, 5.0];
        for &x in &steps {
            for &y in &steps {
                for &r in &steps {
                    let wheels = motion_to_wheels(&cmd(x, y, r));
                    assert!(
                        wheels.max_magnitude() <= 1.0 + 1e-6,
                        "({}, {}, {}) -> {:?}",
                        x,
                        y,
                        r,
                        wheels
                    );

                    let raw_max = [x - y - r, x + y + r, x + y - r, x - y + r]
                        .iter()
                        .fold(0.0f32, |m, v| m.max(v.abs()));
                    if raw_max <= 1.0 {
                        assert_eq!(wheels.front_left, x + y + r);
                        assert_eq!(wheels.back_left, x - y + r);
                        assert_eq!(wheels.front_right, -(x - y - r));
                        assert_eq!(wheels.back_right, -(x + y - r));
                    }
                }
            }
        }
    }

    #[test]
    fn test_normalization_preserves_ratios() {
        let wheels = motion_to_wheels(&cmd(2.0, 1.0, 0.5));
        // raw: fr=0.5, fl=3.5, br=2.5, bl=1.5
        assert!((wheels.front_left - 1.0).abs() < 1e-6);
        assert!((wheels.back_right / wheels.front_left - (-2.5 / 3.5)).abs() < 1e-6);
        assert!((wheels.back_left / wheels.front_left - (1.5 / 3.5)).abs() < 1e-6);
    }

    #[test]
    fn test_deterministic() {
        let c = cmd(0.8, -1.3, 0.45);
        let first = motion_to_wheels(&c);
        for _ in 0..10 {
            assert_eq!(motion_to_wheels(&c), first);
        }
    }

    #[test]
    fn test_wheel_index_and_name_follow_dispatch_order() {
        let names = Wheel::ALL.map(Wheel::name);
        assert_eq!(names, ["front_right", "back_right", "back_left", "front_left"]);
        for (i, wheel) in Wheel::ALL.into_iter().enumerate() {
            assert_eq!(wheel.index(), i);
        }
    }

    #[test]
    fn test_dispatch_order_array() {
        let wheels = WheelFractions::new(1.0, 4.0, 2.0, 3.0);
        assert_eq!(wheels.as_array(), [1.0, 2.0, 3.0, 4.0]);
    }
}
