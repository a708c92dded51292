// Drive control for the 4-wheel mecanum chassis
//
// Provides:
// - Keyboard flags -> motion command mapping
// - Mecanum inverse kinematics (motion command -> wheel fractions)
// - Per-wheel speed controller
// - Power governor against the referee power limit
// - The per-tick controller tying them together

pub mod controller;
pub mod governor;
pub mod input;
pub mod kinematics;
pub mod pid;

pub use controller::{ChassisController, CurrentCommand, MotorFeedback, TickTrace};
pub use governor::{govern, GovernorReport, PowerBudget, PowerModel};
pub use input::{map_motion, ControlFlags, MotionCommand, SpeedLevels, SpeedMode};
pub use kinematics::{motion_to_wheels, Wheel, WheelFractions};
pub use pid::{ControllerGains, ControllerState, SpeedPid, VelocityController};
