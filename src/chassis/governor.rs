// Chassis power governor
//
// Estimates electrical draw from the four controller outputs and scales all
// wheels by one common factor so the estimate fits the referee budget.
// Scaling wheels independently would change the heading of the robot.

use serde::{Deserialize, Serialize};

use super::kinematics::WheelFractions;

/// Maximum instantaneous chassis power in watts
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct PowerBudget(pub f32);

impl PowerBudget {
    pub fn watts(self) -> f32 {
        self.0
    }
}

/// Electrical model used for the estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerModel {
    /// Amps drawn by one motor at a power fraction of 1.0
    pub motor_current_max: f32,
    /// Nominal bus voltage
    pub bus_voltage: f32,
    /// Overestimate factor on the computed wattage (1.05 = +5%)
    pub margin: f32,
}

/// What the governor saw and did on one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GovernorReport {
    /// Margined wattage estimate before scaling
    pub estimated_watts: f32,
    /// Factor applied to all four wheels
    pub scale: f32,
}

/// Estimated draw in watts, margin included
pub fn estimate_watts(outputs: &WheelFractions, model: &PowerModel) -> f32 {
    let total: f32 = outputs.as_array().iter().map(|v| v.abs()).sum();
    let amps = total * model.motor_current_max;
    amps * model.bus_voltage * model.margin
}

/// Common scale factor for a given estimate and budget
///
/// This is `budget / estimated_watts` in both directions: a budget above the
/// estimate scales the outputs up. Falls back to 1.0 (no scaling) whenever the
/// ratio would be undefined or non-finite: no estimated draw, or no usable
/// budget.
pub fn scale_factor(estimated_watts: f32, budget: PowerBudget) -> f32 {
    let budget = budget.watts();
    if estimated_watts <= 0.0 || !estimated_watts.is_finite() {
        return 1.0;
    }
    if budget <= 0.0 || !budget.is_finite() {
        return 1.0;
    }

    let scale = budget / estimated_watts;
    if scale.is_finite() { scale } else { 1.0 }
}

/// Scale `outputs` in place so the estimated draw matches `budget`
///
/// No clamp to [-1.0, 1.0] is applied afterwards.
pub fn govern(
    outputs: &mut WheelFractions,
    budget: PowerBudget,
    model: &PowerModel,
) -> GovernorReport {
    let estimated_watts = estimate_watts(outputs, model);
    let scale = scale_factor(estimated_watts, budget);
    outputs.scale(scale);

    GovernorReport {
        estimated_watts,
        scale,
    }
}
