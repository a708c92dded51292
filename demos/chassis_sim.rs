// Simulated chassis: stands in for the four ESCs and the referee system
//
// Subscribes to current commands, integrates a first-order motor model per wheel,
// and publishes rotor speed feedback plus a fixed chassis power limit.
//
// Usage: cargo run --example chassis_sim -- --power-limit 80
use clap::Parser;
use mecanum_chassis_runtime::chassis::CurrentCommand;
use mecanum_chassis_runtime::config::{
    ChassisConfig, TOPIC_CURRENT, TOPIC_MOTOR_FEEDBACK, TOPIC_POWER_LIMIT,
};
use mecanum_chassis_runtime::messages::{MotorFeedbackMsg, PowerLimitMsg};
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

// Referee reports the power limit at roughly this rate
const REFEREE_HZ: u64 = 10;

#[derive(Parser, Debug)]
#[command(about = "Simulated motors and referee for the mecanum chassis runtime")]
struct Args {
    /// Chassis power limit reported by the simulated referee (W)
    #[arg(long, default_value_t = 60)]
    power_limit: u16,

    /// Feedback publish rate in Hz
    #[arg(long, default_value_t = 1000)]
    rate_hz: u64,

    /// Motor speed time constant in milliseconds
    #[arg(long, default_value_t = 80.0)]
    time_constant_ms: f32,
}

/// Rotor speed of one motor under a first-order response to commanded current
#[derive(Debug, Clone, Copy, Default)]
struct SimMotor {
    rotor_rpm: f32,
}

impl SimMotor {
    fn step(&mut self, current: i16, free_rpm: f32, current_scale: f32, tau: f32, dt: f32) {
        let target = f32::from(current) / current_scale * free_rpm;
        self.rotor_rpm += (target - self.rotor_rpm) * (dt / tau).min(1.0);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let config = ChassisConfig::default();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let sub_current = session.declare_subscriber(TOPIC_CURRENT).await?;
    let pub_feedback = session.declare_publisher(TOPIC_MOTOR_FEEDBACK).await?;
    let pub_power = session.declare_publisher(TOPIC_POWER_LIMIT).await?;

    // Rotor speed reached at full current with no load
    let free_rpm = config.max_wheel_rpm / config.reduction_ratio;
    let tau = args.time_constant_ms / 1000.0;
    let rate_hz = args.rate_hz.max(1);
    let dt = 1.0 / rate_hz as f32;
    let referee_every = (rate_hz / REFEREE_HZ).max(1);

    let mut motors = [SimMotor::default(); 4];
    let mut command = CurrentCommand::zero();
    let mut tick = interval(Duration::from_micros(1_000_000 / rate_hz));
    let mut count: u64 = 0;

    info!(
        "Simulating chassis: {}Hz feedback, {} W power limit, free speed {:.0} rotor rpm",
        rate_hz, args.power_limit, free_rpm
    );

    loop {
        tick.tick().await;

        while let Ok(Some(sample)) = sub_current.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<CurrentCommand>(&payload) {
                Ok(cmd) => command = cmd,
                Err(e) => warn!("Failed to parse current command: {}", e),
            }
        }

        for (motor, current) in motors.iter_mut().zip(command.as_array()) {
            motor.step(current, free_rpm, config.current_scale, tau, dt);
        }

        let feedback = MotorFeedbackMsg {
            rotor_rpm: motors.map(|m| m.rotor_rpm.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16),
        };
        pub_feedback.put(serde_json::to_string(&feedback)?).await?;

        if count % referee_every == 0 {
            let limit = PowerLimitMsg {
                chassis_power_limit: args.power_limit,
            };
            pub_power.put(serde_json::to_string(&limit)?).await?;
        }
        count += 1;
    }
}
