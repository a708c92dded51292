// Fixed-rate chassis loop with watchdogs
// Note: the watchdogs sit above the control pipeline. Stale keys bring the robot
// to rest through the normal pipeline; stale motor feedback means the tick cannot
// run at all, so zero current is sent instead.

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info, warn};

// local imports
use crate::chassis::{ChassisController, ControlFlags, CurrentCommand, MotorFeedback, PowerBudget};
use crate::config::{
    ChassisConfig, FEEDBACK_TIMEOUT, INPUT_TIMEOUT, LOOP_HZ, TOPIC_CURRENT, TOPIC_HEALTH,
    TOPIC_KEYS, TOPIC_MOTOR_FEEDBACK, TOPIC_POWER_LIMIT,
};
use crate::messages::{KeyInput, MotorFeedbackMsg, PowerLimitMsg, RuntimeHealth};

/// Errors that stop the runtime
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Zenoh error: {0}")]
    Zenoh(#[from] zenoh::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A sample together with the time it arrived
#[derive(Debug, Clone, Copy)]
struct Stamped<T> {
    value: T,
    received_at: Instant,
}

impl<T> Stamped<T> {
    fn fresh(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.received_at) <= timeout
    }
}

pub struct Runtime {
    chassis: ChassisController,
    latest_input: Option<Stamped<ControlFlags>>,
    latest_feedback: Option<Stamped<MotorFeedback>>,
    power_limit: Option<PowerBudget>,
    health: RuntimeHealth,
}

impl Runtime {
    pub fn new(config: ChassisConfig) -> Self {
        Self {
            chassis: ChassisController::new(config),
            latest_input: None,
            latest_feedback: None,
            power_limit: None,
            health: RuntimeHealth::FeedbackStale, // Start stale until first feedback
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn chassis(&self) -> &ChassisController {
        &self.chassis
    }

    /// Record operator keyboard state
    pub fn on_input(&mut self, flags: ControlFlags, now: Instant) {
        debug!("Received input: {:?}", flags);
        self.latest_input = Some(Stamped {
            value: flags,
            received_at: now,
        });
    }

    /// Record motor feedback
    pub fn on_feedback(&mut self, feedback: MotorFeedback, now: Instant) {
        self.latest_feedback = Some(Stamped {
            value: feedback,
            received_at: now,
        });
    }

    /// Record the referee power limit
    pub fn on_power_limit(&mut self, budget: PowerBudget) {
        if self.power_limit != Some(budget) {
            info!("Chassis power limit: {} W", budget.watts());
        }
        self.power_limit = Some(budget);
    }

    /// Budget for this tick: latest referee value, or the configured default
    pub fn power_budget(&self) -> PowerBudget {
        self.power_limit
            .unwrap_or(PowerBudget(self.chassis.config().default_power_limit))
    }

    /// Run one tick, including watchdog logic, and return the command to send
    pub fn compute_command(&mut self, now: Instant, dt: Duration) -> CurrentCommand {
        let feedback = match self.latest_feedback {
            Some(ref sample) if sample.fresh(now, FEEDBACK_TIMEOUT) => sample.value,
            _ => {
                // Watchdog triggered - cannot close the loop without feedback
                if self.health != RuntimeHealth::FeedbackStale {
                    warn!("Motor feedback stale, sending zero current");
                }
                self.health = RuntimeHealth::FeedbackStale;
                return CurrentCommand::zero();
            }
        };

        let input = match self.latest_input {
            Some(ref sample) if sample.fresh(now, INPUT_TIMEOUT) => {
                self.health = RuntimeHealth::Ok;
                sample.value
            }
            _ => {
                // Keep closing the loop, but towards standstill
                if self.health != RuntimeHealth::InputStale {
                    warn!("Operator input stale, holding chassis still");
                }
                self.health = RuntimeHealth::InputStale;
                ControlFlags::idle()
            }
        };

        let budget = self.power_budget();
        self.chassis.tick(&input, &feedback, budget, dt)
    }
}

pub async fn run(config: ChassisConfig) -> Result<(), RuntimeError> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_keys = session.declare_subscriber(TOPIC_KEYS).await?;
    let sub_feedback = session.declare_subscriber(TOPIC_MOTOR_FEEDBACK).await?;
    let sub_power = session.declare_subscriber(TOPIC_POWER_LIMIT).await?;
    let pub_current = session.declare_publisher(TOPIC_CURRENT).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut runtime = Runtime::new(config);
    let period = Duration::from_micros(1_000_000 / LOOP_HZ);
    let mut tick = interval(period);
    let mut last_tick = Instant::now();

    info!(
        "Runtime started: {}Hz loop, {}ms input timeout, {}ms feedback timeout",
        LOOP_HZ,
        INPUT_TIMEOUT.as_millis(),
        FEEDBACK_TIMEOUT.as_millis()
    );
    info!(
        "Subscribed to: {}, {}, {}",
        TOPIC_KEYS, TOPIC_MOTOR_FEEDBACK, TOPIC_POWER_LIMIT
    );
    info!("Publishing to: {}, {}", TOPIC_CURRENT, TOPIC_HEALTH);

    loop {
        tick.tick().await;
        let now = Instant::now();
        let dt = now.duration_since(last_tick);
        last_tick = now;

        // 1. Drain all pending samples (non-blocking), keep latest
        while let Ok(Some(sample)) = sub_keys.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<KeyInput>(&payload) {
                Ok(msg) => runtime.on_input(ControlFlags::from(&msg), now),
                Err(e) => warn!("Failed to parse key input: {}", e),
            }
        }
        while let Ok(Some(sample)) = sub_feedback.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<MotorFeedbackMsg>(&payload) {
                Ok(msg) => runtime.on_feedback(MotorFeedback::from(&msg), now),
                Err(e) => warn!("Failed to parse motor feedback: {}", e),
            }
        }
        while let Ok(Some(sample)) = sub_power.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<PowerLimitMsg>(&payload) {
                Ok(msg) => runtime.on_power_limit(PowerBudget::from(&msg)),
                Err(e) => warn!("Failed to parse power limit: {}", e),
            }
        }

        // 2. Compute current command (includes watchdog logic)
        let command = runtime.compute_command(now, dt);

        // 3. Dispatch all four currents as one message
        let command_json = serde_json::to_string(&command)?;
        pub_current.put(command_json).await?;

        // 4. Publish health
        let health_json = serde_json::to_string(&runtime.health())?;
        pub_health.put(health_json).await?;
    }
}
