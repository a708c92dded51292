// Keyboard teleop: WASD move, Q/E rotate, hold SHIFT (capital letters) for slow walk, Esc quit
//
// Publishes the raw keyboard bitmask the chassis runtime expects on its key topic.
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use mecanum_chassis_runtime::chassis::input::{KEY_A, KEY_D, KEY_E, KEY_Q, KEY_S, KEY_SHIFT, KEY_W};
use mecanum_chassis_runtime::config::TOPIC_KEYS;
use mecanum_chassis_runtime::messages::KeyInput;
use std::time::{Duration, Instant};
use tracing::info;

// Terminals report key repeats, not releases; a key counts as held for this long after its last event
const HOLD_TIMEOUT_MS: u64 = 150;

#[derive(Parser, Debug)]
#[command(about = "Publish keyboard state for the mecanum chassis runtime")]
struct Args {
    /// Topic to publish key bits on
    #[arg(long, default_value = TOPIC_KEYS)]
    topic: String,

    /// Publish rate in Hz
    #[arg(long, default_value_t = 50)]
    rate_hz: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(args.topic.clone()).await?;

    info!("Controls: WASD=move, Q/E=rotate, SHIFT=slow walk, Esc=quit");
    info!("Publishing to: {}", args.topic);

    enable_raw_mode()?;
    let result = run_teleop(&publisher, args.rate_hz).await;
    disable_raw_mode()?;

    result
}

fn key_bit(code: KeyCode) -> Option<u16> {
    match code {
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'w' => Some(KEY_W),
            's' => Some(KEY_S),
            'a' => Some(KEY_A),
            'd' => Some(KEY_D),
            'q' => Some(KEY_Q),
            'e' => Some(KEY_E),
            _ => None,
        },
        _ => None,
    }
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
    rate_hz: u64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let poll = Duration::from_millis(1000 / rate_hz.max(1));
    let hold = Duration::from_millis(HOLD_TIMEOUT_MS);

    // Last time each key (and shift) was seen
    let mut last_seen: [Option<Instant>; 16] = [None; 16];

    loop {
        if event::poll(poll)? {
            if let Event::Key(KeyEvent {
                code,
                kind,
                modifiers,
                ..
            }) = event::read()?
            {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                if code == KeyCode::Esc {
                    break;
                }

                if pressed {
                    if let Some(bit) = key_bit(code) {
                        let now = Instant::now();
                        last_seen[bit.trailing_zeros() as usize] = Some(now);

                        let shifted = modifiers.contains(KeyModifiers::SHIFT)
                            || matches!(code, KeyCode::Char(c) if c.is_ascii_uppercase());
                        if shifted {
                            last_seen[KEY_SHIFT.trailing_zeros() as usize] = Some(now);
                        }
                    }
                }
            }
        }

        let key_bits = last_seen
            .iter()
            .enumerate()
            .filter(|(_, seen)| seen.is_some_and(|t| t.elapsed() <= hold))
            .fold(0u16, |bits, (i, _)| bits | (1 << i));

        let msg = KeyInput { key_bits };
        publisher.put(serde_json::to_string(&msg)?).await?;
    }

    Ok(())
}
