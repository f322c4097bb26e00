//! Readings poll example
//!
//! `R503_PORT=/dev/ttyUSB0 cargo run --example poll_readings`

use std::thread;
use std::time::Duration;

use r503::{Config, Driver};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("r503=info".parse()?))
        .init();

    let config = match std::env::var("R503_PORT") {
        Ok(port) => Config::with_port(port),
        Err(_) => Config::default(),
    };

    let mut driver = Driver::new(config)?;
    println!("Polling {} (Ctrl-C to stop)", driver.port());

    loop {
        let readings = driver.readings();
        if readings.finger_detected || readings.error.is_some() {
            println!("{}", serde_json::to_string(&readings)?);
        }
        thread::sleep(Duration::from_millis(500));
    }
}
