//! Step-wise enrollment example
//!
//! Drives the same command batches a host would send, one step at a time.
//!
//! `cargo run --example enroll -- 5`

use std::io::{self, BufRead};

use r503::{Config, Driver, EnrollmentState};
use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;

fn run(driver: &mut Driver, commands: Value) -> anyhow::Result<Map<String, Value>> {
    let Value::Object(commands) = commands else {
        anyhow::bail!("a batch must be an object");
    };

    let reply = driver.do_command(&commands)?;
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(reply)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("r503=info".parse()?))
        .init();

    let slot: u16 = std::env::args().nth(1).unwrap_or_else(|| "1".into()).parse()?;
    let port = std::env::var("R503_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());

    let mut driver = Driver::new(Config::with_port(port))?;
    let mut lines = io::stdin().lock().lines();

    run(&mut driver, json!({"start_enrollment": slot}))?;

    loop {
        while driver.enrollment().state() != EnrollmentState::ScansCaptured {
            if let Some(step) = driver.enrollment().step() {
                println!("Place finger for scan {} and press enter", step.number());
            }
            lines.next();
            run(&mut driver, json!({"capture": true}))?;
        }

        let reply = run(&mut driver, json!({"create_model": true}))?;
        if driver.enrollment().state() == EnrollmentState::ModelReady {
            break;
        }
        if !reply.contains_key("rescan_required") {
            anyhow::bail!("model creation failed");
        }
        println!("Scans did not match, starting over");
        run(&mut driver, json!({"reset_enrollment": true, "start_enrollment": slot}))?;
    }

    run(&mut driver, json!({"store_model": slot, "count_templates": true}))?;
    driver.close();

    Ok(())
}
