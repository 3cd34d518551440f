//! Datalogger publisher binary for the AP550 engine simulator.
//!
//! Simulates one diesel engine and publishes its telemetry as flat JSON to an
//! MQTT topic every interval, but only during working hours. When the
//! working window closes the process persists the hour meter, disconnects,
//! and exits.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `datalogger-config.yaml`, or use defaults
//! 3. Build the working-hours gate and the local clock
//! 4. Restore the engine-hours counter
//! 5. Create the engine simulator
//! 6. Start the MQTT client
//! 7. Run the publish loop until the gate closes
//! 8. Disconnect and log the result

mod error;
mod mqtt;
mod runner;

use std::path::Path;

use datalogger_core::config::DataloggerConfig;
use datalogger_core::schedule::LocalClock;
use datalogger_core::simulator::EngineSimulator;
use datalogger_core::store::CounterStore;
use datalogger_types::EngineState;
use datalogger_types::engine::DEFAULT_ENGINE_HOURS;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::mqtt::MqttPublisher;
use crate::runner::{LoopSettings, TelemetryLoop};

/// Configuration file looked up in the working directory.
const CONFIG_PATH: &str = "datalogger-config.yaml";

/// Application entry point for the datalogger publisher.
///
/// # Errors
///
/// Returns an error if the configuration file exists but is invalid.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("datalogger-publisher starting");

    // 2. Load configuration.
    let config = DataloggerConfig::load_or_default(Path::new(CONFIG_PATH))?;
    info!(
        broker = config.broker.host,
        port = config.broker.port,
        topic = config.broker.topic,
        device_id = config.device.device_id,
        interval_secs = config.schedule.publish_interval_secs,
        timezone = config.schedule.timezone_label,
        "Configuration loaded"
    );

    // 3. Working-hours gate and clock.
    let working_hours = config.schedule.working_hours()?;
    let clock = LocalClock::new(config.schedule.utc_offset()?);

    // 4. Restore the hour meter.
    let store = CounterStore::new(config.persistence.state_file.clone());
    let engine_hours = store.load_or(DEFAULT_ENGINE_HOURS);

    // 5. Engine simulator.
    let simulator = EngineSimulator::new(
        EngineState::with_engine_hours(engine_hours),
        config.schedule.interval(),
        rand::rng(),
    );

    // 6. MQTT client.
    let publisher = MqttPublisher::connect(&config.broker);
    info!(topic = publisher.topic(), "MQTT client started");

    // 7. Publish until the working window closes.
    let settings = LoopSettings {
        working_hours,
        device: config.device.clone(),
        timezone_label: config.schedule.timezone_label.clone(),
        interval: config.schedule.interval(),
    };
    let mut telemetry = TelemetryLoop::new(publisher, clock, store, simulator, settings);
    let summary = telemetry.run().await;
    info!(
        state = ?telemetry.state(),
        ticks = telemetry.simulator().ticks(),
        "Publish loop finished"
    );

    // 8. Disconnect and report.
    if let Err(e) = telemetry.into_sink().disconnect().await {
        warn!(error = %e, "MQTT disconnect failed");
    }

    info!(
        published = summary.published,
        failed = summary.failed,
        engine_hours = summary.engine_hours,
        "datalogger-publisher finished"
    );

    Ok(())
}
