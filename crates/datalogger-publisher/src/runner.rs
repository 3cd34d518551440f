//! The working-hours publish loop.
//!
//! The loop is a two-state machine:
//!
//! - **Active** -- the gate is open. Advance the engine, build the payload,
//!   publish it, persist the hour meter, sleep one interval, and check the
//!   gate again.
//! - **Stopped** -- the gate closed. Persist once more and return. There is
//!   no way back to Active within one process.
//!
//! The gate is checked before any work on every iteration, and the counter
//! is only written after a publish was accepted. A failed publish is logged
//! and skipped; nothing is retried.

use std::future::Future;
use std::time::Duration;

use datalogger_core::config::DeviceConfig;
use datalogger_core::payload::build_payload;
use datalogger_core::schedule::{WallClock, WorkingHours};
use datalogger_core::simulator::{EngineSimulator, TickReport};
use datalogger_core::store::CounterStore;
use rand::Rng;
use tracing::{info, warn};

use crate::error::PublisherError;

/// Destination for serialized telemetry.
pub trait TelemetrySink {
    /// Deliver one JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError`] if the payload could not be handed to the
    /// transport.
    fn publish(&self, json: String) -> impl Future<Output = Result<(), PublisherError>> + Send;
}

/// State of the publish loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Inside the working window, publishing every interval.
    Active,
    /// Outside the working window. Terminal.
    Stopped,
}

/// Outcome of a complete run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Payloads accepted by the sink.
    pub published: u64,
    /// Payloads the sink rejected.
    pub failed: u64,
    /// Hour meter at shutdown.
    pub engine_hours: f64,
}

/// Static inputs of the loop that come from configuration.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Working window checked before every tick.
    pub working_hours: WorkingHours,
    /// Identity copied into every payload.
    pub device: DeviceConfig,
    /// Timezone label copied into every payload.
    pub timezone_label: String,
    /// Wall-clock sleep between ticks. Zero disables sleeping.
    pub interval: Duration,
}

/// Drives one simulator through the working-hours loop.
#[derive(Debug)]
pub struct TelemetryLoop<S, C, R> {
    sink: S,
    clock: C,
    store: CounterStore,
    simulator: EngineSimulator<R>,
    settings: LoopSettings,
    state: LoopState,
}

impl<S, C, R> TelemetryLoop<S, C, R>
where
    S: TelemetrySink,
    C: WallClock,
    R: Rng,
{
    /// Assemble a loop in the [`LoopState::Active`] state.
    pub const fn new(
        sink: S,
        clock: C,
        store: CounterStore,
        simulator: EngineSimulator<R>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            sink,
            clock,
            store,
            simulator,
            settings,
            state: LoopState::Active,
        }
    }

    /// Current loop state.
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// The simulator being driven.
    pub const fn simulator(&self) -> &EngineSimulator<R> {
        &self.simulator
    }

    /// Give the sink back, e.g. to disconnect it.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run until the gate closes.
    ///
    /// Returns immediately (after a final persist) if already stopped.
    pub async fn run(&mut self) -> RunSummary {
        let mut summary = RunSummary {
            published: 0,
            failed: 0,
            engine_hours: self.simulator.state().engine_hours,
        };

        info!(
            window_start = %self.settings.working_hours.start(),
            window_end = %self.settings.working_hours.end(),
            interval_secs = self.settings.interval.as_secs(),
            "Telemetry loop starting"
        );

        while self.state == LoopState::Active {
            let now = self.clock.now();
            if !self.settings.working_hours.gate_at(&now) {
                info!(now = %now, "Outside working hours, stopping");
                self.state = LoopState::Stopped;
                break;
            }

            let report = self.simulator.step();
            log_tick_report(&report);

            let payload = build_payload(
                self.simulator.state(),
                self.simulator.active_fault(),
                self.simulator.storage(),
                &self.settings.device,
                &now,
                &self.settings.timezone_label,
            );

            let delivered = match payload.to_json() {
                Ok(json) => self.sink.publish(json).await,
                Err(e) => Err(PublisherError::from(e)),
            };

            match delivered {
                Ok(()) => {
                    summary.published = summary.published.saturating_add(1);
                    info!(
                        tick = report.tick,
                        engine_status = payload.engine_status,
                        rpm = payload.engine_rpm,
                        coolant = payload.coolant_temp,
                        engine_h = payload.engine_h,
                        dtc = payload.engine_dtc,
                        "Telemetry published"
                    );
                    self.persist();
                }
                Err(e) => {
                    summary.failed = summary.failed.saturating_add(1);
                    warn!(tick = report.tick, error = %e, "Telemetry publish failed, skipping tick");
                }
            }

            if !self.settings.interval.is_zero() {
                tokio::time::sleep(self.settings.interval).await;
            }
        }

        self.persist();
        summary.engine_hours = self.simulator.state().engine_hours;
        info!(
            published = summary.published,
            failed = summary.failed,
            engine_hours = summary.engine_hours,
            "Telemetry loop stopped"
        );
        summary
    }

    /// Write the hour meter; failures are logged and otherwise ignored.
    fn persist(&self) {
        let hours = self.simulator.state().engine_hours;
        if let Err(e) = self.store.save(hours) {
            warn!(path = %self.store.path().display(), error = %e, "Failed to persist engine hours");
        }
    }
}

/// Log engine and fault transitions from one tick.
fn log_tick_report(report: &TickReport) {
    if report.started {
        info!(tick = report.tick, "Engine started");
    }
    if report.stopped {
        info!(tick = report.tick, "Engine stopped");
    }
    if let Some(fault) = report.fault_raised {
        warn!(
            tick = report.tick,
            spn = fault.code.spn(),
            fmi = fault.code.fmi(),
            duration_ticks = fault.remaining_ticks,
            description = fault.code.description(),
            "Fault raised"
        );
    }
    if let Some(code) = report.fault_cleared {
        info!(tick = report.tick, spn = code.spn(), fmi = code.fmi(), "Fault cleared");
    }
}
