//! One-tick composition of run toggling, physics, and faults.
//!
//! Each call to [`EngineSimulator::step`] runs, in order:
//!
//! 1. **Toggle** -- [`RUN_TOGGLE_PROBABILITY`] chance of starting or
//!    stopping the engine.
//! 2. **Advance** -- [`advance_state`] for one tick.
//! 3. **Fault roll** -- maybe raise a fault if none is active.
//! 4. **Fault effect** -- apply the active fault and count it down.
//!
//! Every tick also logs one record to the SD card.
//!
//! The random source is a type parameter so tests can run the simulator
//! from a fixed seed.
//!
//! [`advance_state`]: crate::physics::advance_state

use std::time::Duration;

use datalogger_types::{ActiveFault, EngineState, FaultCode, StorageCard};
use rand::Rng;

use crate::fault::FaultInjector;
use crate::physics;

/// Per-tick chance of flipping the running flag.
pub const RUN_TOGGLE_PROBABILITY: f64 = 0.005;

/// Bytes the logger writes to its SD card for one record.
pub const SD_BYTES_PER_TICK: u32 = 1024;

/// What happened during a single tick, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// 1-based tick number.
    pub tick: u64,
    /// The engine started on this tick.
    pub started: bool,
    /// The engine stopped on this tick.
    pub stopped: bool,
    /// A fault was raised on this tick.
    pub fault_raised: Option<ActiveFault>,
    /// A fault cleared at the end of this tick.
    pub fault_cleared: Option<FaultCode>,
}

/// Owns the engine state and advances it one tick at a time.
#[derive(Debug)]
pub struct EngineSimulator<R> {
    state: EngineState,
    faults: FaultInjector,
    storage: StorageCard,
    rng: R,
    tick_duration: Duration,
    ticks: u64,
}

impl<R: Rng> EngineSimulator<R> {
    /// Create a simulator starting from `state`.
    pub fn new(state: EngineState, tick_duration: Duration, rng: R) -> Self {
        Self {
            state,
            faults: FaultInjector::new(),
            storage: StorageCard::default(),
            rng,
            tick_duration,
            ticks: 0,
        }
    }

    /// Current engine state.
    pub const fn state(&self) -> &EngineState {
        &self.state
    }

    /// Currently active fault, if any.
    pub const fn active_fault(&self) -> Option<&ActiveFault> {
        self.faults.active()
    }

    /// SD card free-space state.
    pub const fn storage(&self) -> &StorageCard {
        &self.storage
    }

    /// Fault injector, for inspection.
    pub const fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    /// Mutable access to the fault injector, used to force a fault.
    pub const fn faults_mut(&mut self) -> &mut FaultInjector {
        &mut self.faults
    }

    /// Ticks completed so far.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Length of one simulated tick.
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Advance the engine by one tick.
    pub fn step(&mut self) -> TickReport {
        self.ticks = self.ticks.saturating_add(1);
        let mut report = TickReport {
            tick: self.ticks,
            ..TickReport::default()
        };

        if self.rng.random_bool(RUN_TOGGLE_PROBABILITY) {
            self.state.running = !self.state.running;
            report.started = self.state.running;
            report.stopped = !self.state.running;
        }

        self.state = physics::advance_state(&self.state, self.tick_duration, &mut self.rng);

        report.fault_raised = self.faults.roll(&mut self.rng);
        report.fault_cleared = self.faults.apply(&mut self.state);
        self.storage.record(SD_BYTES_PER_TICK);

        report
    }
}
