//! Engine simulation core for the AP550 datalogger simulator.
//!
//! This crate owns everything that happens inside one tick except the
//! network send: advancing the virtual engine, injecting faults, deciding
//! whether the working-hours window is open, building the wire payload, and
//! persisting the hour meter.
//!
//! # Modules
//!
//! - [`config`] -- Typed configuration with defaults for every tunable.
//! - [`fault`] -- [`FaultInjector`]: stochastic activation, per-tick side
//!   effects, countdown.
//! - [`payload`] -- [`build_payload`], the pure snapshot function.
//! - [`physics`] -- [`advance_state`] and the physical bounds.
//! - [`schedule`] -- [`WorkingHours`] gate and the local wall clock.
//! - [`simulator`] -- [`EngineSimulator`], which composes the above per tick.
//! - [`store`] -- [`CounterStore`], the one-field engine-hours file.
//!
//! [`FaultInjector`]: fault::FaultInjector
//! [`build_payload`]: payload::build_payload
//! [`advance_state`]: physics::advance_state
//! [`WorkingHours`]: schedule::WorkingHours
//! [`EngineSimulator`]: simulator::EngineSimulator
//! [`CounterStore`]: store::CounterStore

pub mod config;
pub mod fault;
pub mod payload;
pub mod physics;
pub mod schedule;
pub mod simulator;
pub mod store;
