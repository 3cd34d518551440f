//! Shared type definitions for the AP550 datalogger simulator.
//!
//! Everything here is plain data: the virtual engine record, the fault
//! catalog, and the flat telemetry payload that goes out over MQTT. The
//! behaviour that mutates these types lives in `datalogger-core`.
//!
//! # Modules
//!
//! - [`engine`] -- [`EngineState`], the single mutable engine record
//! - [`fault`] -- [`FaultCode`] catalog and the [`ActiveFault`] countdown
//! - [`payload`] -- [`TelemetryPayload`], the per-tick wire snapshot
//! - [`storage`] -- [`StorageCard`], free space on the logger's SD card

pub mod engine;
pub mod fault;
pub mod payload;
pub mod storage;

pub use engine::EngineState;
pub use fault::{ActiveFault, FaultCode};
pub use payload::TelemetryPayload;
pub use storage::StorageCard;
