//! Snapshotting the engine into a [`TelemetryPayload`].

use std::fmt::Display;

use chrono::{DateTime, TimeZone};
use datalogger_types::fault::{NO_FAULT_DESCRIPTION, NO_FAULT_DTC, NO_FAULT_FMI, NO_FAULT_SPN};
use datalogger_types::{ActiveFault, EngineState, StorageCard, TelemetryPayload};

use crate::config::DeviceConfig;

/// Timestamp layout used by the AP550 firmware, e.g. `17-01-2024 09:00:00 AM`.
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %I:%M:%S %p";

/// The firmware reports oil pressure in kPa; the engine model works in bar.
const KPA_PER_BAR: f64 = 100.0;

/// Round `value` to `decimals` places.
fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Whole-number rpm for the wire.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_rpm(rpm: f64) -> u32 {
    // Clamped to the u32 range first, so the cast cannot wrap.
    rpm.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Build the payload for one tick.
///
/// Pure: the same inputs always give the same payload. Numeric channels
/// are rounded to one or two decimals; rpm to a whole number.
pub fn build_payload<Tz>(
    state: &EngineState,
    fault: Option<&ActiveFault>,
    storage: &StorageCard,
    device: &DeviceConfig,
    now: &DateTime<Tz>,
    timezone_label: &str,
) -> TelemetryPayload
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let (engine_dtc, fault_spn, fault_fmi, fault_desc) = fault.map_or_else(
        || {
            (
                NO_FAULT_DTC.to_owned(),
                NO_FAULT_SPN,
                NO_FAULT_FMI,
                NO_FAULT_DESCRIPTION.to_owned(),
            )
        },
        |active| {
            (
                active.dtc(),
                active.code.spn(),
                active.code.fmi(),
                active.code.description().to_owned(),
            )
        },
    );

    TelemetryPayload {
        device_id: device.device_id.clone(),
        machine_type: device.machine_type.clone(),
        machine_model: device.machine_model.clone(),
        firmware_version: device.firmware_version.clone(),
        machine_version: device.machine_version.clone(),
        vin: device.vin.clone(),
        lat: device.latitude.clone(),
        lon: device.longitude.clone(),

        sd_free_mb: round_to(storage.free_mb, 1),
        sd_free_pc: storage.free_percent(),

        engine_status: state.status_label().to_owned(),
        engine_rpm: whole_rpm(state.rpm),
        fuel_level: round_to(state.fuel_level, 1),
        def_level: round_to(state.def_level, 1),
        coolant_temp: round_to(state.coolant_temp, 1),
        oil_temp: round_to(state.oil_temp, 1),
        oil_pressure: round_to(state.oil_pressure * KPA_PER_BAR, 1),
        exhaust_temp: round_to(state.exhaust_temp, 1),
        boost: round_to(state.boost, 2),
        load: round_to(state.load, 2),
        torque: round_to(state.torque, 1),
        battery: round_to(state.battery_voltage, 2),
        alternator: round_to(state.alternator_voltage, 2),
        vibration: round_to(state.vibration, 2),
        wif: state.water_in_fuel_flag(),

        engine_h: round_to(state.engine_hours, 2),
        idle_h: round_to(state.idle_hours, 2),
        work_h: round_to(state.work_hours, 2),
        travel_h: round_to(state.travel_hours, 2),
        vibration_h: round_to(state.vibration_hours, 2),
        heating_h: round_to(state.heating_hours, 2),
        tamper_h: round_to(state.tamper_hours, 2),

        engine_dtc,
        ttc_dtc: NO_FAULT_DTC.to_owned(),
        fault_spn,
        fault_fmi,
        fault_desc,

        time: now.format(TIMESTAMP_FORMAT).to_string(),
        timezone: timezone_label.to_owned(),
    }
}
