//! The telemetry record published every tick.
//!
//! [`TelemetryPayload`] is a flat JSON object. It carries every key the
//! AP550 ESP32 firmware sends, spelled and scaled the way the firmware does
//! (oil pressure in kPa), plus extra engine channels and fault details that
//! the firmware does not define. Those extras use lower snake case.

use serde::{Deserialize, Serialize};

/// Immutable snapshot of the engine, the active fault, and the device
/// identity at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    /// Datalogger identifier.
    #[serde(rename = "Device_ID")]
    pub device_id: String,
    /// Machine family.
    pub machine_type: String,
    /// Machine model.
    pub machine_model: String,
    /// Datalogger firmware version.
    #[serde(rename = "ESP_firmware")]
    pub firmware_version: String,
    /// Machine software version.
    pub machine_version: String,
    /// Vehicle identification number.
    #[serde(rename = "Vin_number")]
    pub vin: String,
    /// Latitude of the installation, as sent by the firmware.
    pub lat: String,
    /// Longitude of the installation, as sent by the firmware.
    pub lon: String,

    /// Free space on the SD card, MB.
    pub sd_free_mb: f64,
    /// Free space on the SD card, whole percent.
    pub sd_free_pc: u8,

    /// `"ON"` or `"OFF"`.
    #[serde(rename = "Engine_status")]
    pub engine_status: String,
    /// Engine speed, whole rpm.
    #[serde(rename = "Engine_rpm")]
    pub engine_rpm: u32,
    /// Fuel level, percent.
    pub fuel_level: f64,
    /// DEF/AdBlue level, percent.
    pub def_level: f64,
    /// Coolant temperature, degrees Celsius.
    #[serde(rename = "Coolant_temp")]
    pub coolant_temp: f64,
    /// Oil temperature, degrees Celsius.
    pub oil_temp: f64,
    /// Oil pressure, kPa.
    #[serde(rename = "oil_Pressure")]
    pub oil_pressure: f64,
    /// Exhaust gas temperature, degrees Celsius.
    pub exhaust_temp: f64,
    /// Boost pressure, bar.
    pub boost: f64,
    /// Load fraction.
    pub load: f64,
    /// Torque, newton-metres.
    pub torque: f64,
    /// Battery voltage.
    pub battery: f64,
    /// Alternator voltage.
    pub alternator: f64,
    /// Vibration index.
    pub vibration: f64,
    /// Water-in-fuel flag, `0` or `1`.
    pub wif: u8,

    /// Engine hour meter.
    pub engine_h: f64,
    /// Idle hours.
    pub idle_h: f64,
    /// Working hours.
    pub work_h: f64,
    /// Travel hours.
    pub travel_h: f64,
    /// Hours above the vibration alarm level.
    pub vibration_h: f64,
    /// Hours with a hot engine.
    pub heating_h: f64,
    /// Tamper hours.
    pub tamper_h: f64,

    /// `SPN/FMI/OC` of the active fault, or `"0/0/0"`.
    pub engine_dtc: String,
    /// Transmission controller DTC. Always `"0/0/0"`; no transmission is
    /// simulated.
    pub ttc_dtc: String,
    /// SPN of the active fault, or 0.
    pub fault_spn: u32,
    /// FMI of the active fault, or 0.
    pub fault_fmi: u8,
    /// Description of the active fault, or `"No Fault"`.
    pub fault_desc: String,

    /// Local timestamp, `dd-mm-YYYY hh:mm:ss AM`.
    pub time: String,
    /// Timezone the timestamp is expressed in.
    pub timezone: String,
}

impl TelemetryPayload {
    /// Serialize to the JSON text published on the wire.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
