//! The virtual engine record.
//!
//! [`EngineState`] holds every sensor the datalogger reports. It is created
//! once at startup from [`EngineState::default`], optionally has its
//! `engine_hours` restored from disk, and is then advanced in place once per
//! tick by the simulator.

use serde::{Deserialize, Serialize};

/// Engine hours reported when no persisted counter is available.
pub const DEFAULT_ENGINE_HOURS: f64 = 300.0;

/// Baselines of the secondary hour counters at startup.
pub const DEFAULT_IDLE_HOURS: f64 = 100.0;
/// See [`DEFAULT_IDLE_HOURS`].
pub const DEFAULT_WORK_HOURS: f64 = 150.0;
/// See [`DEFAULT_IDLE_HOURS`].
pub const DEFAULT_TRAVEL_HOURS: f64 = 100.0;
/// See [`DEFAULT_IDLE_HOURS`].
pub const DEFAULT_VIBRATION_HOURS: f64 = 50.0;
/// See [`DEFAULT_IDLE_HOURS`].
pub const DEFAULT_HEATING_HOURS: f64 = 30.0;
/// See [`DEFAULT_IDLE_HOURS`].
pub const DEFAULT_TAMPER_HOURS: f64 = 50.0;

/// Mutable state of the simulated diesel engine.
///
/// Units: rpm, percent for tank levels, degrees Celsius for temperatures,
/// bar for pressures, newton-metres for torque, volts for electrical values,
/// and hours for the hour meter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    /// Whether the engine is currently running.
    pub running: bool,
    /// Crankshaft speed.
    pub rpm: f64,
    /// Fuel tank level, 0-100 %.
    pub fuel_level: f64,
    /// DEF/AdBlue tank level, 0-100 %.
    pub def_level: f64,
    /// Coolant temperature.
    pub coolant_temp: f64,
    /// Oil temperature.
    pub oil_temp: f64,
    /// Oil gallery pressure.
    pub oil_pressure: f64,
    /// Exhaust gas temperature.
    pub exhaust_temp: f64,
    /// Turbo boost pressure.
    pub boost: f64,
    /// Engine load as a fraction of rated load.
    pub load: f64,
    /// Output torque.
    pub torque: f64,
    /// Battery terminal voltage.
    pub battery_voltage: f64,
    /// Alternator output voltage.
    pub alternator_voltage: f64,
    /// Dimensionless vibration index.
    pub vibration: f64,
    /// Cumulative running hours. Never decreases.
    pub engine_hours: f64,

    /// Running hours spent in the idle load band.
    pub idle_hours: f64,
    /// Running hours spent in the working load band.
    pub work_hours: f64,
    /// Running hours spent in the travel (high load) band.
    pub travel_hours: f64,
    /// Running hours with the vibration index at or above the alarm level.
    pub vibration_hours: f64,
    /// Running hours with the coolant at or above the hot threshold.
    pub heating_hours: f64,
    /// Hours the enclosure tamper switch was open. Not simulated, only reported.
    pub tamper_hours: f64,
    /// Water-in-fuel sensor latched.
    pub water_in_fuel: bool,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            running: true,
            rpm: 800.0,
            fuel_level: 80.0,
            def_level: 70.0,
            coolant_temp: 60.0,
            oil_temp: 55.0,
            oil_pressure: 2.9,
            exhaust_temp: 300.0,
            boost: 0.0,
            load: 0.364,
            torque: 0.0,
            battery_voltage: 12.6,
            alternator_voltage: 13.8,
            vibration: 0.5,
            engine_hours: DEFAULT_ENGINE_HOURS,
            idle_hours: DEFAULT_IDLE_HOURS,
            work_hours: DEFAULT_WORK_HOURS,
            travel_hours: DEFAULT_TRAVEL_HOURS,
            vibration_hours: DEFAULT_VIBRATION_HOURS,
            heating_hours: DEFAULT_HEATING_HOURS,
            tamper_hours: DEFAULT_TAMPER_HOURS,
            water_in_fuel: false,
        }
    }
}

impl EngineState {
    /// Create a default engine whose hour meter starts at `engine_hours`.
    pub fn with_engine_hours(engine_hours: f64) -> Self {
        Self {
            engine_hours,
            ..Self::default()
        }
    }

    /// Water-in-fuel flag as the firmware sends it (`0` / `1`).
    pub fn water_in_fuel_flag(&self) -> u8 {
        u8::from(self.water_in_fuel)
    }

    /// Status string used on the wire (`"ON"` / `"OFF"`).
    pub const fn status_label(&self) -> &'static str {
        if self.running { "ON" } else { "OFF" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_engine_is_running_at_idle() {
        let state = EngineState::default();
        assert!(state.running);
        assert!((state.rpm - 800.0).abs() < f64::EPSILON);
        assert!((state.engine_hours - DEFAULT_ENGINE_HOURS).abs() < f64::EPSILON);
        assert_eq!(state.status_label(), "ON");
        assert_eq!(state.water_in_fuel_flag(), 0);
    }

    #[test]
    fn secondary_counters_start_at_baseline() {
        let state = EngineState::with_engine_hours(5.0);
        assert!((state.idle_hours - DEFAULT_IDLE_HOURS).abs() < f64::EPSILON);
        assert!((state.work_hours - DEFAULT_WORK_HOURS).abs() < f64::EPSILON);
        assert!((state.tamper_hours - DEFAULT_TAMPER_HOURS).abs() < f64::EPSILON);
        assert!(!state.water_in_fuel);
    }

    #[test]
    fn restored_hours_keep_other_defaults() {
        let state = EngineState::with_engine_hours(1234.5);
        assert!((state.engine_hours - 1234.5).abs() < f64::EPSILON);
        assert!((state.fuel_level - EngineState::default().fuel_level).abs() < f64::EPSILON);
    }

    #[test]
    fn stopped_engine_reports_off() {
        let state = EngineState {
            running: false,
            ..EngineState::default()
        };
        assert_eq!(state.status_label(), "OFF");
    }
}
