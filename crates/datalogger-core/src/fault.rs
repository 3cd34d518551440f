//! Stochastic fault injection.
//!
//! With no fault active, each tick has a [`FAULT_PROBABILITY`] chance of
//! raising one catalog fault, chosen uniformly, for a random number of ticks.
//! While active the fault's side effect is reapplied every tick and its
//! countdown drops by one; at zero it clears and the payload falls back to
//! the no-fault sentinel. At most one fault is ever active.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use datalogger_types::{ActiveFault, EngineState, FaultCode};
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::physics::{self, BOUNDS};

/// Per-tick chance of raising a fault when none is active.
pub const FAULT_PROBABILITY: f64 = 0.02;

/// Range of fault durations, in ticks.
pub const FAULT_DURATION_TICKS: RangeInclusive<u32> = 5..=20;

/// Oil pressure multiplier applied by [`FaultCode::OilPressureLow`].
const OIL_PRESSURE_FAULT_FACTOR: f64 = 0.7;
/// Coolant step applied by [`FaultCode::CoolantTempHigh`].
const COOLANT_FAULT_STEP: f64 = 2.5;
/// Fraction of the gap to the rpm ceiling closed by [`FaultCode::Overspeed`].
const OVERSPEED_PULL: f64 = 0.5;
/// DEF multiplier applied by [`FaultCode::DefLevelLow`].
const DEF_FAULT_FACTOR: f64 = 0.95;
/// Battery drop applied by [`FaultCode::BatteryVoltageLow`].
const BATTERY_FAULT_STEP: f64 = 0.2;

/// Apply one tick of `code`'s side effect to `state`, then clamp.
///
/// Overspeed only acts on a running engine, and keeps load in step with the
/// new speed.
pub fn apply_fault_effect(code: FaultCode, state: &mut EngineState) {
    match code {
        FaultCode::OilPressureLow => state.oil_pressure *= OIL_PRESSURE_FAULT_FACTOR,
        FaultCode::CoolantTempHigh => state.coolant_temp += COOLANT_FAULT_STEP,
        // A stopped engine cannot overspeed.
        FaultCode::Overspeed if state.running => {
            state.rpm = (BOUNDS.rpm.max - state.rpm).mul_add(OVERSPEED_PULL, state.rpm);
            state.load = physics::load_from_rpm(state.rpm);
        }
        FaultCode::Overspeed => {}
        FaultCode::DefLevelLow => state.def_level *= DEF_FAULT_FACTOR,
        FaultCode::BatteryVoltageLow => state.battery_voltage -= BATTERY_FAULT_STEP,
    }
    physics::clamp_to_bounds(state);
}

/// Owns the single fault slot and the per-code occurrence counters.
#[derive(Debug, Clone, Default)]
pub struct FaultInjector {
    active: Option<ActiveFault>,
    occurrences: HashMap<FaultCode, u32>,
}

impl FaultInjector {
    /// Create an injector with no active fault.
    pub fn new() -> Self {
        Self::default()
    }

    /// The fault currently active, if any.
    pub const fn active(&self) -> Option<&ActiveFault> {
        self.active.as_ref()
    }

    /// Times `code` has been raised so far.
    pub fn occurrences(&self, code: FaultCode) -> u32 {
        self.occurrences.get(&code).copied().unwrap_or(0)
    }

    /// Raise `code` for `duration_ticks` ticks, replacing any active fault.
    ///
    /// A zero duration is treated as one tick so the fault is observable.
    pub fn activate(&mut self, code: FaultCode, duration_ticks: u32) -> ActiveFault {
        let count = self.occurrences.entry(code).or_insert(0);
        *count = count.saturating_add(1);
        let fault = ActiveFault {
            code,
            remaining_ticks: duration_ticks.max(1),
            occurrence: *count,
        };
        self.active = Some(fault);
        fault
    }

    /// Roll for a new fault. Only rolls when no fault is active.
    ///
    /// Returns the fault if one was raised this tick.
    pub fn roll<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<ActiveFault> {
        if self.active.is_some() || !rng.random_bool(FAULT_PROBABILITY) {
            return None;
        }
        let code = *FaultCode::ALL.choose(rng)?;
        let duration = rng.random_range(FAULT_DURATION_TICKS);
        Some(self.activate(code, duration))
    }

    /// Apply the active fault to `state` and count it down by one tick.
    ///
    /// Returns the code if the fault cleared on this tick.
    pub fn apply(&mut self, state: &mut EngineState) -> Option<FaultCode> {
        let fault = self.active.as_mut()?;
        apply_fault_effect(fault.code, state);
        fault.remaining_ticks = fault.remaining_ticks.saturating_sub(1);
        if fault.remaining_ticks == 0 {
            let code = fault.code;
            self.active = None;
            return Some(code);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn oil_pressure_fault_scales_by_seventy_percent() {
        let mut state = EngineState {
            oil_pressure: 4.0,
            ..EngineState::default()
        };
        apply_fault_effect(FaultCode::OilPressureLow, &mut state);
        assert!(approx(state.oil_pressure, 2.8));
    }

    #[test]
    fn coolant_fault_never_exceeds_ceiling() {
        let mut state = EngineState {
            coolant_temp: 94.0,
            ..EngineState::default()
        };
        for _ in 0..10 {
            apply_fault_effect(FaultCode::CoolantTempHigh, &mut state);
            assert!(state.coolant_temp <= 95.0);
        }
        assert!(approx(state.coolant_temp, 95.0));
    }

    #[test]
    fn overspeed_pulls_toward_ceiling() {
        let mut state = EngineState {
            rpm: 2000.0,
            ..EngineState::default()
        };
        apply_fault_effect(FaultCode::Overspeed, &mut state);
        assert!(approx(state.rpm, 2300.0));
        for _ in 0..60 {
            apply_fault_effect(FaultCode::Overspeed, &mut state);
        }
        assert!(state.rpm <= BOUNDS.rpm.max);
        assert!(state.rpm > 2599.0);
        assert!(approx(state.load, 1.0));
    }

    #[test]
    fn overspeed_recomputes_load() {
        let mut state = EngineState {
            rpm: 1000.0,
            load: 0.1,
            ..EngineState::default()
        };
        apply_fault_effect(FaultCode::Overspeed, &mut state);
        assert!(approx(state.rpm, 1800.0));
        assert!(approx(state.load, physics::load_from_rpm(1800.0)));
    }

    #[test]
    fn overspeed_leaves_stopped_engine_alone() {
        let mut state = EngineState {
            running: false,
            rpm: 0.0,
            load: 0.0,
            ..EngineState::default()
        };
        for _ in 0..10 {
            apply_fault_effect(FaultCode::Overspeed, &mut state);
        }
        assert!(approx(state.rpm, 0.0));
        assert!(approx(state.load, 0.0));
        assert_eq!(state.status_label(), "OFF");
    }

    #[test]
    fn battery_fault_floors_at_minimum() {
        let mut state = EngineState::default();
        for _ in 0..100 {
            apply_fault_effect(FaultCode::BatteryVoltageLow, &mut state);
        }
        assert!(approx(state.battery_voltage, BOUNDS.battery_voltage.min));
    }

    #[test]
    fn fault_applies_for_exactly_its_duration() {
        let mut injector = FaultInjector::new();
        let mut state = EngineState {
            def_level: 50.0,
            ..EngineState::default()
        };
        injector.activate(FaultCode::DefLevelLow, 5);

        for tick in 1..=5 {
            let before = state.def_level;
            let cleared = injector.apply(&mut state);
            assert!(approx(state.def_level, before * 0.95), "tick {tick}");
            if tick < 5 {
                assert!(cleared.is_none());
                assert!(injector.active().is_some());
            } else {
                assert_eq!(cleared, Some(FaultCode::DefLevelLow));
            }
        }
        assert!(injector.active().is_none());

        let before = state.def_level;
        assert!(injector.apply(&mut state).is_none());
        assert!(approx(state.def_level, before));
    }

    #[test]
    fn roll_never_replaces_an_active_fault() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut injector = FaultInjector::new();
        injector.activate(FaultCode::Overspeed, 20);
        for _ in 0..1_000 {
            assert!(injector.roll(&mut rng).is_none());
        }
        assert_eq!(
            injector.active().map(|fault| fault.code),
            Some(FaultCode::Overspeed)
        );
    }

    #[test]
    fn rolled_faults_have_catalog_durations() {
        let mut rng = SmallRng::seed_from_u64(2024);
        let mut raised = 0u32;
        for _ in 0..20_000 {
            let mut injector = FaultInjector::new();
            if let Some(fault) = injector.roll(&mut rng) {
                assert!(FAULT_DURATION_TICKS.contains(&fault.remaining_ticks));
                assert!(FaultCode::ALL.contains(&fault.code));
                raised = raised.saturating_add(1);
            }
        }
        // 2 % of 20 000 is 400; allow a generous band.
        assert!((250..=550).contains(&raised), "raised {raised}");
    }

    #[test]
    fn occurrence_counter_increments_per_code() {
        let mut injector = FaultInjector::new();
        assert_eq!(injector.activate(FaultCode::OilPressureLow, 5).occurrence, 1);
        assert_eq!(injector.activate(FaultCode::OilPressureLow, 5).occurrence, 2);
        assert_eq!(injector.activate(FaultCode::Overspeed, 5).occurrence, 1);
        assert_eq!(injector.occurrences(FaultCode::OilPressureLow), 2);
        assert_eq!(injector.occurrences(FaultCode::CoolantTempHigh), 0);
    }
}
