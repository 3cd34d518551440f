//! Per-tick engine model.
//!
//! A running engine chases a randomly drawn target speed with a first-order
//! lag, and every other channel is derived from speed or load with some
//! per-tick noise. A stopped engine cools toward ambient and spins down.
//! Hour counters only advance on running ticks.
//! After every update the state is clamped to [`Bounds`], so no sequence of
//! ticks can leave the documented physical ranges.

use std::time::Duration;

use datalogger_types::EngineState;
use rand::Rng;

/// Seconds per hour, for the hour meter.
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Lowest target speed drawn while running.
pub const TARGET_RPM_MIN: f64 = 1200.0;
/// Highest target speed drawn while running.
pub const TARGET_RPM_MAX: f64 = 2200.0;
/// Fraction of the gap to the target speed closed each tick.
pub const RPM_RELAXATION: f64 = 0.08;
/// Speed at which load reaches 1.0.
pub const RATED_RPM: f64 = 2200.0;
/// Load floor while running.
pub const MIN_RUNNING_LOAD: f64 = 0.2;

/// Refill is only possible below this DEF level.
pub const DEF_REFILL_THRESHOLD: f64 = 10.0;
/// Per-tick chance of a refill once below the threshold.
pub const DEF_REFILL_PROBABILITY: f64 = 0.05;

/// Running load below this counts as idle time.
pub const IDLE_LOAD_MAX: f64 = 0.4;
/// Running load at or above this counts as travel time; in between is work.
pub const TRAVEL_LOAD_MIN: f64 = 0.8;
/// Vibration index at or above which vibration hours accumulate.
pub const VIBRATION_ALARM_LEVEL: f64 = 2.5;
/// Coolant temperature at or above which heating hours accumulate.
pub const HOT_COOLANT_TEMP: f64 = 90.0;

/// Per-tick chance of the water-in-fuel sensor tripping while running.
pub const WATER_IN_FUEL_PROBABILITY: f64 = 0.002;
/// Per-tick chance of a tripped water-in-fuel sensor clearing (filter drained).
pub const WATER_DRAIN_PROBABILITY: f64 = 0.05;

/// Temperature a stopped engine cools toward.
pub const AMBIENT_TEMP: f64 = 25.0;
/// Speed lost per tick while stopped.
const STOP_RPM_DECAY: f64 = 300.0;
/// Coolant temperature lost per tick while stopped.
const STOP_COOLANT_DECAY: f64 = 0.5;
/// Oil temperature lost per tick while stopped.
const STOP_OIL_TEMP_DECAY: f64 = 0.4;
/// Exhaust temperature lost per tick while stopped.
const STOP_EXHAUST_DECAY: f64 = 20.0;
/// Oil pressure multiplier per tick while stopped.
const STOP_OIL_PRESSURE_FACTOR: f64 = 0.5;
/// Oil pressure below this snaps to zero while stopped.
const OIL_PRESSURE_EPSILON: f64 = 0.05;
/// Battery creep per running tick.
const BATTERY_CHARGE_STEP: f64 = 0.01;

/// Inclusive lower and upper limit for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    /// Lower limit.
    pub min: f64,
    /// Upper limit.
    pub max: f64,
}

impl Range {
    const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into this range.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Whether `value` lies within this range.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Physical limits of every engine channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Engine speed.
    pub rpm: Range,
    /// Fuel and DEF tank levels.
    pub tank_level: Range,
    /// Coolant temperature.
    pub coolant_temp: Range,
    /// Oil temperature.
    pub oil_temp: Range,
    /// Oil pressure.
    pub oil_pressure: Range,
    /// Exhaust temperature.
    pub exhaust_temp: Range,
    /// Boost pressure.
    pub boost: Range,
    /// Load fraction.
    pub load: Range,
    /// Torque.
    pub torque: Range,
    /// Battery voltage.
    pub battery_voltage: Range,
    /// Alternator voltage.
    pub alternator_voltage: Range,
    /// Vibration index.
    pub vibration: Range,
}

/// The limits enforced after every tick.
pub const BOUNDS: Bounds = Bounds {
    rpm: Range::new(0.0, 2600.0),
    tank_level: Range::new(0.0, 100.0),
    coolant_temp: Range::new(AMBIENT_TEMP, 95.0),
    oil_temp: Range::new(AMBIENT_TEMP, 110.0),
    oil_pressure: Range::new(0.0, 6.5),
    exhaust_temp: Range::new(AMBIENT_TEMP, 650.0),
    boost: Range::new(0.0, 2.5),
    load: Range::new(0.0, 1.0),
    torque: Range::new(0.0, 2400.0),
    battery_voltage: Range::new(10.5, 14.4),
    alternator_voltage: Range::new(0.0, 14.8),
    vibration: Range::new(0.0, 5.0),
};

/// Move `current` speed toward `target` by [`RPM_RELAXATION`] of the gap.
pub fn relax_rpm(current: f64, target: f64) -> f64 {
    (target - current).mul_add(RPM_RELAXATION, current)
}

/// Load fraction for a running engine at `rpm`.
pub fn load_from_rpm(rpm: f64) -> f64 {
    (rpm / RATED_RPM).clamp(MIN_RUNNING_LOAD, 1.0)
}

/// Oil pressure as a function of engine speed.
pub fn oil_pressure_at(rpm: f64) -> f64 {
    rpm.mul_add(0.0018, 1.5)
}

/// Exhaust temperature as a function of load.
pub fn exhaust_temp_at(load: f64) -> f64 {
    load.mul_add(400.0, 250.0)
}

/// Produce the engine state one tick of length `tick` after `state`.
///
/// The running flag is taken as given; toggling it is the simulator's job.
/// The result is clamped to [`BOUNDS`].
pub fn advance_state<R: Rng + ?Sized>(
    state: &EngineState,
    tick: Duration,
    rng: &mut R,
) -> EngineState {
    let mut next = state.clone();
    if state.running {
        advance_running(&mut next, tick, rng);
    } else {
        advance_stopped(&mut next);
    }
    clamp_to_bounds(&mut next);
    if state.running {
        accumulate_hours(&mut next, tick.as_secs_f64() / SECONDS_PER_HOUR);
    }
    update_water_in_fuel(&mut next, rng);
    next
}

fn advance_running<R: Rng + ?Sized>(next: &mut EngineState, tick: Duration, rng: &mut R) {
    let target_rpm = rng.random_range(TARGET_RPM_MIN..=TARGET_RPM_MAX);
    next.rpm = relax_rpm(next.rpm, target_rpm);

    let load = load_from_rpm(next.rpm);
    next.load = load;
    next.boost = load * rng.random_range(1.2..=1.8);
    next.torque = load * rng.random_range(1800.0..=2200.0);

    let fuel_rate = rng.random_range(0.01..=0.03);
    next.fuel_level = load.mul_add(-fuel_rate, next.fuel_level).max(0.0);
    let def_rate = rng.random_range(0.005..=0.015);
    next.def_level = load.mul_add(-def_rate, next.def_level).max(0.0);
    if next.def_level < DEF_REFILL_THRESHOLD && rng.random_bool(DEF_REFILL_PROBABILITY) {
        next.def_level = rng.random_range(85.0..=100.0);
    }

    let coolant_rise = rng.random_range(0.5..=1.5);
    next.coolant_temp = load
        .mul_add(coolant_rise, next.coolant_temp)
        .min(BOUNDS.coolant_temp.max);
    let oil_rise = rng.random_range(0.4..=1.2);
    next.oil_temp = load.mul_add(oil_rise, next.oil_temp).min(BOUNDS.oil_temp.max);

    next.oil_pressure = oil_pressure_at(next.rpm);
    next.exhaust_temp = exhaust_temp_at(load);
    next.battery_voltage =
        (next.battery_voltage + BATTERY_CHARGE_STEP).min(BOUNDS.battery_voltage.max);
    next.alternator_voltage = load.mul_add(0.8, 13.5);
    next.vibration = load.mul_add(2.5, 0.5);
}

/// Add `hours` of running time to the hour meter and the counters whose
/// condition holds in `next`.
///
/// Idle, work and travel are disjoint load bands, so together they advance
/// exactly as fast as `engine_hours`.
fn accumulate_hours(next: &mut EngineState, hours: f64) {
    next.engine_hours += hours;
    if next.load < IDLE_LOAD_MAX {
        next.idle_hours += hours;
    } else if next.load < TRAVEL_LOAD_MIN {
        next.work_hours += hours;
    } else {
        next.travel_hours += hours;
    }
    if next.vibration >= VIBRATION_ALARM_LEVEL {
        next.vibration_hours += hours;
    }
    if next.coolant_temp >= HOT_COOLANT_TEMP {
        next.heating_hours += hours;
    }
}

/// Latch the water-in-fuel sensor while running; drain it at random.
fn update_water_in_fuel<R: Rng + ?Sized>(next: &mut EngineState, rng: &mut R) {
    if next.water_in_fuel {
        if rng.random_bool(WATER_DRAIN_PROBABILITY) {
            next.water_in_fuel = false;
        }
    } else if next.running && rng.random_bool(WATER_IN_FUEL_PROBABILITY) {
        next.water_in_fuel = true;
    }
}

fn advance_stopped(next: &mut EngineState) {
    next.rpm = (next.rpm - STOP_RPM_DECAY).max(0.0);
    next.coolant_temp = (next.coolant_temp - STOP_COOLANT_DECAY).max(AMBIENT_TEMP);
    next.oil_temp = (next.oil_temp - STOP_OIL_TEMP_DECAY).max(AMBIENT_TEMP);
    next.exhaust_temp = (next.exhaust_temp - STOP_EXHAUST_DECAY).max(AMBIENT_TEMP);

    next.boost = 0.0;
    next.load = 0.0;
    next.torque = 0.0;
    next.vibration = 0.0;

    next.oil_pressure *= STOP_OIL_PRESSURE_FACTOR;
    if next.oil_pressure < OIL_PRESSURE_EPSILON {
        next.oil_pressure = 0.0;
    }
    // Not charging: the alternator reads whatever the battery holds.
    next.alternator_voltage = next.battery_voltage;
}

/// Clamp every channel of `state` into [`BOUNDS`].
///
/// `engine_hours` is only floored at zero; it has no ceiling.
pub fn clamp_to_bounds(state: &mut EngineState) {
    state.rpm = BOUNDS.rpm.clamp(state.rpm);
    state.fuel_level = BOUNDS.tank_level.clamp(state.fuel_level);
    state.def_level = BOUNDS.tank_level.clamp(state.def_level);
    state.coolant_temp = BOUNDS.coolant_temp.clamp(state.coolant_temp);
    state.oil_temp = BOUNDS.oil_temp.clamp(state.oil_temp);
    state.oil_pressure = BOUNDS.oil_pressure.clamp(state.oil_pressure);
    state.exhaust_temp = BOUNDS.exhaust_temp.clamp(state.exhaust_temp);
    state.boost = BOUNDS.boost.clamp(state.boost);
    state.load = BOUNDS.load.clamp(state.load);
    state.torque = BOUNDS.torque.clamp(state.torque);
    state.battery_voltage = BOUNDS.battery_voltage.clamp(state.battery_voltage);
    state.alternator_voltage = BOUNDS.alternator_voltage.clamp(state.alternator_voltage);
    state.vibration = BOUNDS.vibration.clamp(state.vibration);
    state.engine_hours = state.engine_hours.max(0.0);
}

/// Whether every channel of `state` is within [`BOUNDS`].
pub fn within_bounds(state: &EngineState) -> bool {
    BOUNDS.rpm.contains(state.rpm)
        && BOUNDS.tank_level.contains(state.fuel_level)
        && BOUNDS.tank_level.contains(state.def_level)
        && BOUNDS.coolant_temp.contains(state.coolant_temp)
        && BOUNDS.oil_temp.contains(state.oil_temp)
        && BOUNDS.oil_pressure.contains(state.oil_pressure)
        && BOUNDS.exhaust_temp.contains(state.exhaust_temp)
        && BOUNDS.boost.contains(state.boost)
        && BOUNDS.load.contains(state.load)
        && BOUNDS.torque.contains(state.torque)
        && BOUNDS.battery_voltage.contains(state.battery_voltage)
        && BOUNDS.alternator_voltage.contains(state.alternator_voltage)
        && BOUNDS.vibration.contains(state.vibration)
        && state.engine_hours >= 0.0
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    const TICK: Duration = Duration::from_secs(20);

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rpm_relaxes_eight_percent_toward_target() {
        assert!(approx(relax_rpm(800.0, 2000.0), 896.0));
        assert!(approx(relax_rpm(2000.0, 1200.0), 1936.0));
    }

    #[test]
    fn load_is_rpm_over_rated_speed() {
        let load = load_from_rpm(800.0);
        assert!((load - 0.364).abs() < 0.001);
        assert!(approx(load_from_rpm(100.0), MIN_RUNNING_LOAD));
        assert!(approx(load_from_rpm(3000.0), 1.0));
    }

    #[test]
    fn running_tick_stays_between_current_and_target_band() {
        let mut rng = SmallRng::seed_from_u64(42);
        let state = EngineState::default();
        let next = advance_state(&state, TICK, &mut rng);
        let low = relax_rpm(state.rpm, TARGET_RPM_MIN);
        let high = relax_rpm(state.rpm, TARGET_RPM_MAX);
        assert!(next.rpm >= low - 1e-9 && next.rpm <= high + 1e-9);
        assert!(approx(next.load, load_from_rpm(next.rpm)));
        assert!(approx(next.oil_pressure, oil_pressure_at(next.rpm)));
        assert!(approx(next.exhaust_temp, exhaust_temp_at(next.load)));
    }

    #[test]
    fn running_tick_adds_exact_hour_fraction() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut state = EngineState::default();
        for _ in 0..500 {
            let before = state.engine_hours;
            state = advance_state(&state, TICK, &mut rng);
            assert!(approx(state.engine_hours - before, 20.0 / 3600.0));
        }
    }

    #[test]
    fn load_band_counters_add_up_to_engine_hours() {
        let mut rng = SmallRng::seed_from_u64(21);
        let start = EngineState::default();
        let mut state = start.clone();
        for _ in 0..2_000 {
            let before = state.clone();
            state = advance_state(&state, TICK, &mut rng);
            assert!(state.idle_hours >= before.idle_hours);
            assert!(state.work_hours >= before.work_hours);
            assert!(state.travel_hours >= before.travel_hours);
            assert!(state.vibration_hours >= before.vibration_hours);
            assert!(state.heating_hours >= before.heating_hours);
        }
        let banded = (state.idle_hours - start.idle_hours)
            + (state.work_hours - start.work_hours)
            + (state.travel_hours - start.travel_hours);
        assert!((banded - (state.engine_hours - start.engine_hours)).abs() < 1e-6);
        assert!(state.work_hours > start.work_hours);
        assert!(state.travel_hours > start.travel_hours);
        assert!(approx(state.tamper_hours, start.tamper_hours));
    }

    #[test]
    fn idle_engine_accrues_idle_hours() {
        let mut state = EngineState {
            load: 0.3,
            vibration: 1.0,
            coolant_temp: 92.0,
            ..EngineState::default()
        };
        let before = state.clone();
        accumulate_hours(&mut state, 0.5);
        assert!(approx(state.idle_hours - before.idle_hours, 0.5));
        assert!(approx(state.work_hours, before.work_hours));
        assert!(approx(state.vibration_hours, before.vibration_hours));
        assert!(approx(state.heating_hours - before.heating_hours, 0.5));
    }

    #[test]
    fn stopped_engine_freezes_all_counters() {
        let mut rng = SmallRng::seed_from_u64(11);
        let start = EngineState {
            running: false,
            ..EngineState::default()
        };
        let mut state = start.clone();
        for _ in 0..500 {
            state = advance_state(&state, TICK, &mut rng);
        }
        assert!(approx(state.idle_hours, start.idle_hours));
        assert!(approx(state.work_hours, start.work_hours));
        assert!(approx(state.travel_hours, start.travel_hours));
        assert!(approx(state.heating_hours, start.heating_hours));
        assert!(!state.water_in_fuel);
    }

    #[test]
    fn water_in_fuel_trips_and_drains() {
        let mut rng = SmallRng::seed_from_u64(17);
        let mut state = EngineState::default();
        let mut tripped = false;
        let mut drained = false;
        for _ in 0..50_000 {
            let before = state.water_in_fuel;
            state = advance_state(&state, TICK, &mut rng);
            tripped |= !before && state.water_in_fuel;
            drained |= before && !state.water_in_fuel;
            if tripped && drained {
                break;
            }
        }
        assert!(tripped && drained);
    }

    #[test]
    fn long_running_sequence_stays_in_bounds() {
        let mut rng = SmallRng::seed_from_u64(1234);
        let mut state = EngineState::default();
        for _ in 0..20_000 {
            state = advance_state(&state, TICK, &mut rng);
            assert!(within_bounds(&state), "out of bounds: {state:?}");
            assert!(state.coolant_temp <= 95.0);
            assert!(state.fuel_level >= 0.0);
            assert!(state.def_level >= 0.0);
        }
    }

    #[test]
    fn fuel_depletes_to_zero_and_stays_there() {
        let mut rng = SmallRng::seed_from_u64(99);
        let mut state = EngineState {
            fuel_level: 0.05,
            ..EngineState::default()
        };
        for _ in 0..50 {
            state = advance_state(&state, TICK, &mut rng);
        }
        assert!(approx(state.fuel_level, 0.0));
    }

    #[test]
    fn def_is_eventually_refilled_when_low() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut state = EngineState {
            def_level: 2.0,
            ..EngineState::default()
        };
        let mut refilled = false;
        for _ in 0..2_000 {
            let before = state.def_level;
            state = advance_state(&state, TICK, &mut rng);
            if state.def_level > before {
                assert!(before < DEF_REFILL_THRESHOLD);
                assert!(state.def_level >= 85.0);
                refilled = true;
                break;
            }
        }
        assert!(refilled, "DEF never refilled");
    }

    #[test]
    fn stopped_engine_spins_down_and_cools() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut state = EngineState {
            running: false,
            rpm: 1800.0,
            coolant_temp: 90.0,
            oil_temp: 100.0,
            exhaust_temp: 600.0,
            oil_pressure: 4.5,
            ..EngineState::default()
        };
        let hours = state.engine_hours;
        for _ in 0..1_000 {
            state = advance_state(&state, TICK, &mut rng);
        }
        assert!(approx(state.rpm, 0.0));
        assert!(approx(state.coolant_temp, AMBIENT_TEMP));
        assert!(approx(state.oil_temp, AMBIENT_TEMP));
        assert!(approx(state.exhaust_temp, AMBIENT_TEMP));
        assert!(approx(state.oil_pressure, 0.0));
        assert!(approx(state.boost, 0.0));
        assert!(approx(state.load, 0.0));
        assert!(approx(state.torque, 0.0));
        assert!(approx(state.engine_hours, hours));
    }

    #[test]
    fn stopped_tick_decays_one_step() {
        let mut rng = SmallRng::seed_from_u64(3);
        let state = EngineState {
            running: false,
            rpm: 1000.0,
            coolant_temp: 80.0,
            ..EngineState::default()
        };
        let next = advance_state(&state, TICK, &mut rng);
        assert!(approx(next.rpm, 700.0));
        assert!(approx(next.coolant_temp, 79.5));
        assert!(approx(next.alternator_voltage, next.battery_voltage));
    }

    #[test]
    fn clamp_pulls_everything_back_in_range() {
        let mut state = EngineState {
            rpm: 9000.0,
            fuel_level: -4.0,
            coolant_temp: 140.0,
            battery_voltage: 3.0,
            ..EngineState::default()
        };
        clamp_to_bounds(&mut state);
        assert!(within_bounds(&state));
        assert!(approx(state.coolant_temp, 95.0));
        assert!(approx(state.battery_voltage, 10.5));
    }
}
