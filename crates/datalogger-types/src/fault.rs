//! Diagnostic trouble code catalog.
//!
//! The simulator can raise exactly one of five faults at a time. Each fault
//! is identified on the wire by its J1939 suspect parameter number (SPN) and
//! failure mode identifier (FMI), and carries a human-readable description.

use serde::{Deserialize, Serialize};

/// SPN reported when no fault is active.
pub const NO_FAULT_SPN: u32 = 0;

/// FMI reported when no fault is active.
pub const NO_FAULT_FMI: u8 = 0;

/// Description reported when no fault is active.
pub const NO_FAULT_DESCRIPTION: &str = "No Fault";

/// DTC string reported when no fault is active (`SPN/FMI/OC`).
pub const NO_FAULT_DTC: &str = "0/0/0";

/// The fixed catalog of faults the simulator can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultCode {
    /// Oil pressure drops to 70 % of nominal every tick.
    OilPressureLow,
    /// Coolant temperature climbs by a fixed step every tick.
    CoolantTempHigh,
    /// Engine speed is pulled toward the overspeed ceiling.
    Overspeed,
    /// DEF tank level drains faster than normal.
    DefLevelLow,
    /// Battery voltage sags every tick.
    BatteryVoltageLow,
}

impl FaultCode {
    /// Every fault in the catalog, in a stable order.
    pub const ALL: [Self; 5] = [
        Self::OilPressureLow,
        Self::CoolantTempHigh,
        Self::Overspeed,
        Self::DefLevelLow,
        Self::BatteryVoltageLow,
    ];

    /// J1939 suspect parameter number.
    pub const fn spn(self) -> u32 {
        match self {
            Self::OilPressureLow => 100,
            Self::CoolantTempHigh => 110,
            Self::Overspeed => 190,
            Self::DefLevelLow => 1761,
            Self::BatteryVoltageLow => 168,
        }
    }

    /// J1939 failure mode identifier.
    pub const fn fmi(self) -> u8 {
        match self {
            Self::OilPressureLow | Self::DefLevelLow => 1,
            Self::CoolantTempHigh | Self::Overspeed => 0,
            Self::BatteryVoltageLow => 4,
        }
    }

    /// Human-readable description.
    pub const fn description(self) -> &'static str {
        match self {
            Self::OilPressureLow => "Engine Oil Pressure Low",
            Self::CoolantTempHigh => "Engine Coolant Temperature High",
            Self::Overspeed => "Engine Overspeed",
            Self::DefLevelLow => "Aftertreatment DEF Tank Level Low",
            Self::BatteryVoltageLow => "Battery Potential Low",
        }
    }
}

/// A fault currently perturbing the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveFault {
    /// Which catalog entry is active.
    pub code: FaultCode,
    /// Ticks left before the fault clears on its own.
    pub remaining_ticks: u32,
    /// How many times this code has been raised in this process, including
    /// this activation.
    pub occurrence: u32,
}

impl ActiveFault {
    /// Format as a `SPN/FMI/OC` trouble code string.
    pub fn dtc(&self) -> String {
        format!(
            "{}/{}/{}",
            self.code.spn(),
            self.code.fmi(),
            self.occurrence
        )
    }
}
