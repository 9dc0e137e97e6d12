//! Battery / power-source data model.

use serde::{Deserialize, Serialize};

/// Which power source is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerSupply {
    Battery,
    LinePower,
}

impl PowerSupply {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "battery" => Some(Self::Battery),
            "line_power" | "line-power" | "mains" | "ac" => Some(Self::LinePower),
            _ => None,
        }
    }
}

/// Charge state reported by the power-source adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatteryChargeState {
    #[default]
    Unknown,
    Charging,
    Discharging,
    Empty,
    Full,
    PendingCharge,
    PendingDischarge,
}

/// Battery snapshot, as published by the power-source adapter and consumed
/// by the LED policy to derive its `BatteryLow`/`BatteryFull`/
/// `BatteryCharging` active flags.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatteryInfo {
    pub is_present: bool,
    pub state: BatteryChargeState,
    /// 0..=100
    pub percentage: u8,
    pub temperature: f32,
}

impl BatteryInfo {
    pub fn is_low(&self) -> bool {
        self.percentage < 10
    }

    pub fn is_full(&self) -> bool {
        self.percentage >= 100
    }

    pub fn is_charging(&self) -> bool {
        self.state == BatteryChargeState::Charging
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_flags_match_thresholds() {
        let low = BatteryInfo {
            percentage: 9,
            ..Default::default()
        };
        assert!(low.is_low());
        assert!(!low.is_full());

        let full = BatteryInfo {
            percentage: 100,
            ..Default::default()
        };
        assert!(full.is_full());
        assert!(!full.is_low());

        let charging = BatteryInfo {
            state: BatteryChargeState::Charging,
            ..Default::default()
        };
        assert!(charging.is_charging());
    }

    #[test]
    fn power_supply_parses_common_spellings() {
        assert_eq!(PowerSupply::from_str_loose("battery"), Some(PowerSupply::Battery));
        assert_eq!(PowerSupply::from_str_loose("line_power"), Some(PowerSupply::LinePower));
        assert_eq!(PowerSupply::from_str_loose("nonsense"), None);
    }
}
