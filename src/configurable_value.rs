//! ConfigurableValue<T>: a per-power-supply value with an active
//! selector. Mutating either field is idempotent; the selector only moves on
//! a power-source-change event (owned by the state machine, not by this
//! type).

/// Pair of values, one per [`crate::battery::PowerSupply`] variant, plus a
/// selector choosing which is currently active.
#[derive(Debug, Clone, Copy)]
pub struct ConfigurableValue<T> {
    pub on_battery: T,
    pub on_line_power: T,
    pub is_on_battery: bool,
}

impl<T: Copy> ConfigurableValue<T> {
    pub fn new(on_battery: T, on_line_power: T, is_on_battery: bool) -> Self {
        Self {
            on_battery,
            on_line_power,
            is_on_battery,
        }
    }

    pub fn uniform(value: T) -> Self {
        Self::new(value, value, true)
    }

    /// The value selected by the current power supply.
    pub fn get(&self) -> T {
        if self.is_on_battery {
            self.on_battery
        } else {
            self.on_line_power
        }
    }

    pub fn set_is_on_battery(&mut self, is_on_battery: bool) {
        self.is_on_battery = is_on_battery;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_selects_active_field() {
        let mut value = ConfigurableValue::new(10u32, 20u32, true);
        assert_eq!(value.get(), 10);
        value.set_is_on_battery(false);
        assert_eq!(value.get(), 20);
    }

    #[test]
    fn round_trip_across_power_source_changes() {
        let mut value = ConfigurableValue::new(1u32, 2u32, false);
        value.set_is_on_battery(true);
        assert_eq!(value.get(), 1);
        value.set_is_on_battery(false);
        assert_eq!(value.get(), 2);
    }
}
