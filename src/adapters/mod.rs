//! Adapter contracts: the capability interfaces the state machine drives
//! hardware and the rest of the OS through. Each trait is the boundary the
//! original daemon drew around one piece of platform-specific glue; here
//! every trait gets a `Logging*` implementation that only records what would
//! have happened, so the daemon boots and is fully exercisable on a machine
//! with none of the real hardware wired up.

use tracing::info;

use crate::battery::BatteryInfo;
use crate::state_machine::types::{
    DisplayPowerChangeReason, DisplayPowerControlFilter, ProximityState,
};

/// Screen brightness control, including the autobrightness toggle.
pub trait BrightnessControl: Send + Sync {
    fn set_normal_brightness(&self);
    fn set_dim_brightness(&self);
    fn set_off_brightness(&self);
    fn set_normal_brightness_value(&self, value: f64);
    fn enable_autobrightness(&self);
    fn disable_autobrightness(&self);
}

/// Turns display panels on/off, filtered by internal/external/all.
pub trait DisplayPowerControl: Send + Sync {
    fn turn_on(&self, filter: DisplayPowerControlFilter);
    fn turn_off(&self, filter: DisplayPowerControlFilter);
}

/// Broadcasts display power transitions to interested external clients.
pub trait DisplayPowerEventSink: Send + Sync {
    fn notify_display_power_on(&self, reason: DisplayPowerChangeReason);
    fn notify_display_power_off(&self, reason: DisplayPowerChangeReason);
}

/// Whether any external display is currently active, used by the lid-close
/// handler to decide if the internal panel alone may be turned off.
pub trait DisplayInformation: Send + Sync {
    fn has_active_external_displays(&self) -> bool;
}

/// Cellular modem power mode, dropped to low-power whenever the display
/// turns off for a reason other than proximity.
pub trait ModemPowerControl: Send + Sync {
    fn set_normal_power_mode(&self);
    fn set_low_power_mode(&self);
}

/// CPU/GPU performance governor hint tied to display-on/off transitions.
pub trait PerformanceBooster: Send + Sync {
    fn enable_interactive_mode(&self);
    fn disable_interactive_mode(&self);
}

/// Receives the long-press notification once the power button has been held
/// past the configured threshold.
pub trait PowerButtonEventSink: Send + Sync {
    fn notify_long_press(&self);
}

/// The physical power source (AC vs battery), with a push-based query.
pub trait PowerSource: Send + Sync {
    fn is_using_battery_power(&self) -> bool;
}

/// Raw proximity sensor, enabled only while some lattice source requests it.
pub trait ProximitySensor: Send + Sync {
    fn enable_proximity_events(&self);
    fn disable_proximity_events(&self);
    fn proximity_state(&self) -> ProximityState;
}

/// Suspend/power-off and the named automatic-suspend inhibitor registry, plus
/// the switch between the daemon's own handlers and the platform defaults
/// used while paused.
pub trait SystemPowerControl: Send + Sync {
    fn suspend(&self);
    fn power_off(&self);
    fn allow_automatic_suspend(&self, id: &str);
    fn disallow_automatic_suspend(&self, id: &str);
    fn allow_default_system_handlers(&self);
    fn disallow_default_system_handlers(&self);
}

/// Raw LED hardware access, one level below the priority policy in
/// [`crate::led`].
pub trait LightControl: Send + Sync {
    fn set_led_attributes(&self, color: (u8, u8, u8), on_ms: u32, off_ms: u32);
    fn turn_led_on(&self);
    fn turn_led_off(&self);
}

macro_rules! logging_adapter {
    ($name:ident) => {
        #[derive(Debug, Default)]
        pub struct $name;
    };
}

logging_adapter!(LoggingBrightnessControl);
logging_adapter!(LoggingDisplayPowerControl);
logging_adapter!(LoggingDisplayPowerEventSink);
logging_adapter!(LoggingDisplayInformation);
logging_adapter!(LoggingModemPowerControl);
logging_adapter!(LoggingPerformanceBooster);
logging_adapter!(LoggingPowerButtonEventSink);
logging_adapter!(LoggingPowerSource);
logging_adapter!(LoggingProximitySensor);
logging_adapter!(LoggingSystemPowerControl);
logging_adapter!(LoggingLightControl);

impl BrightnessControl for LoggingBrightnessControl {
    fn set_normal_brightness(&self) {
        info!("brightness: normal");
    }
    fn set_dim_brightness(&self) {
        info!("brightness: dim");
    }
    fn set_off_brightness(&self) {
        info!("brightness: off");
    }
    fn set_normal_brightness_value(&self, value: f64) {
        info!(value, "brightness: set normal value");
    }
    fn enable_autobrightness(&self) {
        info!("brightness: autobrightness enabled");
    }
    fn disable_autobrightness(&self) {
        info!("brightness: autobrightness disabled");
    }
}

impl DisplayPowerControl for LoggingDisplayPowerControl {
    fn turn_on(&self, filter: DisplayPowerControlFilter) {
        info!(?filter, "display: turn on");
    }
    fn turn_off(&self, filter: DisplayPowerControlFilter) {
        info!(?filter, "display: turn off");
    }
}

impl DisplayPowerEventSink for LoggingDisplayPowerEventSink {
    fn notify_display_power_on(&self, reason: DisplayPowerChangeReason) {
        info!(?reason, "display power event: on");
    }
    fn notify_display_power_off(&self, reason: DisplayPowerChangeReason) {
        info!(?reason, "display power event: off");
    }
}

impl DisplayInformation for LoggingDisplayInformation {
    fn has_active_external_displays(&self) -> bool {
        false
    }
}

impl ModemPowerControl for LoggingModemPowerControl {
    fn set_normal_power_mode(&self) {
        info!("modem: normal power mode");
    }
    fn set_low_power_mode(&self) {
        info!("modem: low power mode");
    }
}

impl PerformanceBooster for LoggingPerformanceBooster {
    fn enable_interactive_mode(&self) {
        info!("performance: interactive mode enabled");
    }
    fn disable_interactive_mode(&self) {
        info!("performance: interactive mode disabled");
    }
}

impl PowerButtonEventSink for LoggingPowerButtonEventSink {
    fn notify_long_press(&self) {
        info!("power button: long press");
    }
}

impl PowerSource for LoggingPowerSource {
    fn is_using_battery_power(&self) -> bool {
        false
    }
}

impl ProximitySensor for LoggingProximitySensor {
    fn enable_proximity_events(&self) {
        info!("proximity: events enabled");
    }
    fn disable_proximity_events(&self) {
        info!("proximity: events disabled");
    }
    fn proximity_state(&self) -> ProximityState {
        ProximityState::Far
    }
}

impl SystemPowerControl for LoggingSystemPowerControl {
    fn suspend(&self) {
        info!("system: suspend");
    }
    fn power_off(&self) {
        info!("system: power off");
    }
    fn allow_automatic_suspend(&self, id: &str) {
        info!(id, "system: allow automatic suspend");
    }
    fn disallow_automatic_suspend(&self, id: &str) {
        info!(id, "system: disallow automatic suspend");
    }
    fn allow_default_system_handlers(&self) {
        info!("system: allow default handlers");
    }
    fn disallow_default_system_handlers(&self) {
        info!("system: disallow default handlers");
    }
}

impl LightControl for LoggingLightControl {
    fn set_led_attributes(&self, color: (u8, u8, u8), on_ms: u32, off_ms: u32) {
        info!(?color, on_ms, off_ms, "led: set attributes");
    }
    fn turn_led_on(&self) {
        info!("led: on");
    }
    fn turn_led_off(&self) {
        info!("led: off");
    }
}

/// A no-op battery source used before the first real `BatteryInfoChanged`
/// event arrives.
pub fn unknown_battery_info() -> BatteryInfo {
    BatteryInfo::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_adapters_do_not_panic() {
        LoggingBrightnessControl.set_normal_brightness();
        LoggingDisplayPowerControl.turn_on(DisplayPowerControlFilter::All);
        LoggingDisplayPowerEventSink.notify_display_power_on(DisplayPowerChangeReason::Unknown);
        assert!(!LoggingDisplayInformation.has_active_external_displays());
        LoggingModemPowerControl.set_low_power_mode();
        LoggingPerformanceBooster.enable_interactive_mode();
        LoggingPowerButtonEventSink.notify_long_press();
        assert!(!LoggingPowerSource.is_using_battery_power());
        assert_eq!(LoggingProximitySensor.proximity_state(), ProximityState::Far);
        LoggingSystemPowerControl.suspend();
        LoggingLightControl.turn_led_on();
    }
}
