//! LED policy: priority-ordered mapping from active "light events" to LED
//! pulse patterns, plus the imperative sub-API other daemons use over the
//! bus (set raw attributes, force on/off) that sits below it, mirroring
//! `set_led_attributes`/`turn_led_on`/`turn_led_off` low-level controls.

use crate::battery::BatteryInfo;
use crate::state_machine::types::DisplayPowerMode;

/// The named boolean light events the daemon tracks, each with independent
/// `enabled` and `active` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightEventKind {
    UnreadNotifications,
    BluetoothEnabled,
    BatteryLow,
    BatteryCharging,
    BatteryFull,
    Playing,
}

impl LightEventKind {
    const COUNT: usize = 6;

    /// Highest-priority first.
    pub const PRIORITY_ORDER: [LightEventKind; Self::COUNT] = [
        LightEventKind::BatteryLow,
        LightEventKind::UnreadNotifications,
        LightEventKind::BluetoothEnabled,
        LightEventKind::BatteryFull,
        LightEventKind::BatteryCharging,
        LightEventKind::Playing,
    ];

    fn index(self) -> usize {
        match self {
            LightEventKind::UnreadNotifications => 0,
            LightEventKind::BluetoothEnabled => 1,
            LightEventKind::BatteryLow => 2,
            LightEventKind::BatteryCharging => 3,
            LightEventKind::BatteryFull => 4,
            LightEventKind::Playing => 5,
        }
    }

    /// Exact-match string parsing: a name either matches one of the known
    /// events or the call is rejected, no prefix or fuzzy matching.
    pub fn from_str_exact(s: &str) -> Option<Self> {
        match s {
            "UnreadNotifications" => Some(Self::UnreadNotifications),
            "BluetoothEnabled" => Some(Self::BluetoothEnabled),
            "BatteryLow" => Some(Self::BatteryLow),
            "BatteryCharging" => Some(Self::BatteryCharging),
            "BatteryFull" => Some(Self::BatteryFull),
            "Playing" => Some(Self::Playing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashMode {
    None,
    Timed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrightnessMode {
    User,
    Sensor,
}

/// One LED pulse pattern: color plus on/off timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedPattern {
    pub color: (u8, u8, u8),
    pub on_ms: u32,
    pub off_ms: u32,
    pub flash_mode: FlashMode,
    pub brightness_mode: BrightnessMode,
}

impl LedPattern {
    pub const fn solid(color: (u8, u8, u8)) -> Self {
        Self {
            color,
            on_ms: 0,
            off_ms: 0,
            flash_mode: FlashMode::None,
            brightness_mode: BrightnessMode::User,
        }
    }

    pub const fn pulse(color: (u8, u8, u8), on_ms: u32, off_ms: u32) -> Self {
        Self {
            color,
            on_ms,
            off_ms,
            flash_mode: FlashMode::Timed,
            brightness_mode: BrightnessMode::User,
        }
    }

    fn default_preset(kind: LightEventKind) -> Self {
        match kind {
            LightEventKind::BatteryLow => Self::pulse((255, 0, 0), 500, 2000),
            LightEventKind::UnreadNotifications => Self::pulse((0, 0, 255), 500, 2000),
            LightEventKind::BluetoothEnabled => Self::solid((0, 128, 255)),
            LightEventKind::BatteryFull => Self::solid((0, 255, 0)),
            LightEventKind::BatteryCharging => Self::pulse((0, 255, 0), 1000, 1000),
            LightEventKind::Playing => Self::pulse((255, 255, 255), 200, 200),
        }
    }
}

/// Parse a hex color string, accepting both `0xRRGGBB` and `RRGGBB` forms.
pub fn parse_hex_color(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// A raw override issued through the imperative sub-API, taking precedence
/// over event-priority selection until replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Override {
    Pattern(LedPattern),
    ForcedOff,
}

/// LED policy state: per-event enabled/active flags, the preset pattern
/// table, and any raw override.
pub struct LedPolicy {
    enabled: [bool; LightEventKind::COUNT],
    active: [bool; LightEventKind::COUNT],
    patterns: [LedPattern; LightEventKind::COUNT],
    display_power_mode: DisplayPowerMode,
    raw_override: Option<Override>,
}

impl LedPolicy {
    pub fn new() -> Self {
        let mut patterns = [LedPattern::solid((0, 0, 0)); LightEventKind::COUNT];
        for kind in LightEventKind::PRIORITY_ORDER {
            patterns[kind.index()] = LedPattern::default_preset(kind);
        }
        Self {
            enabled: [false; LightEventKind::COUNT],
            active: [false; LightEventKind::COUNT],
            patterns,
            display_power_mode: DisplayPowerMode::Off,
            raw_override: None,
        }
    }

    pub fn set_display_power_mode(&mut self, mode: DisplayPowerMode) {
        self.display_power_mode = mode;
    }

    pub fn set_enabled(&mut self, kind: LightEventKind, enabled: bool) {
        self.enabled[kind.index()] = enabled;
    }

    pub fn set_active(&mut self, kind: LightEventKind, active: bool) {
        self.active[kind.index()] = active;
    }

    /// Recompute the derived battery-backed active flags on every battery
    /// notification.
    pub fn update_from_battery(&mut self, info: BatteryInfo) {
        self.set_active(LightEventKind::BatteryCharging, info.is_charging());
        self.set_active(LightEventKind::BatteryLow, info.is_low());
        self.set_active(LightEventKind::BatteryFull, info.is_full());
    }

    /// Overwrite the `Playing` preset pattern from a hex color string plus
    /// explicit timing (the `setPlayingData` IPC method).
    pub fn set_playing_data(&mut self, color: (u8, u8, u8), on_ms: u32, off_ms: u32) {
        self.patterns[LightEventKind::Playing.index()] = LedPattern {
            color,
            on_ms,
            off_ms,
            flash_mode: if off_ms > 0 { FlashMode::Timed } else { FlashMode::None },
            brightness_mode: BrightnessMode::User,
        };
    }

    /// Raw imperative override: set color/timing directly, bypassing the
    /// event-priority policy.
    pub fn set_raw_attributes(&mut self, color: (u8, u8, u8), on_ms: u32, off_ms: u32) {
        self.raw_override = Some(Override::Pattern(LedPattern {
            color,
            on_ms,
            off_ms,
            flash_mode: if off_ms > 0 { FlashMode::Timed } else { FlashMode::None },
            brightness_mode: BrightnessMode::User,
        }));
    }

    pub fn force_on(&mut self) {
        let pattern = match self.raw_override {
            Some(Override::Pattern(p)) => p,
            _ => LedPattern::solid((255, 255, 255)),
        };
        self.raw_override = Some(Override::Pattern(pattern));
    }

    pub fn force_off(&mut self) {
        self.raw_override = Some(Override::ForcedOff);
    }

    pub fn clear_raw_override(&mut self) {
        self.raw_override = None;
    }

    /// Select the pattern to drive, or `None` to turn the LED off. Forced
    /// off whenever the display is not off.
    pub fn evaluate(&self) -> Option<LedPattern> {
        if self.display_power_mode != DisplayPowerMode::Off {
            return None;
        }

        if let Some(raw) = self.raw_override {
            return match raw {
                Override::Pattern(p) => Some(p),
                Override::ForcedOff => None,
            };
        }

        for kind in LightEventKind::PRIORITY_ORDER {
            let idx = kind.index();
            if self.enabled[idx] && self.active[idx] {
                return Some(self.patterns[idx]);
            }
        }
        None
    }
}

impl Default for LedPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_policy() -> LedPolicy {
        let mut p = LedPolicy::new();
        p.set_display_power_mode(DisplayPowerMode::Off);
        p
    }

    #[test]
    fn no_event_enabled_and_active_turns_led_off() {
        let policy = on_policy();
        assert!(policy.evaluate().is_none());
    }

    #[test]
    fn priority_order_picks_highest_priority_active_event() {
        let mut policy = on_policy();
        policy.set_enabled(LightEventKind::Playing, true);
        policy.set_active(LightEventKind::Playing, true);
        policy.set_enabled(LightEventKind::UnreadNotifications, true);
        policy.set_active(LightEventKind::UnreadNotifications, true);

        let selected = policy.evaluate().unwrap();
        assert_eq!(selected, LedPattern::default_preset(LightEventKind::UnreadNotifications));

        policy.set_enabled(LightEventKind::BatteryLow, true);
        policy.set_active(LightEventKind::BatteryLow, true);
        let selected = policy.evaluate().unwrap();
        assert_eq!(selected, LedPattern::default_preset(LightEventKind::BatteryLow));
    }

    #[test]
    fn enabled_without_active_does_not_select() {
        let mut policy = on_policy();
        policy.set_enabled(LightEventKind::BatteryLow, true);
        assert!(policy.evaluate().is_none());
    }

    #[test]
    fn display_on_forces_led_off_regardless_of_events() {
        let mut policy = on_policy();
        policy.set_enabled(LightEventKind::BatteryLow, true);
        policy.set_active(LightEventKind::BatteryLow, true);
        policy.set_display_power_mode(DisplayPowerMode::On);
        assert!(policy.evaluate().is_none());
    }

    #[test]
    fn battery_derived_flags_update_on_notification() {
        let mut policy = on_policy();
        policy.set_enabled(LightEventKind::BatteryLow, true);
        policy.update_from_battery(BatteryInfo {
            percentage: 5,
            ..Default::default()
        });
        assert!(policy.evaluate().is_some());
    }

    #[test]
    fn set_playing_data_overwrites_preset() {
        let mut policy = on_policy();
        policy.set_playing_data((1, 2, 3), 10, 20);
        policy.set_enabled(LightEventKind::Playing, true);
        policy.set_active(LightEventKind::Playing, true);
        let selected = policy.evaluate().unwrap();
        assert_eq!(selected.color, (1, 2, 3));
        assert_eq!(selected.on_ms, 10);
        assert_eq!(selected.off_ms, 20);
    }

    #[test]
    fn raw_override_takes_precedence_over_policy() {
        let mut policy = on_policy();
        policy.set_enabled(LightEventKind::BatteryLow, true);
        policy.set_active(LightEventKind::BatteryLow, true);
        policy.set_raw_attributes((9, 9, 9), 1, 1);
        assert_eq!(policy.evaluate().unwrap().color, (9, 9, 9));

        policy.force_off();
        assert!(policy.evaluate().is_none());

        policy.clear_raw_override();
        assert_eq!(
            policy.evaluate().unwrap(),
            LedPattern::default_preset(LightEventKind::BatteryLow)
        );
    }

    #[test]
    fn hex_color_parses_both_forms() {
        assert_eq!(parse_hex_color("0xFF00AA"), Some((0xFF, 0x00, 0xAA)));
        assert_eq!(parse_hex_color("FF00AA"), Some((0xFF, 0x00, 0xAA)));
        assert_eq!(parse_hex_color("nonsense"), None);
    }
}
