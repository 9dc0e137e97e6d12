//! Data model shared by the state machine, LED policy and event queue.

/// DisplayPowerMode ∈ {unknown, on, off}. Initial: off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPowerMode {
    Unknown,
    On,
    Off,
}

/// Stamped on every display mode change; used to decide whether a side
/// effect (modem low-power, suspend-allow, inactivity-application override)
/// applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPowerChangeReason {
    Unknown,
    Activity,
    PowerButton,
    Proximity,
    Notification,
    Call,
    CallDone,
}

/// ProximityState ∈ {unknown, near, far}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProximityState {
    #[default]
    Unknown,
    Near,
    Far,
}

/// Targets for lid, critical-power and inactivity behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerAction {
    #[default]
    None,
    DisplayOff,
    Suspend,
    PowerOff,
}

impl PowerAction {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "display_off" | "display-off" => Some(Self::DisplayOff),
            "suspend" => Some(Self::Suspend),
            "power_off" | "power-off" => Some(Self::PowerOff),
            _ => None,
        }
    }
}

/// Records which family of timeout is currently armed for the display-off
/// alarm, used by the extend-only-never-shorten rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTimeoutType {
    None,
    Normal,
    PostNotification,
    Reduced,
}

/// Which set of displays a `DisplayPowerControl` call should affect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPowerControlFilter {
    All,
    Internal,
    External,
}

/// An "infinite sentinel" duration disables the corresponding alarm.
pub const INFINITE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(u64::MAX / 2);
