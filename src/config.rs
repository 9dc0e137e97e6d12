//! Daemon configuration ("configured parameters"), loaded from a TOML file
//! at startup: a flat `serde`-derived struct with a `Default` impl and a
//! `load` that reads-then-parses, wrapping both failure modes in
//! [`ConfigError`].

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::state_machine::{PowerAction, StateMachineConfig};

fn duration_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(ms))
}

fn duration_ms_serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// On-disk representation of [`StateMachineConfig`] plus the IPC bus name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    #[serde(
        rename = "power_button_long_press_timeout_ms",
        serialize_with = "duration_ms_serialize",
        deserialize_with = "duration_ms"
    )]
    pub power_button_long_press_timeout: Duration,

    #[serde(
        rename = "user_inactivity_normal_display_dim_duration_ms",
        serialize_with = "duration_ms_serialize",
        deserialize_with = "duration_ms"
    )]
    pub user_inactivity_normal_display_dim_duration: Duration,

    #[serde(
        rename = "user_inactivity_normal_display_off_timeout_ms",
        serialize_with = "duration_ms_serialize",
        deserialize_with = "duration_ms"
    )]
    pub user_inactivity_normal_display_off_timeout: Duration,

    #[serde(
        rename = "user_inactivity_normal_suspend_timeout_ms",
        serialize_with = "duration_ms_serialize",
        deserialize_with = "duration_ms"
    )]
    pub user_inactivity_normal_suspend_timeout: Duration,

    #[serde(
        rename = "user_inactivity_reduced_display_off_timeout_ms",
        serialize_with = "duration_ms_serialize",
        deserialize_with = "duration_ms"
    )]
    pub user_inactivity_reduced_display_off_timeout: Duration,

    #[serde(
        rename = "user_inactivity_post_notification_display_off_timeout_ms",
        serialize_with = "duration_ms_serialize",
        deserialize_with = "duration_ms"
    )]
    pub user_inactivity_post_notification_display_off_timeout: Duration,

    #[serde(
        rename = "notification_expiration_timeout_ms",
        serialize_with = "duration_ms_serialize",
        deserialize_with = "duration_ms"
    )]
    pub notification_expiration_timeout: Duration,

    pub treat_power_button_as_user_activity: bool,
    pub turn_on_display_at_startup: bool,

    /// Lid-close action while on line power; mirrors `lid_power_action` in
    /// the original state machine.
    pub lid_power_action_on_line_power: String,
    pub lid_power_action_on_battery: String,
    pub critical_power_action: String,

    /// D-Bus well-known name the IPC surface is published under.
    pub dbus_well_known_name: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let defaults = StateMachineConfig::default();
        Self {
            power_button_long_press_timeout: defaults.power_button_long_press_timeout,
            user_inactivity_normal_display_dim_duration: defaults
                .user_inactivity_normal_display_dim_duration,
            user_inactivity_normal_display_off_timeout: defaults
                .user_inactivity_normal_display_off_timeout,
            user_inactivity_normal_suspend_timeout: defaults.user_inactivity_normal_suspend_timeout,
            user_inactivity_reduced_display_off_timeout: defaults
                .user_inactivity_reduced_display_off_timeout,
            user_inactivity_post_notification_display_off_timeout: defaults
                .user_inactivity_post_notification_display_off_timeout,
            notification_expiration_timeout: defaults.notification_expiration_timeout,
            treat_power_button_as_user_activity: defaults.treat_power_button_as_user_activity,
            turn_on_display_at_startup: defaults.turn_on_display_at_startup,
            lid_power_action_on_line_power: "suspend".to_string(),
            lid_power_action_on_battery: "suspend".to_string(),
            critical_power_action: "power_off".to_string(),
            dbus_well_known_name: "org.repowerd.Manager1".to_string(),
        }
    }
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Resolve the textual lid/critical-power actions against
    /// [`PowerAction::from_str_loose`], falling back to the field's default
    /// on an unrecognized string rather than failing startup.
    pub fn state_machine_config(&self) -> StateMachineConfig {
        StateMachineConfig {
            power_button_long_press_timeout: self.power_button_long_press_timeout,
            user_inactivity_normal_display_dim_duration: self.user_inactivity_normal_display_dim_duration,
            user_inactivity_normal_display_off_timeout: self.user_inactivity_normal_display_off_timeout,
            user_inactivity_normal_suspend_timeout: self.user_inactivity_normal_suspend_timeout,
            user_inactivity_reduced_display_off_timeout: self.user_inactivity_reduced_display_off_timeout,
            user_inactivity_post_notification_display_off_timeout: self
                .user_inactivity_post_notification_display_off_timeout,
            notification_expiration_timeout: self.notification_expiration_timeout,
            treat_power_button_as_user_activity: self.treat_power_button_as_user_activity,
            turn_on_display_at_startup: self.turn_on_display_at_startup,
        }
    }

    pub fn lid_power_action_on_battery(&self) -> PowerAction {
        PowerAction::from_str_loose(&self.lid_power_action_on_battery).unwrap_or(PowerAction::Suspend)
    }

    pub fn lid_power_action_on_line_power(&self) -> PowerAction {
        PowerAction::from_str_loose(&self.lid_power_action_on_line_power).unwrap_or(PowerAction::Suspend)
    }

    pub fn critical_power_action(&self) -> PowerAction {
        PowerAction::from_str_loose(&self.critical_power_action).unwrap_or(PowerAction::PowerOff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_state_machine_defaults() {
        let config = DaemonConfig::default();
        let sm_config = config.state_machine_config();
        assert_eq!(
            sm_config.user_inactivity_normal_display_off_timeout,
            StateMachineConfig::default().user_inactivity_normal_display_off_timeout
        );
    }

    #[test]
    fn round_trips_through_toml() {
        let config = DaemonConfig::default();
        let serialized = toml::to_string(&config).expect("serialize");
        let parsed: DaemonConfig = toml::from_str(&serialized).expect("parse");
        assert_eq!(parsed.dbus_well_known_name, config.dbus_well_known_name);
        assert_eq!(
            parsed.user_inactivity_normal_suspend_timeout,
            config.user_inactivity_normal_suspend_timeout
        );
    }

    #[test]
    fn missing_file_reports_read_error() {
        let err = DaemonConfig::load(Path::new("/nonexistent/repowerd.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn unrecognized_power_action_falls_back_to_default() {
        let mut config = DaemonConfig::default();
        config.critical_power_action = "nonsense".to_string();
        assert_eq!(config.critical_power_action(), PowerAction::PowerOff);
    }
}
