//! The D-Bus interface itself: a thin struct holding an event-queue sender,
//! one `#[interface]` method per client-facing request, validating input
//! and translating it into an [`Event`] before returning.

use tokio::sync::mpsc;
use zbus::interface;

use crate::battery::PowerSupply;
use crate::error::IpcRequestError;
use crate::event::Event;
use crate::led::{parse_hex_color, LightEventKind};
use crate::state_machine::PowerAction;

pub struct ManagerInterface {
    event_tx: mpsc::UnboundedSender<Event>,
}

impl ManagerInterface {
    pub fn new(event_tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { event_tx }
    }

    fn send(&self, event: Event) {
        // The event queue never drops events nor applies backpressure; a
        // send error only happens once the event loop has already shut
        // down, at which point there is nothing useful to do.
        let _ = self.event_tx.send(event);
    }

    fn parse_action(action: &str) -> Result<PowerAction, IpcRequestError> {
        PowerAction::from_str_loose(action).ok_or_else(|| IpcRequestError::UnknownPowerAction(action.to_string()))
    }

    fn parse_supply(supply: &str) -> Result<PowerSupply, IpcRequestError> {
        PowerSupply::from_str_loose(supply).ok_or_else(|| IpcRequestError::UnknownPowerSupply(supply.to_string()))
    }

    fn parse_light_event(name: &str) -> Result<LightEventKind, IpcRequestError> {
        LightEventKind::from_str_exact(name).ok_or_else(|| IpcRequestError::UnknownLightEvent(name.to_string()))
    }
}

#[interface(name = "org.repowerd.Manager1")]
impl ManagerInterface {
    async fn power_button_press(&self) {
        self.send(Event::PowerButtonPress);
    }

    async fn power_button_release(&self) {
        self.send(Event::PowerButtonRelease);
    }

    async fn user_activity_changing_power_state(&self) {
        self.send(Event::UserActivityChanging);
    }

    async fn user_activity_extending_power_state(&self) {
        self.send(Event::UserActivityExtending);
    }

    async fn notify_active_call(&self) {
        self.send(Event::ActiveCall);
    }

    async fn notify_no_active_call(&self) {
        self.send(Event::NoActiveCall);
    }

    async fn notify_notification(&self) {
        self.send(Event::Notification);
    }

    async fn notify_no_notification(&self) {
        self.send(Event::NoNotification);
    }

    async fn enable_inactivity_timeout(&self) {
        self.send(Event::EnableInactivityTimeout);
    }

    async fn disable_inactivity_timeout(&self) {
        self.send(Event::DisableInactivityTimeout);
    }

    async fn set_inactivity_behavior(
        &self,
        power_action: &str,
        power_supply: &str,
        timeout_ms: i64,
    ) -> Result<(), zbus::fdo::Error> {
        if timeout_ms <= 0 {
            return Err(IpcRequestError::InvalidTimeout(timeout_ms).into());
        }
        let action = Self::parse_action(power_action)?;
        let supply = Self::parse_supply(power_supply)?;
        self.send(Event::SetInactivityBehavior {
            action,
            supply,
            timeout: std::time::Duration::from_millis(timeout_ms as u64),
        });
        Ok(())
    }

    async fn notify_lid_closed(&self) {
        self.send(Event::LidClosed);
    }

    async fn notify_lid_open(&self) {
        self.send(Event::LidOpen);
    }

    async fn set_lid_behavior(&self, power_action: &str, power_supply: &str) -> Result<(), zbus::fdo::Error> {
        let action = Self::parse_action(power_action)?;
        let supply = Self::parse_supply(power_supply)?;
        self.send(Event::SetLidBehavior { action, supply });
        Ok(())
    }

    async fn notify_power_source_change(&self) {
        self.send(Event::PowerSourceChange);
    }

    async fn notify_power_source_critical(&self) {
        self.send(Event::PowerSourceCritical);
    }

    async fn set_critical_power_behavior(&self, power_action: &str) -> Result<(), zbus::fdo::Error> {
        let action = Self::parse_action(power_action)?;
        self.send(Event::SetCriticalPowerBehavior { action });
        Ok(())
    }

    async fn allow_suspend(&self) {
        self.send(Event::AllowSuspend);
    }

    async fn disallow_suspend(&self) {
        self.send(Event::DisallowSuspend);
    }

    async fn notify_system_resume(&self) {
        self.send(Event::SystemResume);
    }

    async fn set_normal_brightness_value(&self, value: f64) {
        self.send(Event::SetNormalBrightnessValue(value));
    }

    async fn enable_autobrightness(&self) {
        self.send(Event::EnableAutobrightness);
    }

    async fn disable_autobrightness(&self) {
        self.send(Event::DisableAutobrightness);
    }

    async fn request_turn_on_display(&self) {
        self.send(Event::RequestTurnOnDisplay);
    }

    async fn set_light_event_active(&self, event_name: &str, active: bool) -> Result<(), zbus::fdo::Error> {
        let event = Self::parse_light_event(event_name)?;
        self.send(Event::LightEventActive { event, active });
        Ok(())
    }

    async fn set_light_event_enabled(&self, event_name: &str, enabled: bool) -> Result<(), zbus::fdo::Error> {
        let event = Self::parse_light_event(event_name)?;
        self.send(Event::LightEventEnabled { event, enabled });
        Ok(())
    }

    async fn set_playing_data(&self, color: &str, on_ms: u32, off_ms: u32) -> Result<(), zbus::fdo::Error> {
        let color = parse_hex_color(color).ok_or_else(|| IpcRequestError::InvalidColor(color.to_string()))?;
        self.send(Event::SetPlayingData { color, on_ms, off_ms });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_unknown_power_action() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let iface = ManagerInterface::new(tx);
        let err = iface.set_critical_power_behavior("nonsense").await.unwrap_err();
        assert!(err.to_string().contains("unknown power action"));
    }

    #[tokio::test]
    async fn rejects_non_positive_inactivity_timeout() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let iface = ManagerInterface::new(tx);
        let err = iface
            .set_inactivity_behavior("suspend", "battery", 0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid timeout"));
    }

    #[tokio::test]
    async fn accepts_valid_set_playing_data() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let iface = ManagerInterface::new(tx);
        iface.set_playing_data("0xFF0000", 100, 200).await.unwrap();
        match rx.recv().await {
            Some(Event::SetPlayingData { color, on_ms, off_ms }) => {
                assert_eq!(color, (0xFF, 0, 0));
                assert_eq!(on_ms, 100);
                assert_eq!(off_ms, 200);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_unrecognized_light_event_name() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let iface = ManagerInterface::new(tx);
        let err = iface.set_light_event_active("NotAThing", true).await.unwrap_err();
        assert!(err.to_string().contains("unknown light event"));
    }
}
