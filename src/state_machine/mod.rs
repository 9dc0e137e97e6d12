//! The state machine: owns every piece of display/suspend/modem/lid
//! policy state and reduces incoming [`crate::event::Event`]s into adapter
//! calls. Single-threaded by construction — see [`crate::event_loop`] for the
//! host that feeds it.

pub mod types;

pub use types::{
    DisplayPowerChangeReason, DisplayPowerControlFilter, DisplayPowerMode, PowerAction,
    ProximityState, ScheduledTimeoutType, INFINITE_TIMEOUT,
};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::adapters::{
    BrightnessControl, DisplayInformation, DisplayPowerControl, DisplayPowerEventSink,
    LightControl, ModemPowerControl, PerformanceBooster, PowerButtonEventSink, PowerSource,
    ProximitySensor, SystemPowerControl,
};
use crate::allowance::{AllowanceLattice, Predicate};
use crate::battery::PowerSupply;
use crate::configurable_value::ConfigurableValue;
use crate::event::Event;
use crate::led::LedPolicy;
use crate::timer::{AlarmId, Timer};

const SUSPEND_ID: &str = "repowerd::StateMachine";

/// The scheduled display-off deadline, with the two sentinels a plain
/// `Option<Instant>` can't tell apart: nothing scheduled yet (`Unset`,
/// equivalent to -infinity, any candidate deadline is later) and an
/// infinite timeout configured (`Infinite`, equivalent to +infinity,
/// nothing is ever later).
#[derive(Debug, Clone, Copy)]
enum UserInactivityDeadline {
    Unset,
    Infinite,
    At(Instant),
}

/// `inactivity_timeout_allowances` source indices: AND lattice, blocked
/// unless every source permits the timeout.
mod inactivity_allowance {
    pub const CLIENT: usize = 0;
    pub const NOTIFICATION: usize = 1;
}

/// `proximity_enablements` source indices: OR lattice, enabled if any
/// source wants proximity events on.
mod proximity_enablement {
    pub const UNTIL_DISABLED: usize = 0;
    pub const UNTIL_FAR_EVENT_OR_TIMEOUT: usize = 1;
    pub const UNTIL_FAR_EVENT_OR_NOTIFICATION_EXPIRATION: usize = 2;
}

/// Fixed, non-reconfigurable durations read once at construction.
#[derive(Debug, Clone, Copy)]
pub struct StateMachineConfig {
    pub power_button_long_press_timeout: Duration,
    pub user_inactivity_normal_display_dim_duration: Duration,
    pub user_inactivity_normal_display_off_timeout: Duration,
    pub user_inactivity_normal_suspend_timeout: Duration,
    pub user_inactivity_reduced_display_off_timeout: Duration,
    pub user_inactivity_post_notification_display_off_timeout: Duration,
    pub notification_expiration_timeout: Duration,
    pub treat_power_button_as_user_activity: bool,
    pub turn_on_display_at_startup: bool,
}

impl Default for StateMachineConfig {
    fn default() -> Self {
        Self {
            power_button_long_press_timeout: Duration::from_millis(2000),
            user_inactivity_normal_display_dim_duration: Duration::from_secs(10),
            user_inactivity_normal_display_off_timeout: Duration::from_secs(60),
            user_inactivity_normal_suspend_timeout: Duration::from_secs(300),
            user_inactivity_reduced_display_off_timeout: Duration::from_secs(10),
            user_inactivity_post_notification_display_off_timeout: Duration::from_secs(30),
            notification_expiration_timeout: Duration::from_secs(5),
            treat_power_button_as_user_activity: true,
            turn_on_display_at_startup: true,
        }
    }
}

/// The adapters the state machine drives. Grouped into one bundle so
/// construction reads as one call instead of eleven.
pub struct Adapters {
    pub brightness_control: Arc<dyn BrightnessControl>,
    pub display_information: Arc<dyn DisplayInformation>,
    pub display_power_control: Arc<dyn DisplayPowerControl>,
    pub display_power_event_sink: Arc<dyn DisplayPowerEventSink>,
    pub modem_power_control: Arc<dyn ModemPowerControl>,
    pub performance_booster: Arc<dyn PerformanceBooster>,
    pub light_control: Arc<dyn LightControl>,
    pub power_button_event_sink: Arc<dyn PowerButtonEventSink>,
    pub power_source: Arc<dyn PowerSource>,
    pub proximity_sensor: Arc<dyn ProximitySensor>,
    pub system_power_control: Arc<dyn SystemPowerControl>,
}

pub struct StateMachine {
    timer: Arc<dyn Timer>,
    adapters: Adapters,
    config: StateMachineConfig,

    led_policy: LedPolicy,

    display_power_mode: DisplayPowerMode,
    display_power_mode_reason: DisplayPowerChangeReason,
    display_power_mode_at_power_button_press: DisplayPowerMode,

    power_button_long_press_alarm_id: AlarmId,
    power_button_long_press_detected: bool,

    user_inactivity_display_dim_alarm_id: AlarmId,
    user_inactivity_display_off_alarm_id: AlarmId,
    user_inactivity_suspend_alarm_id: AlarmId,
    proximity_disable_alarm_id: AlarmId,
    notification_expiration_alarm_id: AlarmId,

    user_inactivity_display_off_time_point: UserInactivityDeadline,
    scheduled_timeout_type: ScheduledTimeoutType,

    user_inactivity_normal_display_off_timeout: ConfigurableValue<Duration>,
    user_inactivity_normal_suspend_timeout: ConfigurableValue<Duration>,
    lid_power_action: ConfigurableValue<PowerAction>,
    critical_power_action: PowerAction,

    inactivity_timeout_allowances: AllowanceLattice<2>,
    proximity_enablements: AllowanceLattice<3>,

    paused: bool,
    autobrightness_enabled: bool,
    normal_brightness_value: f64,
    lid_closed: bool,
    suspend_allowed: bool,
    suspend_pending: bool,
}

impl StateMachine {
    pub fn new(timer: Arc<dyn Timer>, adapters: Adapters, config: StateMachineConfig) -> Self {
        Self {
            timer,
            adapters,
            led_policy: LedPolicy::new(),

            display_power_mode: DisplayPowerMode::Off,
            display_power_mode_reason: DisplayPowerChangeReason::Unknown,
            display_power_mode_at_power_button_press: DisplayPowerMode::Unknown,

            power_button_long_press_alarm_id: AlarmId::INVALID,
            power_button_long_press_detected: false,

            user_inactivity_display_dim_alarm_id: AlarmId::INVALID,
            user_inactivity_display_off_alarm_id: AlarmId::INVALID,
            user_inactivity_suspend_alarm_id: AlarmId::INVALID,
            proximity_disable_alarm_id: AlarmId::INVALID,
            notification_expiration_alarm_id: AlarmId::INVALID,

            user_inactivity_display_off_time_point: UserInactivityDeadline::Unset,
            scheduled_timeout_type: ScheduledTimeoutType::None,

            user_inactivity_normal_display_off_timeout: ConfigurableValue::uniform(
                config.user_inactivity_normal_display_off_timeout,
            ),
            user_inactivity_normal_suspend_timeout: ConfigurableValue::uniform(
                config.user_inactivity_normal_suspend_timeout,
            ),
            lid_power_action: ConfigurableValue::uniform(PowerAction::Suspend),
            critical_power_action: PowerAction::PowerOff,

            inactivity_timeout_allowances: AllowanceLattice::new(Predicate::All, [true, true]),
            proximity_enablements: AllowanceLattice::new(Predicate::Any, [false, false, false]),

            paused: false,
            autobrightness_enabled: false,
            normal_brightness_value: 0.5,
            lid_closed: false,
            suspend_allowed: true,
            suspend_pending: false,

            config,
        }
    }

    /// Reduce one event. Returns nothing; all effects are side effects on
    /// adapters plus internal state.
    pub fn handle(&mut self, event: Event) {
        trace!(?event, "handling event");
        match event {
            Event::Alarm(id) => self.handle_alarm(id),
            Event::PowerButtonPress => self.handle_power_button_press(),
            Event::PowerButtonRelease => self.handle_power_button_release(),
            Event::UserActivityChanging => self.handle_user_activity_changing_power_state(),
            Event::UserActivityExtending => self.handle_user_activity_extending_power_state(),
            Event::ActiveCall => self.handle_active_call(),
            Event::NoActiveCall => self.handle_no_active_call(),
            Event::Notification => self.handle_notification(),
            Event::NoNotification => self.handle_no_notification(),
            Event::ProximityFar => self.handle_proximity_far(),
            Event::ProximityNear => self.handle_proximity_near(),
            Event::EnableInactivityTimeout => self.handle_enable_inactivity_timeout(),
            Event::DisableInactivityTimeout => self.handle_disable_inactivity_timeout(),
            Event::SetInactivityBehavior { action, supply, timeout } => {
                self.handle_set_inactivity_behavior(action, supply, timeout)
            }
            Event::LidClosed => self.handle_lid_closed(),
            Event::LidOpen => self.handle_lid_open(),
            Event::SetLidBehavior { action, supply } => self.handle_set_lid_behavior(action, supply),
            Event::PowerSourceChange => self.handle_power_source_change(),
            Event::PowerSourceCritical => self.handle_power_source_critical(),
            Event::SetCriticalPowerBehavior { action } => {
                self.handle_set_critical_power_behavior(action)
            }
            Event::AllowSuspend => self.handle_allow_suspend(),
            Event::DisallowSuspend => self.handle_disallow_suspend(),
            Event::SystemResume => self.handle_system_resume(),
            Event::SetNormalBrightnessValue(value) => self.handle_set_normal_brightness_value(value),
            Event::EnableAutobrightness => self.handle_enable_autobrightness(),
            Event::DisableAutobrightness => self.handle_disable_autobrightness(),
            Event::RequestTurnOnDisplay => self.turn_on_display_with_normal_timeout(DisplayPowerChangeReason::Unknown),
            Event::LightEventActive { event, active } => {
                self.led_policy.set_active(event, active);
                self.apply_led_policy();
            }
            Event::LightEventEnabled { event, enabled } => {
                self.led_policy.set_enabled(event, enabled);
                self.apply_led_policy();
            }
            Event::SetPlayingData { color, on_ms, off_ms } => {
                self.led_policy.set_playing_data(color, on_ms, off_ms);
                self.apply_led_policy();
            }
            Event::BatteryInfoChanged(info) => {
                self.led_policy.update_from_battery(info);
                self.apply_led_policy();
            }
            Event::DisplayControlFilterApplied(_) => {}
        }
    }

    /// Called once, before any events are pumped.
    pub fn start(&mut self) {
        let is_on_battery = self.adapters.power_source.is_using_battery_power();
        self.apply_power_source(is_on_battery);
        self.adapters.system_power_control.disallow_default_system_handlers();
        if self.config.turn_on_display_at_startup {
            self.turn_on_display_with_normal_timeout(DisplayPowerChangeReason::Unknown);
        }
    }

    pub fn pause(&mut self) {
        if self.power_button_long_press_alarm_id.is_valid() {
            self.timer.cancel_alarm(self.power_button_long_press_alarm_id);
            self.power_button_long_press_alarm_id = AlarmId::INVALID;
        }
        self.adapters.proximity_sensor.disable_proximity_events();
        self.adapters.brightness_control.disable_autobrightness();
        self.adapters.system_power_control.allow_default_system_handlers();
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.adapters.system_power_control.disallow_default_system_handlers();
        if self.autobrightness_enabled {
            self.adapters.brightness_control.enable_autobrightness();
        } else {
            self.adapters.brightness_control.disable_autobrightness();
        }
        self.adapters
            .brightness_control
            .set_normal_brightness_value(self.normal_brightness_value);
        self.turn_on_display_with_normal_timeout(DisplayPowerChangeReason::Unknown);
        if self.is_proximity_enabled() {
            self.adapters.proximity_sensor.enable_proximity_events();
        }
    }

    pub fn display_power_mode(&self) -> DisplayPowerMode {
        self.display_power_mode
    }

    pub fn display_power_mode_reason(&self) -> DisplayPowerChangeReason {
        self.display_power_mode_reason
    }

    pub fn led_policy(&self) -> &LedPolicy {
        &self.led_policy
    }

    // --- event handlers -----------------------------------------------

    fn handle_alarm(&mut self, id: AlarmId) {
        if id == self.power_button_long_press_alarm_id {
            self.adapters.power_button_event_sink.notify_long_press();
            self.power_button_long_press_detected = true;
            self.power_button_long_press_alarm_id = AlarmId::INVALID;
        } else if id == self.user_inactivity_display_dim_alarm_id {
            self.user_inactivity_display_dim_alarm_id = AlarmId::INVALID;
            if self.is_inactivity_timeout_application_allowed() {
                self.dim_display();
            }
        } else if id == self.user_inactivity_display_off_alarm_id {
            self.user_inactivity_display_off_alarm_id = AlarmId::INVALID;
            if self.is_inactivity_timeout_application_allowed() {
                self.turn_off_display(DisplayPowerChangeReason::Activity);
            }
            self.scheduled_timeout_type = ScheduledTimeoutType::None;
        } else if id == self.user_inactivity_suspend_alarm_id {
            self.user_inactivity_suspend_alarm_id = AlarmId::INVALID;
            if self.is_inactivity_timeout_application_allowed() {
                self.suspend_when_allowed();
            }
        } else if id == self.proximity_disable_alarm_id {
            self.proximity_disable_alarm_id = AlarmId::INVALID;
            self.disable_proximity(proximity_enablement::UNTIL_FAR_EVENT_OR_TIMEOUT);
        } else if id == self.notification_expiration_alarm_id {
            self.notification_expiration_alarm_id = AlarmId::INVALID;
            if self.display_power_mode == DisplayPowerMode::On {
                self.schedule_immediate_user_inactivity_alarm();
            }
            self.allow_inactivity_timeout(inactivity_allowance::NOTIFICATION);
            self.disable_proximity(proximity_enablement::UNTIL_FAR_EVENT_OR_NOTIFICATION_EXPIRATION);
        }
    }

    fn handle_active_call(&mut self) {
        if self.display_power_mode == DisplayPowerMode::On {
            self.brighten_display();
            self.schedule_normal_user_inactivity_alarm();
        } else if self.adapters.proximity_sensor.proximity_state() == ProximityState::Far {
            self.turn_on_display_with_normal_timeout(DisplayPowerChangeReason::Call);
        }
        self.enable_proximity(proximity_enablement::UNTIL_DISABLED);
    }

    fn handle_no_active_call(&mut self) {
        if self.display_power_mode == DisplayPowerMode::On {
            self.brighten_display();
            self.schedule_reduced_user_inactivity_alarm();
        } else if self.adapters.proximity_sensor.proximity_state() == ProximityState::Far {
            self.turn_on_display_with_reduced_timeout(DisplayPowerChangeReason::CallDone);
        } else {
            self.enable_proximity(proximity_enablement::UNTIL_FAR_EVENT_OR_TIMEOUT);
            self.schedule_proximity_disable_alarm();
        }
        self.disable_proximity(proximity_enablement::UNTIL_DISABLED);
    }

    fn handle_enable_inactivity_timeout(&mut self) {
        self.allow_inactivity_timeout(inactivity_allowance::CLIENT);
    }

    fn handle_disable_inactivity_timeout(&mut self) {
        self.disallow_inactivity_timeout(inactivity_allowance::CLIENT);
        if self.display_power_mode == DisplayPowerMode::On {
            self.brighten_display();
        } else {
            self.turn_on_display_without_timeout(DisplayPowerChangeReason::Unknown);
        }
    }

    fn handle_set_inactivity_behavior(&mut self, action: PowerAction, supply: PowerSupply, timeout: Duration) {
        if timeout.is_zero() {
            return;
        }
        if action != PowerAction::DisplayOff && action != PowerAction::Suspend {
            return;
        }

        let power_supply_is_active;
        let is_on_battery = self.user_inactivity_normal_display_off_timeout.is_on_battery;
        let target = if action == PowerAction::DisplayOff {
            &mut self.user_inactivity_normal_display_off_timeout
        } else {
            &mut self.user_inactivity_normal_suspend_timeout
        };

        if supply == PowerSupply::Battery {
            target.on_battery = timeout;
            power_supply_is_active = is_on_battery;
        } else {
            target.on_line_power = timeout;
            power_supply_is_active = !is_on_battery;
        }

        if self.scheduled_timeout_type == ScheduledTimeoutType::Normal && power_supply_is_active {
            self.schedule_normal_user_inactivity_alarm();
        }
    }

    fn handle_lid_closed(&mut self) {
        self.lid_closed = true;
        if !self.adapters.display_information.has_active_external_displays() {
            if self.display_power_mode == DisplayPowerMode::On {
                self.turn_off_display(DisplayPowerChangeReason::Unknown);
            }
            if self.lid_power_action.get() == PowerAction::Suspend {
                self.adapters.system_power_control.suspend();
            }
        } else {
            self.adapters
                .display_power_control
                .turn_off(DisplayPowerControlFilter::Internal);
        }
    }

    fn handle_lid_open(&mut self) {
        self.lid_closed = false;
        if self.display_power_mode == DisplayPowerMode::On {
            self.adapters
                .display_power_control
                .turn_on(DisplayPowerControlFilter::Internal);
            self.brighten_display();
            self.schedule_normal_user_inactivity_alarm();
            self.display_power_mode_reason = DisplayPowerChangeReason::Activity;
        } else {
            self.turn_on_display_with_normal_timeout(DisplayPowerChangeReason::Activity);
        }
    }

    fn handle_set_lid_behavior(&mut self, action: PowerAction, supply: PowerSupply) {
        if action != PowerAction::None && action != PowerAction::Suspend {
            return;
        }
        if supply == PowerSupply::Battery {
            self.lid_power_action.on_battery = action;
        } else {
            self.lid_power_action.on_line_power = action;
        }
    }

    fn handle_set_critical_power_behavior(&mut self, action: PowerAction) {
        if action != PowerAction::Suspend && action != PowerAction::PowerOff {
            return;
        }
        self.critical_power_action = action;
    }

    fn handle_no_notification(&mut self) {
        if self.display_power_mode == DisplayPowerMode::On {
            self.schedule_post_notification_user_inactivity_alarm();
        }
        self.allow_inactivity_timeout(inactivity_allowance::NOTIFICATION);
        self.disable_proximity(proximity_enablement::UNTIL_FAR_EVENT_OR_NOTIFICATION_EXPIRATION);
        self.cancel_notification_expiration_alarm();
    }

    fn handle_notification(&mut self) {
        self.disallow_inactivity_timeout(inactivity_allowance::NOTIFICATION);
        if self.display_power_mode == DisplayPowerMode::On {
            self.brighten_display();
        } else if self.adapters.proximity_sensor.proximity_state() == ProximityState::Far {
            self.turn_on_display_without_timeout(DisplayPowerChangeReason::Notification);
        } else {
            self.enable_proximity(proximity_enablement::UNTIL_FAR_EVENT_OR_NOTIFICATION_EXPIRATION);
        }
        self.schedule_notification_expiration_alarm();
    }

    fn handle_power_button_press(&mut self) {
        self.display_power_mode_at_power_button_press = self.display_power_mode;
        if self.config.treat_power_button_as_user_activity && self.display_power_mode == DisplayPowerMode::On {
            self.brighten_display();
            self.schedule_normal_user_inactivity_alarm();
            self.display_power_mode_reason = DisplayPowerChangeReason::PowerButton;
        } else if self.display_power_mode == DisplayPowerMode::Off {
            self.turn_on_display_with_normal_timeout(DisplayPowerChangeReason::PowerButton);
        }
        self.power_button_long_press_alarm_id =
            self.timer.schedule_alarm_in(self.config.power_button_long_press_timeout);
    }

    fn handle_power_button_release(&mut self) {
        if self.power_button_long_press_detected {
            self.power_button_long_press_detected = false;
        } else if self.display_power_mode_at_power_button_press == DisplayPowerMode::On
            && !self.config.treat_power_button_as_user_activity
        {
            self.turn_off_display(DisplayPowerChangeReason::PowerButton);
        }
        self.display_power_mode_at_power_button_press = DisplayPowerMode::Unknown;
        self.power_button_long_press_alarm_id = AlarmId::INVALID;
    }

    fn handle_power_source_change(&mut self) {
        let is_on_battery = self.adapters.power_source.is_using_battery_power();
        self.apply_power_source(is_on_battery);

        if self.display_power_mode == DisplayPowerMode::On {
            self.brighten_display();
            self.schedule_normal_user_inactivity_alarm();
            self.display_power_mode_reason = DisplayPowerChangeReason::Activity;
        } else if self.adapters.proximity_sensor.proximity_state() == ProximityState::Far {
            self.turn_on_display_with_reduced_timeout(DisplayPowerChangeReason::Notification);
        }
        self.schedule_normal_user_inactivity_suspend_alarm();
    }

    fn handle_power_source_critical(&mut self) {
        match self.critical_power_action {
            PowerAction::PowerOff => self.adapters.system_power_control.power_off(),
            PowerAction::Suspend => self.adapters.system_power_control.suspend(),
            _ => {}
        }
    }

    fn handle_proximity_far(&mut self) {
        let use_reduced_timeout = self.is_proximity_enabled_only_until_far_event_or_notification_expiration();
        self.disable_proximity(proximity_enablement::UNTIL_FAR_EVENT_OR_NOTIFICATION_EXPIRATION);
        self.disable_proximity(proximity_enablement::UNTIL_FAR_EVENT_OR_TIMEOUT);

        if self.display_power_mode == DisplayPowerMode::Off {
            if use_reduced_timeout {
                self.turn_on_display_with_reduced_timeout(DisplayPowerChangeReason::Proximity);
            } else {
                self.turn_on_display_with_normal_timeout(DisplayPowerChangeReason::Proximity);
            }
        }
    }

    fn handle_proximity_near(&mut self) {
        if self.display_power_mode == DisplayPowerMode::On {
            self.turn_off_display(DisplayPowerChangeReason::Proximity);
        }
    }

    fn handle_user_activity_changing_power_state(&mut self) {
        if self.display_power_mode == DisplayPowerMode::On {
            self.brighten_display();
            self.schedule_normal_user_inactivity_alarm();
            self.display_power_mode_reason = DisplayPowerChangeReason::Activity;
        } else if self.adapters.proximity_sensor.proximity_state() == ProximityState::Far {
            self.turn_on_display_with_normal_timeout(DisplayPowerChangeReason::Activity);
        }
    }

    fn handle_user_activity_extending_power_state(&mut self) {
        if self.display_power_mode == DisplayPowerMode::On {
            self.brighten_display();
            self.schedule_normal_user_inactivity_alarm();
            self.display_power_mode_reason = DisplayPowerChangeReason::Activity;
        }
    }

    fn handle_set_normal_brightness_value(&mut self, value: f64) {
        self.normal_brightness_value = value;
        if self.paused {
            return;
        }
        self.adapters.brightness_control.set_normal_brightness_value(value);
    }

    fn handle_enable_autobrightness(&mut self) {
        self.autobrightness_enabled = true;
        if self.paused {
            return;
        }
        self.adapters.brightness_control.enable_autobrightness();
    }

    fn handle_disable_autobrightness(&mut self) {
        self.autobrightness_enabled = false;
        if self.paused {
            return;
        }
        self.adapters.brightness_control.disable_autobrightness();
    }

    fn handle_allow_suspend(&mut self) {
        self.suspend_allowed = true;
        if self.display_power_mode == DisplayPowerMode::Off
            && self.display_power_mode_reason == DisplayPowerChangeReason::Activity
        {
            self.adapters.system_power_control.allow_automatic_suspend(SUSPEND_ID);
        }
        if self.suspend_pending {
            self.suspend_when_allowed();
        }
    }

    fn handle_disallow_suspend(&mut self) {
        self.suspend_allowed = false;
    }

    fn handle_system_resume(&mut self) {
        self.turn_on_display_with_normal_timeout(DisplayPowerChangeReason::Activity);
    }

    // --- alarm scheduling -----------------------------------------------

    fn cancel_user_inactivity_display_off_alarm(&mut self) {
        if self.user_inactivity_display_dim_alarm_id.is_valid() {
            self.timer.cancel_alarm(self.user_inactivity_display_dim_alarm_id);
            self.user_inactivity_display_dim_alarm_id = AlarmId::INVALID;
        }
        if self.user_inactivity_display_off_alarm_id.is_valid() {
            self.timer.cancel_alarm(self.user_inactivity_display_off_alarm_id);
            self.user_inactivity_display_off_alarm_id = AlarmId::INVALID;
        }
        self.user_inactivity_display_off_time_point = UserInactivityDeadline::Unset;
        self.scheduled_timeout_type = ScheduledTimeoutType::None;
    }

    fn cancel_user_inactivity_suspend_alarm(&mut self) {
        if self.user_inactivity_suspend_alarm_id.is_valid() {
            self.timer.cancel_alarm(self.user_inactivity_suspend_alarm_id);
            self.user_inactivity_suspend_alarm_id = AlarmId::INVALID;
        }
    }

    fn cancel_notification_expiration_alarm(&mut self) {
        if self.notification_expiration_alarm_id.is_valid() {
            self.timer.cancel_alarm(self.notification_expiration_alarm_id);
            self.notification_expiration_alarm_id = AlarmId::INVALID;
        }
    }

    fn schedule_normal_user_inactivity_alarm(&mut self) {
        self.schedule_normal_user_inactivity_display_off_alarm();
        self.schedule_normal_user_inactivity_suspend_alarm();
    }

    fn schedule_normal_user_inactivity_display_off_alarm(&mut self) {
        self.cancel_user_inactivity_display_off_alarm();
        self.scheduled_timeout_type = ScheduledTimeoutType::Normal;

        let timeout = self.user_inactivity_normal_display_off_timeout.get();
        if timeout >= INFINITE_TIMEOUT {
            self.user_inactivity_display_off_time_point = UserInactivityDeadline::Infinite;
            return;
        }

        let now = self.timer.now();
        self.user_inactivity_display_off_time_point = UserInactivityDeadline::At(now + timeout);
        if timeout > self.config.user_inactivity_normal_display_dim_duration {
            self.user_inactivity_display_dim_alarm_id = self
                .timer
                .schedule_alarm_in(timeout - self.config.user_inactivity_normal_display_dim_duration);
        }
        self.user_inactivity_display_off_alarm_id = self.timer.schedule_alarm_in(timeout);
    }

    fn schedule_normal_user_inactivity_suspend_alarm(&mut self) {
        self.cancel_user_inactivity_suspend_alarm();
        self.cancel_suspend_when_allowed();
        let timeout = self.user_inactivity_normal_suspend_timeout.get();
        if timeout < INFINITE_TIMEOUT {
            self.user_inactivity_suspend_alarm_id = self.timer.schedule_alarm_in(timeout);
        }
    }

    fn schedule_post_notification_user_inactivity_alarm(&mut self) {
        let tp = self.timer.now() + self.config.user_inactivity_post_notification_display_off_timeout;
        if self.is_later_than_scheduled(tp) {
            self.cancel_user_inactivity_display_off_alarm();
            self.user_inactivity_display_off_alarm_id = self
                .timer
                .schedule_alarm_in(self.config.user_inactivity_post_notification_display_off_timeout);
            self.user_inactivity_display_off_time_point = UserInactivityDeadline::At(tp);
            self.scheduled_timeout_type = ScheduledTimeoutType::PostNotification;
        }
    }

    fn schedule_reduced_user_inactivity_alarm(&mut self) {
        let tp = self.timer.now() + self.config.user_inactivity_reduced_display_off_timeout;
        if self.is_later_than_scheduled(tp) {
            self.cancel_user_inactivity_display_off_alarm();
            self.user_inactivity_display_off_alarm_id = self
                .timer
                .schedule_alarm_in(self.config.user_inactivity_reduced_display_off_timeout);
            self.user_inactivity_display_off_time_point = UserInactivityDeadline::At(tp);
            self.scheduled_timeout_type = ScheduledTimeoutType::Reduced;
        }
    }

    fn schedule_proximity_disable_alarm(&mut self) {
        if self.proximity_disable_alarm_id.is_valid() {
            self.timer.cancel_alarm(self.proximity_disable_alarm_id);
        }
        self.proximity_disable_alarm_id = self
            .timer
            .schedule_alarm_in(self.config.user_inactivity_reduced_display_off_timeout);
    }

    fn schedule_notification_expiration_alarm(&mut self) {
        self.cancel_notification_expiration_alarm();
        let timeout = self
            .user_inactivity_normal_display_off_timeout
            .get()
            .min(self.config.notification_expiration_timeout);
        self.notification_expiration_alarm_id = self.timer.schedule_alarm_in(timeout);
    }

    fn schedule_immediate_user_inactivity_alarm(&mut self) {
        let tp = self.timer.now();
        if self.is_later_than_scheduled(tp) {
            self.cancel_user_inactivity_display_off_alarm();
            self.user_inactivity_display_off_alarm_id = self.timer.schedule_alarm_in(Duration::ZERO);
            self.user_inactivity_display_off_time_point = UserInactivityDeadline::At(tp);
            self.scheduled_timeout_type = ScheduledTimeoutType::PostNotification;
        }
    }

    /// True if `candidate` is strictly later than the currently scheduled
    /// display-off deadline. Nothing scheduled yet always passes (-infinity);
    /// an infinite timeout never passes (+infinity); otherwise the inactivity
    /// timeout only ever extends, never shortens.
    fn is_later_than_scheduled(&self, candidate: Instant) -> bool {
        match self.user_inactivity_display_off_time_point {
            UserInactivityDeadline::Unset => true,
            UserInactivityDeadline::Infinite => false,
            UserInactivityDeadline::At(scheduled) => candidate > scheduled,
        }
    }

    // --- display / brightness transitions -------------------------------

    fn turn_off_display(&mut self, reason: DisplayPowerChangeReason) {
        if self.paused {
            return;
        }
        self.adapters.brightness_control.set_off_brightness();
        self.adapters
            .display_power_control
            .turn_off(DisplayPowerControlFilter::All);
        if reason != DisplayPowerChangeReason::Proximity {
            self.adapters.modem_power_control.set_low_power_mode();
        }
        self.display_power_mode = DisplayPowerMode::Off;
        self.display_power_mode_reason = reason;
        self.cancel_user_inactivity_display_off_alarm();
        self.adapters.display_power_event_sink.notify_display_power_off(reason);
        self.adapters.performance_booster.disable_interactive_mode();
        self.led_policy.set_display_power_mode(self.display_power_mode);
        self.apply_led_policy();

        if reason != DisplayPowerChangeReason::Proximity
            && (reason != DisplayPowerChangeReason::Activity || self.suspend_allowed)
        {
            self.adapters.system_power_control.allow_automatic_suspend(SUSPEND_ID);
        }
    }

    fn turn_on_display_without_timeout(&mut self, reason: DisplayPowerChangeReason) {
        if self.paused {
            return;
        }
        self.adapters.system_power_control.disallow_automatic_suspend(SUSPEND_ID);
        self.adapters.performance_booster.enable_interactive_mode();
        if self.lid_closed {
            self.adapters
                .display_power_control
                .turn_on(DisplayPowerControlFilter::External);
        } else {
            self.adapters
                .display_power_control
                .turn_on(DisplayPowerControlFilter::All);
        }
        self.display_power_mode = DisplayPowerMode::On;
        self.display_power_mode_reason = reason;
        self.led_policy.set_display_power_mode(self.display_power_mode);
        self.apply_led_policy();
        if !self.lid_closed {
            self.brighten_display();
        }
        self.adapters.modem_power_control.set_normal_power_mode();
        self.adapters.display_power_event_sink.notify_display_power_on(reason);
    }

    fn turn_on_display_with_normal_timeout(&mut self, reason: DisplayPowerChangeReason) {
        self.turn_on_display_without_timeout(reason);
        self.schedule_normal_user_inactivity_alarm();
    }

    fn turn_on_display_with_reduced_timeout(&mut self, reason: DisplayPowerChangeReason) {
        self.turn_on_display_without_timeout(reason);
        self.schedule_reduced_user_inactivity_alarm();
    }

    fn brighten_display(&self) {
        if self.paused {
            return;
        }
        self.adapters.brightness_control.set_normal_brightness();
    }

    fn dim_display(&self) {
        if self.paused {
            return;
        }
        self.adapters.brightness_control.set_dim_brightness();
    }

    /// Re-evaluate the LED policy and push the result to the light
    /// adapter. Called whenever a LED input or the display mode changes.
    fn apply_led_policy(&self) {
        match self.led_policy.evaluate() {
            Some(pattern) => {
                self.adapters
                    .light_control
                    .set_led_attributes(pattern.color, pattern.on_ms, pattern.off_ms);
                self.adapters.light_control.turn_led_on();
            }
            None => self.adapters.light_control.turn_led_off(),
        }
    }

    // --- allowance / enablement lattices ---------------------------------

    fn allow_inactivity_timeout(&mut self, source: usize) {
        if !self.is_inactivity_timeout_allowed() {
            let (_, after) = self.inactivity_timeout_allowances.set(source, true);
            if after && self.display_power_mode == DisplayPowerMode::On {
                if source == inactivity_allowance::NOTIFICATION
                    && self.scheduled_timeout_type == ScheduledTimeoutType::None
                {
                    self.turn_off_display(DisplayPowerChangeReason::Activity);
                } else if source == inactivity_allowance::CLIENT {
                    self.schedule_normal_user_inactivity_alarm();
                }
            }
        }
    }

    fn disallow_inactivity_timeout(&mut self, source: usize) {
        self.inactivity_timeout_allowances.set(source, false);
    }

    fn is_inactivity_timeout_allowed(&self) -> bool {
        self.inactivity_timeout_allowances.value()
    }

    fn is_inactivity_timeout_application_allowed(&self) -> bool {
        if self.is_inactivity_timeout_allowed() {
            return true;
        }
        matches!(
            self.display_power_mode_reason,
            DisplayPowerChangeReason::Notification | DisplayPowerChangeReason::Call
        )
    }

    fn enable_proximity(&mut self, source: usize) {
        let was_enabled = self.is_proximity_enabled();
        let (_, after) = self.proximity_enablements.set(source, true);
        if !was_enabled && after {
            self.adapters.proximity_sensor.enable_proximity_events();
        }
    }

    fn disable_proximity(&mut self, source: usize) {
        let was_enabled = self.is_proximity_enabled();
        let (_, after) = self.proximity_enablements.set(source, false);
        if was_enabled && !after {
            self.adapters.proximity_sensor.disable_proximity_events();
        }
    }

    fn is_proximity_enabled(&self) -> bool {
        self.proximity_enablements.value()
    }

    /// Exclusivity must be checked before the caller clears the source under
    /// test — see [`AllowanceLattice::is_only_source_set`].
    fn is_proximity_enabled_only_until_far_event_or_notification_expiration(&self) -> bool {
        self.proximity_enablements
            .is_only_source_set(proximity_enablement::UNTIL_FAR_EVENT_OR_NOTIFICATION_EXPIRATION)
    }

    fn suspend_when_allowed(&mut self) {
        if self.suspend_allowed {
            self.suspend_pending = false;
            if !self.paused {
                self.adapters.system_power_control.suspend();
            }
        } else {
            self.suspend_pending = true;
        }
    }

    fn cancel_suspend_when_allowed(&mut self) {
        self.suspend_pending = false;
    }

    fn apply_power_source(&mut self, is_on_battery: bool) {
        self.user_inactivity_normal_display_off_timeout.set_is_on_battery(is_on_battery);
        self.user_inactivity_normal_suspend_timeout.set_is_on_battery(is_on_battery);
        self.lid_power_action.set_is_on_battery(is_on_battery);
    }
}
