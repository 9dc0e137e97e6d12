//! End-to-end scenarios exercising the state machine through its public
//! event API with fake adapters and a manually-advanced clock, the way the
//! original's behavioural test suite exercised `DefaultStateMachine`.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use repowerd::adapters::*;
use repowerd::battery::{BatteryInfo, PowerSupply};
use repowerd::event::Event;
use repowerd::led::LightEventKind;
use repowerd::state_machine::{
    Adapters, DisplayPowerChangeReason, DisplayPowerMode, PowerAction, StateMachine,
    StateMachineConfig,
};
use repowerd::timer::ManualTimer;

#[derive(Default)]
struct RecordingSystemPowerControl {
    suspended: AtomicBool,
    powered_off: AtomicBool,
}

impl SystemPowerControl for RecordingSystemPowerControl {
    fn suspend(&self) {
        self.suspended.store(true, Ordering::SeqCst);
    }
    fn power_off(&self) {
        self.powered_off.store(true, Ordering::SeqCst);
    }
    fn allow_automatic_suspend(&self, _id: &str) {}
    fn disallow_automatic_suspend(&self, _id: &str) {}
    fn allow_default_system_handlers(&self) {}
    fn disallow_default_system_handlers(&self) {}
}

#[derive(Default)]
struct RecordingPowerButtonEventSink {
    long_presses: AtomicUsize,
}

impl PowerButtonEventSink for RecordingPowerButtonEventSink {
    fn notify_long_press(&self) {
        self.long_presses.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingLightControl {
    on_calls: AtomicUsize,
    off_calls: AtomicUsize,
    last_color: (AtomicU8, AtomicU8, AtomicU8),
    last_on_ms: AtomicU32,
    last_off_ms: AtomicU32,
}

impl LightControl for RecordingLightControl {
    fn set_led_attributes(&self, color: (u8, u8, u8), on_ms: u32, off_ms: u32) {
        self.last_color.0.store(color.0, Ordering::SeqCst);
        self.last_color.1.store(color.1, Ordering::SeqCst);
        self.last_color.2.store(color.2, Ordering::SeqCst);
        self.last_on_ms.store(on_ms, Ordering::SeqCst);
        self.last_off_ms.store(off_ms, Ordering::SeqCst);
    }
    fn turn_led_on(&self) {
        self.on_calls.fetch_add(1, Ordering::SeqCst);
    }
    fn turn_led_off(&self) {
        self.off_calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn default_adapters() -> Adapters {
    Adapters {
        brightness_control: Arc::new(LoggingBrightnessControl),
        display_information: Arc::new(LoggingDisplayInformation),
        display_power_control: Arc::new(LoggingDisplayPowerControl),
        display_power_event_sink: Arc::new(LoggingDisplayPowerEventSink),
        light_control: Arc::new(LoggingLightControl),
        modem_power_control: Arc::new(LoggingModemPowerControl),
        performance_booster: Arc::new(LoggingPerformanceBooster),
        power_button_event_sink: Arc::new(LoggingPowerButtonEventSink),
        power_source: Arc::new(LoggingPowerSource),
        proximity_sensor: Arc::new(LoggingProximitySensor),
        system_power_control: Arc::new(LoggingSystemPowerControl),
    }
}

fn run_alarms(sm: &mut StateMachine, timer: &Arc<ManualTimer>, advance: Duration) {
    for id in timer.advance(advance) {
        sm.handle(Event::Alarm(id));
    }
}

#[test]
fn s1_inactivity_turns_off_display_after_normal_timeout() {
    let timer = ManualTimer::new();
    let mut sm = StateMachine::new(timer.clone(), default_adapters(), StateMachineConfig::default());
    sm.start();
    assert_eq!(sm.display_power_mode(), DisplayPowerMode::On);

    run_alarms(&mut sm, &timer, Duration::from_secs(61));
    assert_eq!(sm.display_power_mode(), DisplayPowerMode::Off);
}

#[test]
fn s2_power_button_long_press_is_detected_and_suppresses_short_press_toggle() {
    let timer = ManualTimer::new();
    let sink = Arc::new(RecordingPowerButtonEventSink::default());
    let mut adapters = default_adapters();
    adapters.power_button_event_sink = sink.clone();
    let mut config = StateMachineConfig::default();
    config.treat_power_button_as_user_activity = false;

    let mut sm = StateMachine::new(timer.clone(), adapters, config);
    sm.start();

    sm.handle(Event::PowerButtonPress);
    run_alarms(&mut sm, &timer, Duration::from_millis(2001));
    assert_eq!(sink.long_presses.load(Ordering::SeqCst), 1);

    // The display must stay as the long-press left it; release after a long
    // press must not toggle it off again.
    let mode_before_release = sm.display_power_mode();
    sm.handle(Event::PowerButtonRelease);
    assert_eq!(sm.display_power_mode(), mode_before_release);
}

#[test]
fn s3_notification_extends_but_never_shortens_the_display_off_deadline() {
    let timer = ManualTimer::new();
    let mut sm = StateMachine::new(timer.clone(), default_adapters(), StateMachineConfig::default());
    sm.start();
    assert_eq!(sm.display_power_mode(), DisplayPowerMode::On);

    // Normal timeout is 60s; a notification 5s in schedules a
    // post-notification deadline at +30s from now (35s), which is earlier
    // than the already-armed 60s deadline, so it must be ignored.
    run_alarms(&mut sm, &timer, Duration::from_secs(5));
    sm.handle(Event::Notification);
    sm.handle(Event::NoNotification);

    run_alarms(&mut sm, &timer, Duration::from_secs(30));
    assert_eq!(
        sm.display_power_mode(),
        DisplayPowerMode::On,
        "post-notification timeout must not shorten an already-later normal deadline"
    );

    run_alarms(&mut sm, &timer, Duration::from_secs(26));
    assert_eq!(sm.display_power_mode(), DisplayPowerMode::Off);
}

#[test]
fn s4_lid_close_without_external_display_suspends_by_default() {
    let timer = ManualTimer::new();
    let system_power_control = Arc::new(RecordingSystemPowerControl::default());
    let mut adapters = default_adapters();
    adapters.system_power_control = system_power_control.clone();

    let mut sm = StateMachine::new(timer, adapters, StateMachineConfig::default());
    sm.start();

    sm.handle(Event::LidClosed);
    assert_eq!(sm.display_power_mode(), DisplayPowerMode::Off);
    assert!(system_power_control.suspended.load(Ordering::SeqCst));
}

#[test]
fn s5_critical_power_honors_configured_action() {
    let timer = ManualTimer::new();
    let system_power_control = Arc::new(RecordingSystemPowerControl::default());
    let mut adapters = default_adapters();
    adapters.system_power_control = system_power_control.clone();

    let mut sm = StateMachine::new(timer, adapters, StateMachineConfig::default());
    sm.start();

    sm.handle(Event::SetCriticalPowerBehavior { action: PowerAction::Suspend });
    sm.handle(Event::PowerSourceCritical);
    assert!(system_power_control.suspended.load(Ordering::SeqCst));
    assert!(!system_power_control.powered_off.load(Ordering::SeqCst));
}

#[test]
fn s6_led_reflects_highest_priority_active_event_only_while_display_off() {
    let timer = ManualTimer::new();
    let mut sm = StateMachine::new(timer.clone(), default_adapters(), StateMachineConfig::default());
    sm.start();

    sm.handle(Event::LightEventEnabled { event: LightEventKind::BatteryCharging, enabled: true });
    sm.handle(Event::BatteryInfoChanged(BatteryInfo {
        is_present: true,
        percentage: 50,
        state: repowerd::battery::BatteryChargeState::Charging,
        temperature: 25.0,
    }));

    // Display is still on at this point; the LED policy must stay dark.
    assert!(sm.led_policy().evaluate().is_none());

    run_alarms(&mut sm, &timer, Duration::from_secs(61));
    assert_eq!(sm.display_power_mode(), DisplayPowerMode::Off);
    assert!(sm.led_policy().evaluate().is_some());
}

#[test]
fn s7_set_inactivity_behavior_rejects_non_positive_timeout_without_changing_state() {
    let timer = ManualTimer::new();
    let mut sm = StateMachine::new(timer.clone(), default_adapters(), StateMachineConfig::default());
    sm.start();

    sm.handle(Event::SetInactivityBehavior {
        action: PowerAction::DisplayOff,
        supply: PowerSupply::LinePower,
        timeout: Duration::ZERO,
    });

    // Normal timeout is unaffected, so the display still turns off at 60s.
    run_alarms(&mut sm, &timer, Duration::from_secs(61));
    assert_eq!(sm.display_power_mode(), DisplayPowerMode::Off);
    assert_eq!(sm.display_power_mode_reason(), DisplayPowerChangeReason::Activity);
}

#[test]
fn s8_call_ending_while_display_off_still_arms_the_reduced_timeout() {
    // Display starts off, then a call ends with proximity far: the display
    // must turn on with the *reduced* timeout and actually turn back off
    // once it elapses, instead of staying on forever because no deadline
    // had been scheduled yet.
    let timer = ManualTimer::new();
    let mut sm = StateMachine::new(timer.clone(), default_adapters(), StateMachineConfig::default());
    sm.start();
    run_alarms(&mut sm, &timer, Duration::from_secs(61));
    assert_eq!(sm.display_power_mode(), DisplayPowerMode::Off);

    sm.handle(Event::NoActiveCall);
    assert_eq!(sm.display_power_mode(), DisplayPowerMode::On);
    assert_eq!(sm.display_power_mode_reason(), DisplayPowerChangeReason::CallDone);

    run_alarms(&mut sm, &timer, Duration::from_secs(11));
    assert_eq!(sm.display_power_mode(), DisplayPowerMode::Off);
}

#[test]
fn s9_led_adapter_is_actuated_when_display_turns_off_with_an_active_event() {
    let timer = ManualTimer::new();
    let light_control = Arc::new(RecordingLightControl::default());
    let mut adapters = default_adapters();
    adapters.light_control = light_control.clone();

    let mut sm = StateMachine::new(timer.clone(), adapters, StateMachineConfig::default());
    sm.start();

    sm.handle(Event::LightEventEnabled { event: LightEventKind::BatteryLow, enabled: true });
    sm.handle(Event::BatteryInfoChanged(BatteryInfo {
        is_present: true,
        percentage: 5,
        state: repowerd::battery::BatteryChargeState::Discharging,
        temperature: 25.0,
    }));
    // Display is still on, so evaluating the policy would light the LED,
    // but the adapter must stay off until the display actually turns off.
    assert_eq!(light_control.on_calls.load(Ordering::SeqCst), 0);

    run_alarms(&mut sm, &timer, Duration::from_secs(61));
    assert_eq!(sm.display_power_mode(), DisplayPowerMode::Off);
    assert!(light_control.on_calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(light_control.last_color.0.load(Ordering::SeqCst), 255);
}
