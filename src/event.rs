//! Event queue: the single FIFO of typed events feeding the state
//! machine. Producers are non-blocking (`tokio::sync::mpsc::UnboundedSender`);
//! delivery order is exactly insertion order.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::battery::PowerSupply;
use crate::led::LightEventKind;
use crate::state_machine::{DisplayPowerControlFilter, PowerAction};
use crate::timer::AlarmId;

/// Every input the state machine reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Alarm(AlarmId),

    PowerButtonPress,
    PowerButtonRelease,

    UserActivityChanging,
    UserActivityExtending,

    ActiveCall,
    NoActiveCall,

    Notification,
    NoNotification,

    ProximityFar,
    ProximityNear,

    EnableInactivityTimeout,
    DisableInactivityTimeout,
    SetInactivityBehavior {
        action: PowerAction,
        supply: PowerSupply,
        timeout: Duration,
    },

    LidClosed,
    LidOpen,
    SetLidBehavior {
        action: PowerAction,
        supply: PowerSupply,
    },

    PowerSourceChange,
    PowerSourceCritical,
    SetCriticalPowerBehavior {
        action: PowerAction,
    },

    AllowSuspend,
    DisallowSuspend,

    SystemResume,

    SetNormalBrightnessValue(f64),
    EnableAutobrightness,
    DisableAutobrightness,

    RequestTurnOnDisplay,

    /// A client-facing light-event update, routed to the LED policy
    /// rather than the display/suspend state machine.
    LightEventActive { event: LightEventKind, active: bool },
    LightEventEnabled { event: LightEventKind, enabled: bool },
    SetPlayingData { color: (u8, u8, u8), on_ms: u32, off_ms: u32 },

    BatteryInfoChanged(crate::battery::BatteryInfo),

    /// Informational mirror of a display-control filter change issued by the
    /// state machine, used only by tests that want to assert on what the
    /// adapter was actually told to do without inspecting adapter internals.
    #[doc(hidden)]
    DisplayControlFilterApplied(DisplayPowerControlFilter),
}

/// Thin FIFO wrapper. The queue itself never drops events; an unbounded
/// channel means producers never block, and capacity is bounded only by
/// process memory, so it backpressures only under memory pressure.
pub struct EventQueue {
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// A clonable, non-blocking handle for producers (adapters, IPC, timer).
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Consume the queue, returning the receiving half for the event loop.
    pub fn into_receiver(self) -> mpsc::UnboundedReceiver<Event> {
        self.rx
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_insertion_order() {
        let mut queue = EventQueue::new();
        let tx = queue.sender();
        tx.send(Event::PowerButtonPress).unwrap();
        tx.send(Event::PowerButtonRelease).unwrap();
        drop(tx);

        let mut rx = queue.into_receiver();
        assert_eq!(rx.recv().await, Some(Event::PowerButtonPress));
        assert_eq!(rx.recv().await, Some(Event::PowerButtonRelease));
        assert_eq!(rx.recv().await, None);
    }
}
