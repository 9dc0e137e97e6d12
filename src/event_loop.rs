//! Single-threaded event loop host: pumps [`Event`]s out of the queue
//! into the [`StateMachine`] one at a time, in strict FIFO order, until a
//! shutdown signal arrives. `tokio::select!` races the next unit of work
//! against a shutdown signal so either one wakes the loop promptly.

use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::event::Event;
use crate::state_machine::StateMachine;

/// Runs the state machine against a live event stream until `shutdown`
/// is signalled or the channel closes.
pub struct EventLoop {
    state_machine: StateMachine,
    shutdown: watch::Receiver<bool>,
}

impl EventLoop {
    pub fn new(state_machine: StateMachine, shutdown: watch::Receiver<bool>) -> Self {
        Self { state_machine, shutdown }
    }

    /// Drive the loop to completion. `start()` is called once before the
    /// first event is pumped, matching the original daemon's bootstrap
    /// order (adapters wired, then `start`, then the event pump).
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        self.state_machine.start();
        info!("event loop started");

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }

                event = events.recv() => {
                    match event {
                        Some(event) => self.state_machine.handle(event),
                        None => break,
                    }
                }
            }
        }

        info!("event loop stopped");
    }

    pub fn state_machine_mut(&mut self) -> &mut StateMachine {
        &mut self.state_machine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::*;
    use crate::state_machine::{Adapters, StateMachineConfig};
    use crate::timer::ManualTimer;
    use std::sync::Arc;

    fn adapters() -> Adapters {
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

    #[tokio::test]
    async fn stops_when_channel_closes() {
        let timer = ManualTimer::new();
        let sm = StateMachine::new(timer, adapters(), StateMachineConfig::default());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let event_loop = EventLoop::new(sm, shutdown_rx);

        let (tx, rx) = mpsc::unbounded_channel();
        drop(tx);
        event_loop.run(rx).await;
    }

    #[tokio::test]
    async fn stops_when_shutdown_signalled() {
        let timer = ManualTimer::new();
        let sm = StateMachine::new(timer, adapters(), StateMachineConfig::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let event_loop = EventLoop::new(sm, shutdown_rx);

        let (_tx, rx) = mpsc::unbounded_channel();
        shutdown_tx.send(true).unwrap();
        event_loop.run(rx).await;
    }
}
