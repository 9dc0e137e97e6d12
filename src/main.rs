//! Daemon entry point: CLI parsing, config loading, adapter wiring and the
//! event-loop/IPC tasks (tracing_subscriber init, clap CLI, ctrlc-based
//! graceful shutdown).

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use repowerd::adapters::{
    LoggingBrightnessControl, LoggingDisplayInformation, LoggingDisplayPowerControl,
    LoggingDisplayPowerEventSink, LoggingLightControl, LoggingModemPowerControl,
    LoggingPerformanceBooster, LoggingPowerButtonEventSink, LoggingPowerSource,
    LoggingProximitySensor, LoggingSystemPowerControl,
};
use repowerd::config::DaemonConfig;
use repowerd::event::EventQueue;
use repowerd::event_loop::EventLoop;
use repowerd::state_machine::{Adapters, StateMachine};
use repowerd::timer::TokioTimer;

#[derive(Parser, Debug)]
#[command(name = "repowerd", version, about = "Power-management daemon")]
struct Cli {
    /// Path to a TOML config file; built-in defaults are used if omitted or
    /// absent on disk.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn load_config(cli: &Cli) -> DaemonConfig {
    match &cli.config {
        Some(path) => match DaemonConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                error!(%err, "failed to load config, falling back to defaults");
                DaemonConfig::default()
            }
        },
        None => DaemonConfig::default(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli);

    let event_queue = EventQueue::new();
    let event_tx = event_queue.sender();

    let timer = TokioTimer::spawn(event_tx.clone());

    let adapters = Adapters {
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
    };

    let state_machine = StateMachine::new(timer, adapters, config.state_machine_config());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let event_loop = EventLoop::new(state_machine, shutdown_rx);

    #[cfg(feature = "dbus")]
    let _connection = match repowerd::ipc::serve(&config.dbus_well_known_name, event_tx).await {
        Ok(connection) => Some(connection),
        Err(err) => {
            error!(%err, "failed to publish D-Bus interface, continuing without IPC");
            None
        }
    };
    #[cfg(not(feature = "dbus"))]
    drop(event_tx);

    ctrlc::set_handler(move || {
        info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    })?;

    event_loop.run(event_queue.into_receiver()).await;
    Ok(())
}
