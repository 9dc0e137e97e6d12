//! IPC surface: a D-Bus session-bus service translating client requests
//! into [`crate::event::Event`]s.

pub mod dbus;

use tokio::sync::mpsc;
use tracing::info;

use crate::event::Event;
use dbus::ManagerInterface;

/// Publish the manager interface on the session bus under `well_known_name`
/// and keep the connection alive until dropped.
pub async fn serve(well_known_name: &str, event_tx: mpsc::UnboundedSender<Event>) -> zbus::Result<zbus::Connection> {
    let interface = ManagerInterface::new(event_tx);
    let connection = zbus::connection::Builder::session()?
        .name(well_known_name)?
        .serve_at("/org/repowerd/Manager1", interface)?
        .build()
        .await?;

    info!(well_known_name, "D-Bus manager interface published");
    Ok(connection)
}
