//! Error taxonomy.
//!
//! Per spec, only two classes of failure are representable as `Result`s:
//! malformed configuration (fails daemon startup) and malformed client
//! requests (rejected at the IPC boundary, never reach the state machine).
//! Adapter failures are logged and swallowed at the call site; invariant
//! violations are bugs and panic.

use thiserror::Error;

/// Errors loading or parsing the daemon's configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid duration for `{field}`: {reason}")]
    InvalidDuration { field: &'static str, reason: String },
}

/// Errors rejecting a malformed client request at the IPC boundary.
///
/// These never reach the state machine: the IPC layer validates and
/// translates client calls into [`crate::Event`]s, returning this error
/// (mapped to `org.freedesktop.DBus.Error.NotSupported` on the D-Bus
/// transport) instead of enqueuing anything when validation fails.
#[derive(Error, Debug)]
pub enum IpcRequestError {
    #[error("unknown light event: {0}")]
    UnknownLightEvent(String),

    #[error("invalid color string: {0}")]
    InvalidColor(String),

    #[error("invalid timeout: {0}ms")]
    InvalidTimeout(i64),

    #[error("unknown power action: {0}")]
    UnknownPowerAction(String),

    #[error("unknown power supply: {0}")]
    UnknownPowerSupply(String),
}

#[cfg(feature = "dbus")]
impl From<IpcRequestError> for zbus::fdo::Error {
    fn from(e: IpcRequestError) -> Self {
        zbus::fdo::Error::NotSupported(e.to_string())
    }
}
