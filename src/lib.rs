//! repowerd — power-management daemon core.
//!
//! The crate is organized leaf-first: small, independently testable building
//! blocks (`timer`, `event`, `allowance`, `configurable_value`, `led`) are
//! composed by the state machine (`state_machine`), which is driven by the
//! single-threaded event loop host (`event_loop`) and exposed to the outside
//! world through `adapters` (hardware/OS capability contracts) and `ipc`
//! (the D-Bus client surface).

pub mod adapters;
pub mod allowance;
pub mod battery;
pub mod config;
pub mod configurable_value;
pub mod error;
pub mod event;
pub mod event_loop;
pub mod led;
#[cfg(feature = "dbus")]
pub mod ipc;
pub mod state_machine;
pub mod timer;

pub use config::DaemonConfig;
pub use error::{ConfigError, IpcRequestError};
pub use event::Event;
pub use state_machine::StateMachine;
