//! Realtime chat session controller for roomtalk.
//!
//! Owns the connection lifecycle to a room transport, the ordered message
//! log, and the typing indicator. [`SessionMachine`] holds the state and
//! decides what happens for each input; [`SessionController`] runs it on a
//! single event loop, executing its effects against the token service, the
//! room transport, and the reply gateway.

pub mod config;
pub mod controller;
pub mod error;
pub mod local;
pub mod log;
pub mod machine;
pub mod profile;
pub mod setup;
pub mod state;
pub mod typing;

pub use config::{Config, TransportKind};
pub use controller::{SessionController, SessionHandle, SessionServices, SessionSnapshot};
pub use error::SessionError;
pub use machine::{Effect, Input, Outgoing, SessionMachine};
pub use profile::SessionProfile;
pub use state::SessionState;
