//! Shared types for roomtalk.
//!
//! This crate contains the value types exchanged between the roomtalk
//! workspace crates: chat log entries, room participants, transport events,
//! connection credentials and options.

pub mod entry;
pub mod room;

pub use entry::{ChatEntry, EntryId, Origin, SYSTEM_SENDER};
pub use room::{
    ConnectOptions, Credentials, IceTransportPolicy, Participant, RoomEvent, CHAT_TOPIC,
};
