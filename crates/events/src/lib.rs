//! Session event bus.
//!
//! This crate provides the observer side of the labeling session:
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`SessionEvent`]: the event envelope published on every session
//!   state change.
//! - [`EventLogger`]: background subscriber that traces every event.

pub mod bus;
pub mod event_types;
pub mod logger;

pub use bus::{EventBus, SessionEvent};
pub use logger::EventLogger;
