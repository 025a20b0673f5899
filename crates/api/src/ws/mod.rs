//! WebSocket streaming of session events.

mod handler;

pub use handler::ws_handler;
