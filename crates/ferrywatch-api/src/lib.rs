// ferrywatch-api: wire layer for the resource watch client (transport + envelope)

pub mod error;
pub mod transport;
pub mod websocket;
pub mod wire;

pub use error::Error;
pub use transport::{FrameStream, Transport};
pub use websocket::WebSocketTransport;
pub use wire::{RawAction, RawEvent};
