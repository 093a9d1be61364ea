//! WebSocket transport seam and a connection loop with fixed-delay reconnect.

pub mod client;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod transport;

pub use client::{ConnectionHandler, WsConnConfig, WsConnection};
pub use transport::{Connector, FrameSink, FrameStream, TungsteniteConnector, WsFrame};
