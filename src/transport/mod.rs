//! Delivery transports for the collector service.
//!
//! Every strategy implements [`Transport`]: the sampling loop hands it one
//! serialized document per cycle and only learns success or failure.
pub mod http;
pub mod stdout;
pub mod websocket;

pub use crate::core::Transport;
pub use http::HttpTransport;
pub use stdout::StdoutTransport;
pub use websocket::{TransportSession, WebSocketConnection, WebSocketConnector, WebSocketTransport};

use crate::config::{TransportConfig, TransportKind};

/// Builds the transport selected by the configuration.
pub fn from_config(config: &TransportConfig) -> anyhow::Result<Box<dyn Transport>> {
    let transport: Box<dyn Transport> = match config.kind {
        TransportKind::Http => Box::new(HttpTransport::from_config(config)?),
        TransportKind::Websocket => Box::new(WebSocketTransport::from_config(config)),
        TransportKind::Stdout => Box::new(StdoutTransport::new()),
    };
    Ok(transport)
}
