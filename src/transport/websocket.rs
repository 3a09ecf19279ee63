//! Persistent WebSocket delivery
//!
//! This module keeps at most one open connection to the collector and sends
//! each report as a single text frame. The connection is dialed lazily on
//! the first delivery, reused while sends succeed, and closed and forgotten
//! as soon as one fails. The next delivery dials again from scratch.

use crate::config::TransportConfig;
use crate::core::Transport;
use crate::errors::DeliveryError;
use async_trait::async_trait;
use futures_util::SinkExt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// An open WebSocket connection to the collector.
///
/// Abstracted so the reconnect logic can be exercised with fakes.
#[async_trait]
pub trait WebSocketConnection: Send + Sync {
    /// Sends one text frame and flushes it.
    async fn send_text(&mut self, text: &str) -> Result<(), tungstenite::Error>;

    /// Sends a close frame. Errors are ignored; the connection is discarded either way.
    async fn close(&mut self);
}

/// Dials the collector.
#[async_trait]
pub trait WebSocketConnector: Send + Sync {
    /// Performs the handshake, presenting `Authorization: Bearer <api_key>` when a key is given.
    async fn connect(
        &self,
        url: &str,
        api_key: Option<&str>,
    ) -> Result<Box<dyn WebSocketConnection>, DeliveryError>;
}

/// [`WebSocketConnector`] backed by `tokio-tungstenite`. Supports `ws://` and `wss://`.
pub struct TungsteniteConnector;

#[async_trait]
impl WebSocketConnector for TungsteniteConnector {
    async fn connect(
        &self,
        url: &str,
        api_key: Option<&str>,
    ) -> Result<Box<dyn WebSocketConnection>, DeliveryError> {
        let connect_error = |source| DeliveryError::Connect {
            url: url.to_string(),
            source,
        };

        let mut request = url.into_client_request().map_err(connect_error)?;
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|_| DeliveryError::InvalidApiKey)?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (stream, response) = connect_async(request).await.map_err(connect_error)?;
        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(TungsteniteConnection { stream }))
    }
}

struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl WebSocketConnection for TungsteniteConnection {
    async fn send_text(&mut self, text: &str) -> Result<(), tungstenite::Error> {
        self.stream.send(Message::text(text.to_owned())).await
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "Error while closing WebSocket");
        }
    }
}

/// The transport's single, optional connection.
///
/// Owned exclusively by [`WebSocketTransport`]. A connection is taken out
/// for the duration of a send and only put back when the send succeeded, so
/// an interrupted or failed send always leaves the session empty.
#[derive(Default)]
pub struct TransportSession {
    connection: Option<Box<dyn WebSocketConnection>>,
}

impl TransportSession {
    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    fn take(&mut self) -> Option<Box<dyn WebSocketConnection>> {
        self.connection.take()
    }

    fn store(&mut self, connection: Box<dyn WebSocketConnection>) {
        self.connection = Some(connection);
    }

    async fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close().await;
        }
    }
}

/// Delivers reports over one reused WebSocket connection.
pub struct WebSocketTransport {
    url: String,
    api_key: Option<String>,
    connector: Box<dyn WebSocketConnector>,
    session: TransportSession,
    connect_timeout: Duration,
    send_timeout: Duration,
}

impl WebSocketTransport {
    /// Creates a new `WebSocketTransport`. No connection is made until the first delivery.
    pub fn new(
        url: String,
        api_key: Option<String>,
        connect_timeout: Duration,
        send_timeout: Duration,
    ) -> Self {
        Self {
            url,
            api_key,
            connector: Box::new(TungsteniteConnector),
            session: TransportSession::default(),
            connect_timeout,
            send_timeout,
        }
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(
            config.service_url.clone(),
            config.api_key().map(str::to_string),
            config.connect_timeout(),
            config.send_timeout(),
        )
    }

    /// Replaces the dialer (primarily for testing).
    pub fn with_connector(mut self, connector: Box<dyn WebSocketConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// Returns `true` while a connection is held for reuse.
    pub fn is_connected(&self) -> bool {
        self.session.is_open()
    }

    async fn connect(&self) -> Result<Box<dyn WebSocketConnection>, DeliveryError> {
        info!(url = %self.url, authenticated = self.api_key.is_some(), "Connecting to collector");
        let dial = self.connector.connect(&self.url, self.api_key.as_deref());
        let connection = timeout(self.connect_timeout, dial)
            .await
            .map_err(|_| DeliveryError::ConnectTimeout(self.connect_timeout))??;
        metrics::counter!("websocket_connects_total").increment(1);
        info!(url = %self.url, "Connected to collector");
        Ok(connection)
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn name(&self) -> &str {
        "websocket"
    }

    async fn deliver(&mut self, document: &str) -> Result<(), DeliveryError> {
        let mut connection = match self.session.take() {
            Some(connection) => connection,
            None => self.connect().await?,
        };

        let outcome = timeout(self.send_timeout, connection.send_text(document)).await;
        let error = match outcome {
            Ok(Ok(())) => {
                self.session.store(connection);
                return Ok(());
            }
            Ok(Err(e)) => DeliveryError::Send(e),
            Err(_) => DeliveryError::SendTimeout(self.send_timeout),
        };

        warn!(error = %error, "Send failed, dropping connection");
        let _ = timeout(self.send_timeout, connection.close()).await;
        Err(error)
    }

    async fn close(&mut self) {
        if self.session.is_open() {
            info!("Closing collector connection");
            let _ = timeout(self.send_timeout, self.session.close()).await;
        }
    }
}
