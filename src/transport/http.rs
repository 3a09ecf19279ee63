//! One-shot HTTP delivery.

use crate::config::TransportConfig;
use crate::core::Transport;
use crate::errors::DeliveryError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// POSTs each document to the collector.
///
/// One attempt per call. Only `200 OK` counts as delivered.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// Creates a new `HttpTransport`.
    ///
    /// `timeout` bounds the whole request, `connect_timeout` the TCP/TLS setup.
    pub fn new(url: String, connect_timeout: Duration, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, url })
    }

    pub fn from_config(config: &TransportConfig) -> Result<Self, DeliveryError> {
        Self::new(
            config.service_url.clone(),
            config.connect_timeout(),
            config.send_timeout(),
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip_all)]
    async fn deliver(&mut self, document: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(document.to_owned())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = %status, "Collector rejected report");
            return Err(DeliveryError::Status(status.as_u16()));
        }
        debug!("Report accepted by collector");
        Ok(())
    }
}
