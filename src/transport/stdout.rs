//! Writes reports to standard output instead of a collector.

use crate::core::Transport;
use crate::errors::DeliveryError;
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};

/// One JSON document per line. Handy for dry runs and piping into other tools.
pub struct StdoutTransport<W = Stdout> {
    writer: W,
}

impl StdoutTransport {
    pub fn new() -> Self {
        Self {
            writer: tokio::io::stdout(),
        }
    }
}

impl Default for StdoutTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: AsyncWrite + Unpin + Send> StdoutTransport<W> {
    /// Writes to an arbitrary sink (primarily for testing).
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Transport for StdoutTransport<W> {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn deliver(&mut self, document: &str) -> Result<(), DeliveryError> {
        self.writer.write_all(document.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}
