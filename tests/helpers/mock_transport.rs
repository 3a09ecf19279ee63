#![allow(dead_code)]
use async_trait::async_trait;
use simplemon_agent::core::Transport;
use simplemon_agent::errors::DeliveryError;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// A transport that records every delivery attempt and can be told to fail.
#[derive(Clone)]
pub struct RecordingTransport {
    pub documents: Arc<Mutex<Vec<String>>>,
    pub attempts: Arc<Mutex<Vec<Instant>>>,
    pub fail: Arc<AtomicBool>,
    pub closed: Arc<AtomicBool>,
    notifier: Arc<Notify>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(Mutex::new(Vec::new())),
            fail: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
            notifier: Arc::new(Notify::new()),
        }
    }

    /// A transport whose every delivery fails with a 503.
    pub fn failing() -> Self {
        let transport = Self::new();
        transport.fail.store(true, Ordering::SeqCst);
        transport
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn documents(&self) -> Vec<String> {
        self.documents.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn wait_for_attempts(&self, target: usize, timeout_duration: Duration) {
        let wait_future = async {
            loop {
                let notified = self.notifier.notified();
                if self.attempt_count() >= target {
                    break;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout_duration, wait_future)
            .await
            .expect("Timed out waiting for delivery attempts");
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording_mock"
    }

    async fn deliver(&mut self, document: &str) -> Result<(), DeliveryError> {
        let result = if self.fail.load(Ordering::SeqCst) {
            Err(DeliveryError::Status(503))
        } else {
            self.documents.lock().unwrap().push(document.to_string());
            Ok(())
        };
        self.attempts.lock().unwrap().push(Instant::now());
        self.notifier.notify_waiters();
        result
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
