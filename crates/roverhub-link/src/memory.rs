//! Loopback links for tests and bench rigs.
//!
//! Each link comes with a handle that plays the remote end: the radio
//! handle acts as the operator's device, the motor handle as the
//! controller board. The radio side can be "broken" to exercise the
//! link-recovery path without a real transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use roverhub_types::{HubError, OutgoingMessage};
use tokio::sync::{Mutex, mpsc};

use crate::{MotorLink, RadioLink};

// ─────────────────────────────────────────────────────────────────────────
// Radio
// ─────────────────────────────────────────────────────────────────────────

struct RadioShared {
    broken: AtomicBool,
    reconnects: AtomicUsize,
}

/// In-memory [`RadioLink`].
pub struct MemoryRadioLink {
    inbound: Mutex<mpsc::UnboundedReceiver<String>>,
    outbound: mpsc::UnboundedSender<OutgoingMessage>,
    shared: Arc<RadioShared>,
}

/// The operator's side of a [`MemoryRadioLink`].
pub struct MemoryRadioHandle {
    inbound: mpsc::UnboundedSender<String>,
    outbound: Mutex<mpsc::UnboundedReceiver<OutgoingMessage>>,
    shared: Arc<RadioShared>,
}

impl MemoryRadioLink {
    pub fn pair() -> (Self, MemoryRadioHandle) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(RadioShared {
            broken: AtomicBool::new(false),
            reconnects: AtomicUsize::new(0),
        });
        (
            Self {
                inbound: Mutex::new(in_rx),
                outbound: out_tx,
                shared: Arc::clone(&shared),
            },
            MemoryRadioHandle {
                inbound: in_tx,
                outbound: Mutex::new(out_rx),
                shared,
            },
        )
    }
}

#[async_trait]
impl RadioLink for MemoryRadioLink {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), HubError> {
        if self.shared.broken.load(Ordering::Acquire) {
            return Err(HubError::Radio("simulated send failure".to_string()));
        }
        self.outbound
            .send(message.clone())
            .map_err(|_| HubError::Radio("operator handle dropped".to_string()))
    }

    async fn receive(&self) -> Result<Option<String>, HubError> {
        match self.inbound.lock().await.recv().await {
            Some(raw) => Ok(Some(raw)),
            None => Err(HubError::Radio("operator handle dropped".to_string())),
        }
    }

    async fn reconnect(&self) -> Result<(), HubError> {
        self.shared.broken.store(false, Ordering::Release);
        self.shared.reconnects.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

impl MemoryRadioHandle {
    /// Deliver a raw frame to the hub, as the operator's device would.
    pub fn push_frame(&self, raw: &str) {
        let _ = self.inbound.send(raw.to_string());
    }

    /// Next message the hub sent to the operator.
    pub async fn next_message(&self) -> Option<OutgoingMessage> {
        self.outbound.lock().await.recv().await
    }

    /// Non-blocking variant of [`next_message`][Self::next_message].
    pub async fn try_next_message(&self) -> Option<OutgoingMessage> {
        self.outbound.lock().await.try_recv().ok()
    }

    /// Make every subsequent `send` fail until the link reconnects.
    pub fn break_link(&self) {
        self.shared.broken.store(true, Ordering::Release);
    }

    /// How many times the hub has reconnected this link.
    pub fn reconnect_count(&self) -> usize {
        self.shared.reconnects.load(Ordering::Acquire)
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Motor controller
// ─────────────────────────────────────────────────────────────────────────

/// In-memory [`MotorLink`].
pub struct MemoryMotorLink {
    acks: Mutex<mpsc::UnboundedReceiver<String>>,
    sent: mpsc::UnboundedSender<String>,
}

/// The controller board's side of a [`MemoryMotorLink`].
pub struct MemoryMotorHandle {
    acks: mpsc::UnboundedSender<String>,
    sent: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl MemoryMotorLink {
    pub fn pair() -> (Self, MemoryMotorHandle) {
        let (ack_tx, ack_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        (
            Self {
                acks: Mutex::new(ack_rx),
                sent: sent_tx,
            },
            MemoryMotorHandle {
                acks: ack_tx,
                sent: Mutex::new(sent_rx),
            },
        )
    }
}

#[async_trait]
impl MotorLink for MemoryMotorLink {
    async fn send(&self, token: &str) -> Result<(), HubError> {
        self.sent
            .send(token.to_string())
            .map_err(|_| HubError::Controller("controller handle dropped".to_string()))
    }

    async fn receive(&self) -> Result<String, HubError> {
        self.acks
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| HubError::Controller("controller handle dropped".to_string()))
    }
}

impl MemoryMotorHandle {
    /// Feed an acknowledgement token, as the controller board would.
    pub fn push_ack(&self, token: &str) {
        let _ = self.acks.send(token.to_string());
    }

    /// Next token the hub wrote to the controller.
    pub async fn next_sent(&self) -> Option<String> {
        self.sent.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roverhub_types::Category;

    #[tokio::test]
    async fn radio_roundtrip() {
        let (link, handle) = MemoryRadioLink::pair();

        handle.push_frame(r#"{"cat":"control","value":"start"}"#);
        assert_eq!(
            link.receive().await.unwrap().as_deref(),
            Some(r#"{"cat":"control","value":"start"}"#)
        );

        link.send(&OutgoingMessage::info("hi")).await.unwrap();
        let msg = handle.next_message().await.unwrap();
        assert_eq!(msg.cat, Category::Info);
    }

    #[tokio::test]
    async fn broken_radio_fails_sends_until_reconnect() {
        let (link, handle) = MemoryRadioLink::pair();
        handle.break_link();

        assert!(link.send(&OutgoingMessage::info("lost")).await.is_err());

        link.reconnect().await.unwrap();
        assert_eq!(handle.reconnect_count(), 1);
        assert!(link.send(&OutgoingMessage::info("back")).await.is_ok());
    }

    #[tokio::test]
    async fn motor_roundtrip() {
        let (link, handle) = MemoryMotorLink::pair();

        link.send("FW10").await.unwrap();
        assert_eq!(handle.next_sent().await.unwrap(), "FW10");

        handle.push_ack("ACK");
        assert_eq!(link.receive().await.unwrap(), "ACK");
    }
}
