//! `roverhub-link` – Transport shims for the two device links.
//!
//! The coordination core never touches sockets or serial ports; it talks
//! to the two traits below. Everything in this crate is a thin framing
//! shim – no routing, no policy.
//!
//! # Modules
//!
//! - [`radio`] – [`WsRadioLink`][radio::WsRadioLink]: single-client
//!   WebSocket server carrying newline-free JSON frames to and from the
//!   operator's device.
//! - [`serial`] – [`SerialMotorLink`][serial::SerialMotorLink]:
//!   line-delimited token transport to the motor-controller board.
//! - [`memory`] – loopback implementations of both traits for tests and
//!   bench rigs.

pub mod memory;
pub mod radio;
pub mod serial;

use async_trait::async_trait;
use roverhub_types::{HubError, OutgoingMessage};

pub use memory::{MemoryMotorLink, MemoryRadioLink};
pub use radio::WsRadioLink;
pub use serial::SerialMotorLink;

/// The wireless control link to the operator's phone/tablet.
#[async_trait]
pub trait RadioLink: Send + Sync {
    /// Deliver one message to the operator.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Radio`] on a transport failure; the caller is
    /// expected to report link failure rather than retry.
    async fn send(&self, message: &OutgoingMessage) -> Result<(), HubError>;

    /// Wait for the next raw frame. `Ok(None)` means the frame carried
    /// nothing routable (keep-alive, binary noise) and should be skipped.
    async fn receive(&self) -> Result<Option<String>, HubError>;

    /// Tear down the current connection and wait for a fresh one.
    async fn reconnect(&self) -> Result<(), HubError>;
}

/// The motor-controller link.
///
/// No reconnect operation: there is no serial-level recovery, a broken
/// controller link is fatal for the hub.
#[async_trait]
pub trait MotorLink: Send + Sync {
    /// Write one command token.
    async fn send(&self, token: &str) -> Result<(), HubError>;

    /// Wait for the next acknowledgement token.
    async fn receive(&self) -> Result<String, HubError>;
}
