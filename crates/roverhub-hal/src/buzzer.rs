//! Audible-signal shim.

use async_trait::async_trait;
use roverhub_types::HubError;
use tracing::info;

/// A buzzer or other audible indicator.
#[async_trait]
pub trait Buzzer: Send + Sync {
    /// Sound `count` short beeps.
    async fn beep(&self, count: u32) -> Result<(), HubError>;
}

/// Log-only buzzer for machines without the hardware.
pub struct ConsoleBuzzer;

#[async_trait]
impl Buzzer for ConsoleBuzzer {
    async fn beep(&self, count: u32) -> Result<(), HubError> {
        info!(count, "beep");
        Ok(())
    }
}
