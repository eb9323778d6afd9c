//! Link-recovery supervisor: the system's only self-healing behavior.
//!
//! A single long-lived watcher owns the two radio-facing worker handles.
//! When link failure is reported it stops both workers, re-establishes
//! the transport (bounded retries with doubling back-off), restarts the
//! workers, and republishes the current mode and a reconnected status.
//! Being the sole consumer of the link-health flag makes re-entry while
//! already recovering impossible, so recovery never spawns duplicates.

use std::sync::Arc;

use roverhub_hal::Buzzer;
use roverhub_link::RadioLink;
use roverhub_types::{HubError, OutgoingMessage};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::context::HubContext;
use crate::{router, sender};

/// Number of beeps sounded once the link is back.
const RECONNECT_BEEPS: u32 = 2;

pub struct LinkSupervisor {
    ctx: Arc<HubContext>,
    radio: Arc<dyn RadioLink>,
    buzzer: Arc<dyn Buzzer>,
    router: JoinHandle<Result<(), HubError>>,
    sender: JoinHandle<Result<(), HubError>>,
}

impl LinkSupervisor {
    /// Adopt the running router and sender tasks.
    pub fn new(
        ctx: Arc<HubContext>,
        radio: Arc<dyn RadioLink>,
        buzzer: Arc<dyn Buzzer>,
        router: JoinHandle<Result<(), HubError>>,
        sender: JoinHandle<Result<(), HubError>>,
    ) -> Self {
        Self {
            ctx,
            radio,
            buzzer,
            router,
            sender,
        }
    }

    /// Watch the link-health flag forever; returns only when reconnect
    /// retries are exhausted.
    pub async fn run(mut self) -> Result<(), HubError> {
        info!("link-recovery supervisor started");
        loop {
            self.ctx.state.wait_link_failure().await;
            warn!("radio link down, starting recovery");

            // Stop both radio-facing workers and wait them out. One of
            // them usually exited already after reporting the failure.
            self.router.abort();
            self.sender.abort();
            let _ = (&mut self.router).await;
            let _ = (&mut self.sender).await;

            self.reconnect().await?;

            // Clear before restarting: a failure on the fresh connection
            // must trigger the next recovery round, not be swallowed.
            self.ctx.state.clear_link_failure();

            self.router = tokio::spawn(router::run(
                Arc::clone(&self.ctx),
                Arc::clone(&self.radio),
            ));
            self.sender = tokio::spawn(sender::run(
                Arc::clone(&self.ctx),
                Arc::clone(&self.radio),
            ));

            self.ctx.outgoing.push(OutgoingMessage::status("reconnected"));
            self.ctx
                .outgoing
                .push(OutgoingMessage::mode(self.ctx.state.mode()));
            if let Err(e) = self.buzzer.beep(RECONNECT_BEEPS).await {
                warn!(error = %e, "reconnect beep failed");
            }
            info!("radio link recovered");
        }
    }

    async fn reconnect(&self) -> Result<(), HubError> {
        let mut delay = self.ctx.config.reconnect_backoff;
        for attempt in 1..=self.ctx.config.reconnect_max_retries {
            match self.radio.reconnect().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, error = %e, "reconnect attempt failed");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
        Err(HubError::Radio(
            "radio reconnect retries exhausted".to_string(),
        ))
    }
}
