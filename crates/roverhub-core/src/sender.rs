//! Outbound sender: drains the outgoing queue to the radio link.
//!
//! On a transport failure the message is dropped, link failure is
//! reported, and the worker exits; retrying belongs to the supervisor,
//! never here.

use std::sync::Arc;

use roverhub_types::HubError;
use tracing::{info, warn};

use crate::context::HubContext;
use roverhub_link::RadioLink;

pub async fn run(ctx: Arc<HubContext>, radio: Arc<dyn RadioLink>) -> Result<(), HubError> {
    info!("outbound sender started");
    loop {
        let message = ctx.outgoing.pop().await;
        if let Err(e) = radio.send(&message).await {
            warn!(
                error = %e,
                dropped = ?message.cat,
                "radio send failed, reporting link failure"
            );
            ctx.state.report_link_failure();
            return Ok(());
        }
    }
}
