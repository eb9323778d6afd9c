//! Controller-ack listener: completes the move-then-acknowledge cycle.
//!
//! Each `ACK`/`OK` from the board releases the movement permit and, in
//! path mode, advances the waypoint feed by one pose which is published
//! to the operator as a location update. Waypoint/ack mismatches are
//! recoverable anomalies; unknown tokens are not.

use std::sync::Arc;

use roverhub_types::{HubError, Outcome, OutgoingMessage, RobotMode};
use tracing::{debug, error, info, warn};

use crate::context::HubContext;
use roverhub_link::MotorLink;

/// Consume acknowledgement tokens until the controller link fails or an
/// unknown token desynchronizes the pipeline.
pub async fn run(ctx: Arc<HubContext>, motor: Arc<dyn MotorLink>) -> Result<(), HubError> {
    info!("controller-ack listener started");
    loop {
        let token = motor.receive().await?;
        match handle_ack(&ctx, &token) {
            Outcome::Handled => {}
            Outcome::Rejected(reason) => {
                ctx.outgoing.push(OutgoingMessage::error(reason));
            }
            Outcome::Fault(e) => {
                error!(error = %e, "controller-ack listener fault");
                return Err(e);
            }
        }
    }
}

/// Process one acknowledgement token.
pub(crate) fn handle_ack(ctx: &HubContext, token: &str) -> Outcome {
    match token {
        "ACK" | "OK" => {
            debug!(token, "controller acknowledgement");
            if !ctx.state.release_permit() {
                // Happens when a mode change cleared the permit while the
                // command was still in flight.
                warn!("acknowledgement arrived with the movement permit already free");
            }
            if ctx.state.mode() == RobotMode::Path {
                match ctx.waypoints.try_pop() {
                    Some(waypoint) => {
                        ctx.outgoing.push(OutgoingMessage::location(&waypoint));
                    }
                    None => warn!("acknowledgement arrived with an empty waypoint feed"),
                }
            }
            Outcome::Handled
        }
        other => Outcome::Fault(HubError::Protocol(other.to_string())),
    }
}
