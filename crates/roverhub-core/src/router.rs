//! Inbound router: one decoded operator frame in, one routing decision out.
//!
//! Validation is mode-dependent; a frame that is legal in form but
//! illegal in the current mode is answered with an error message and
//! dropped. Malformed frames are dropped silently (logged only).

use std::sync::Arc;

use roverhub_types::{
    Action, Command, HubError, InboundMessage, Obstacle, Outcome, OutgoingMessage, RobotMode,
};
use tracing::{debug, info, warn};

use crate::context::HubContext;
use roverhub_link::RadioLink;

/// Consume radio frames until the transport fails (handing recovery to
/// the supervisor) or routing faults.
pub async fn run(ctx: Arc<HubContext>, radio: Arc<dyn RadioLink>) -> Result<(), HubError> {
    info!("inbound router started");
    loop {
        let raw = match radio.receive().await {
            Ok(Some(raw)) => raw,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "radio receive failed, reporting link failure");
                ctx.state.report_link_failure();
                return Ok(());
            }
        };
        match route(&ctx, &raw) {
            Outcome::Handled => {}
            Outcome::Rejected(reason) => {
                ctx.outgoing.push(OutgoingMessage::error(reason));
            }
            Outcome::Fault(e) => return Err(e),
        }
    }
}

/// Route one raw frame. Exposed for the worker loop and unit tests.
pub(crate) fn route(ctx: &HubContext, raw: &str) -> Outcome {
    let message = match InboundMessage::parse(raw) {
        Ok(message) => message,
        Err(e) => {
            debug!(error = %e, raw, "dropping malformed frame");
            return Outcome::Handled;
        }
    };

    match message.cat.as_str() {
        "mode" => route_mode(ctx, &message),
        "manual" => route_manual(ctx, &message),
        "obstacles" => route_obstacles(ctx, &message),
        "single-obstacle" => route_single_obstacle(ctx, &message),
        "control" => route_control(ctx, &message),
        other => {
            debug!(cat = other, "dropping frame with unknown category");
            Outcome::Handled
        }
    }
}

fn route_mode(ctx: &HubContext, message: &InboundMessage) -> Outcome {
    let Some(target) = message.value_str().and_then(|v| v.parse::<RobotMode>().ok()) else {
        debug!(value = %message.value, "dropping mode frame with bad value");
        return Outcome::Handled;
    };
    ctx.actions.push(Action::ChangeMode(target));
    Outcome::Handled
}

fn route_manual(ctx: &HubContext, message: &InboundMessage) -> Outcome {
    if ctx.state.mode() != RobotMode::Manual {
        return Outcome::Rejected("manual commands are not allowed in path mode".to_string());
    }
    let Some(token) = message.value_str() else {
        debug!(value = %message.value, "dropping manual frame with non-string value");
        return Outcome::Handled;
    };
    // No backend call needed – straight onto the command queue.
    ctx.commands.push(Command::from(token));
    Outcome::Handled
}

fn route_obstacles(ctx: &HubContext, message: &InboundMessage) -> Outcome {
    if ctx.state.mode() != RobotMode::Path {
        return Outcome::Rejected("obstacles are only accepted in path mode".to_string());
    }
    match serde_json::from_value::<Vec<Obstacle>>(message.value.clone()) {
        Ok(obstacles) => {
            ctx.actions.push(Action::SetObstacles(obstacles));
            Outcome::Handled
        }
        Err(e) => {
            debug!(error = %e, "dropping obstacles frame with bad payload");
            Outcome::Handled
        }
    }
}

fn route_single_obstacle(ctx: &HubContext, message: &InboundMessage) -> Outcome {
    if ctx.state.mode() != RobotMode::Path {
        return Outcome::Rejected("single-obstacle is only accepted in path mode".to_string());
    }
    match serde_json::from_value::<Obstacle>(message.value.clone()) {
        Ok(obstacle) => {
            ctx.actions.push(Action::NavigateAroundObstacle(obstacle));
            Outcome::Handled
        }
        Err(e) => {
            debug!(error = %e, "dropping single-obstacle frame with bad payload");
            Outcome::Handled
        }
    }
}

fn route_control(ctx: &HubContext, message: &InboundMessage) -> Outcome {
    match message.value_str() {
        Some("start") => {
            if ctx.state.mode() != RobotMode::Path {
                return Outcome::Rejected("start is only valid in path mode".to_string());
            }
            if ctx.commands.is_empty() {
                return Outcome::Rejected(
                    "no commands queued, did you set obstacles?".to_string(),
                );
            }
            ctx.state.open_gate();
            ctx.outgoing.push(OutgoingMessage::status("started"));
            Outcome::Handled
        }
        other => {
            debug!(value = ?other, "dropping unknown control frame");
            Outcome::Handled
        }
    }
}
