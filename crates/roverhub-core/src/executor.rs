//! Command executor: drains the command queue under the lock-step
//! protocol.
//!
//! Per command: wait for the path gate, take the movement permit, then
//! act by token class. The permit is only released here for commands
//! that never reach the controller (no-op, end-of-path); for everything
//! in flight the release belongs to the ack listener, and for capture
//! triggers to the action dispatcher once the frame is exposed.

use std::sync::Arc;

use roverhub_types::{Action, Command, CommandKind, HubError, Outcome, OutgoingMessage};
use tracing::{debug, error, info, warn};

use crate::context::HubContext;
use roverhub_link::MotorLink;

/// Execute queued commands in strict FIFO order until a protocol fault
/// or a controller transport fault ends the worker.
pub async fn run(ctx: Arc<HubContext>, motor: Arc<dyn MotorLink>) -> Result<(), HubError> {
    info!("command executor started");
    loop {
        let command = ctx.commands.pop().await;
        ctx.state.wait_gate().await;
        ctx.state.acquire_permit().await;

        match execute(&ctx, motor.as_ref(), &command).await {
            Outcome::Handled => {}
            Outcome::Rejected(reason) => {
                ctx.outgoing.push(OutgoingMessage::error(reason));
            }
            Outcome::Fault(e) => {
                error!(error = %e, token = command.as_str(), "command executor fault");
                return Err(e);
            }
        }
    }
}

/// Act on one command. The caller holds the movement permit.
async fn execute(ctx: &HubContext, motor: &dyn MotorLink, command: &Command) -> Outcome {
    match command.kind() {
        CommandKind::Motion | CommandKind::Signal => {
            debug!(token = command.as_str(), "forwarding to controller");
            match motor.send(command.as_str()).await {
                // Permit stays held until the acknowledgement arrives.
                Ok(()) => Outcome::Handled,
                Err(e) => Outcome::Fault(e),
            }
        }
        CommandKind::Capture { obstacle_id } => {
            // Permit stays held; the dispatcher releases it after the
            // frame is exposed.
            ctx.actions.push(Action::Snapshot { obstacle_id });
            Outcome::Handled
        }
        CommandKind::Noop => {
            if !ctx.state.release_permit() {
                warn!("movement permit was already free on no-op");
            }
            Outcome::Handled
        }
        CommandKind::Finish => {
            ctx.state.close_gate();
            if !ctx.state.release_permit() {
                warn!("movement permit was already free at end of path");
            }
            ctx.outgoing
                .push(OutgoingMessage::info("command queue finished"));
            if ctx.config.stitch_on_finish {
                ctx.actions.push(Action::Stitch);
            }
            Outcome::Handled
        }
        CommandKind::Unknown => Outcome::Fault(HubError::Protocol(command.as_str().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CoreConfig;
    use roverhub_link::MemoryMotorLink;
    use roverhub_types::Category;
    use std::time::Duration;
    use tokio::time::timeout;

    fn ctx_with(config: CoreConfig) -> Arc<HubContext> {
        HubContext::new(config)
    }

    fn ctx() -> Arc<HubContext> {
        ctx_with(CoreConfig::default())
    }

    #[tokio::test]
    async fn motion_command_is_forwarded_and_permit_stays_held() {
        let ctx = ctx();
        let (motor, handle) = MemoryMotorLink::pair();
        ctx.state.acquire_permit().await;

        let outcome = execute(&ctx, &motor, &Command::from("FW10")).await;
        assert!(matches!(outcome, Outcome::Handled));
        assert_eq!(handle.next_sent().await.unwrap(), "FW10");
        assert!(ctx.state.permit_held());
    }

    #[tokio::test]
    async fn capture_command_becomes_a_snapshot_action() {
        let ctx = ctx();
        let (motor, handle) = MemoryMotorLink::pair();
        ctx.state.acquire_permit().await;

        let outcome = execute(&ctx, &motor, &Command::from("SNAP4")).await;
        assert!(matches!(outcome, Outcome::Handled));
        assert_eq!(
            ctx.actions.try_pop(),
            Some(Action::Snapshot {
                obstacle_id: "4".to_string()
            })
        );
        // Held until the dispatcher captures the frame.
        assert!(ctx.state.permit_held());
        drop(handle);
    }

    #[tokio::test]
    async fn noop_releases_the_permit_without_transport_io() {
        let ctx = ctx();
        let (motor, handle) = MemoryMotorLink::pair();
        ctx.state.acquire_permit().await;

        let outcome = execute(&ctx, &motor, &Command::from("NOOP")).await;
        assert!(matches!(outcome, Outcome::Handled));
        assert!(!ctx.state.permit_held());

        drop(motor);
        assert!(handle.next_sent().await.is_none());
    }

    #[tokio::test]
    async fn finish_closes_the_gate_and_reports() {
        let ctx = ctx();
        let (motor, _handle) = MemoryMotorLink::pair();
        ctx.state.open_gate();
        ctx.state.acquire_permit().await;

        let outcome = execute(&ctx, &motor, &Command::from("FIN")).await;
        assert!(matches!(outcome, Outcome::Handled));
        assert!(!ctx.state.gate_is_open());
        assert!(!ctx.state.permit_held());

        let msg = ctx.outgoing.try_pop().unwrap();
        assert_eq!(msg.cat, Category::Info);
        assert_eq!(msg.value, "command queue finished");
        // Stitching is off by default.
        assert!(ctx.actions.is_empty());
    }

    #[tokio::test]
    async fn finish_enqueues_stitch_when_configured() {
        let ctx = ctx_with(CoreConfig {
            stitch_on_finish: true,
            ..CoreConfig::default()
        });
        let (motor, _handle) = MemoryMotorLink::pair();
        ctx.state.acquire_permit().await;

        execute(&ctx, &motor, &Command::from("FIN")).await;
        assert_eq!(ctx.actions.try_pop(), Some(Action::Stitch));
    }

    #[tokio::test]
    async fn unknown_token_is_a_protocol_fault() {
        let ctx = ctx();
        let (motor, _handle) = MemoryMotorLink::pair();
        ctx.state.acquire_permit().await;

        let outcome = execute(&ctx, &motor, &Command::from("WARP9")).await;
        assert!(matches!(outcome, Outcome::Fault(HubError::Protocol(_))));
    }

    #[tokio::test]
    async fn worker_terminates_on_protocol_fault() {
        let ctx = ctx();
        let (motor, _handle) = MemoryMotorLink::pair();
        ctx.state.open_gate();
        ctx.commands.push(Command::from("WARP9"));

        let result = timeout(
            Duration::from_secs(1),
            run(Arc::clone(&ctx), Arc::new(motor)),
        )
        .await
        .expect("executor must terminate");
        assert!(matches!(result, Err(HubError::Protocol(_))));
    }

    #[tokio::test]
    async fn executor_blocks_while_gate_is_closed() {
        let ctx = ctx();
        let (motor, handle) = MemoryMotorLink::pair();
        ctx.commands.push(Command::from("FW10"));

        let worker = tokio::spawn(run(Arc::clone(&ctx), Arc::new(motor)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Gate closed: nothing must reach the controller.
        assert!(!worker.is_finished());
        assert!(!ctx.state.permit_held());

        ctx.state.open_gate();
        assert_eq!(handle.next_sent().await.unwrap(), "FW10");
        worker.abort();
    }
}
