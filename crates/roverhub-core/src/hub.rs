//! Hub wiring: owns the context and spawns every worker.

use std::sync::Arc;

use roverhub_backend::Planner;
use roverhub_hal::{Buzzer, Camera};
use roverhub_link::{MotorLink, RadioLink};
use roverhub_types::{HubError, OutgoingMessage};
use tracing::{error, info, warn};

use crate::context::{CoreConfig, HubContext};
use crate::supervisor::LinkSupervisor;
use crate::{ack_listener, dispatcher::ActionDispatcher, executor, router, sender};

/// Number of beeps sounded when the hub comes up.
const READY_BEEPS: u32 = 3;

/// The assembled coordination hub.
///
/// Construct with connected links and collaborators, then call
/// [`run`][Self::run]; it returns when any non-recoverable worker exits.
pub struct Hub {
    ctx: Arc<HubContext>,
    radio: Arc<dyn RadioLink>,
    motor: Arc<dyn MotorLink>,
    planner: Arc<dyn Planner>,
    camera: Arc<dyn Camera>,
    buzzer: Arc<dyn Buzzer>,
}

impl Hub {
    pub fn new(
        config: CoreConfig,
        radio: Arc<dyn RadioLink>,
        motor: Arc<dyn MotorLink>,
        planner: Arc<dyn Planner>,
        camera: Arc<dyn Camera>,
        buzzer: Arc<dyn Buzzer>,
    ) -> Self {
        Self {
            ctx: HubContext::new(config),
            radio,
            motor,
            planner,
            camera,
            buzzer,
        }
    }

    /// The shared context (inspection and tests).
    pub fn context(&self) -> Arc<HubContext> {
        Arc::clone(&self.ctx)
    }

    /// Spawn all six workers and run until one of the non-radio workers
    /// faults or the supervisor gives up on the link.
    ///
    /// # Errors
    ///
    /// Propagates the first worker fault: a protocol violation, a
    /// controller/backend fault, or exhausted radio reconnects.
    pub async fn run(self) -> Result<(), HubError> {
        // Greet the operator and publish the starting mode.
        self.ctx
            .outgoing
            .push(OutgoingMessage::status("connected to roverhub"));
        self.ctx
            .outgoing
            .push(OutgoingMessage::mode(self.ctx.state.mode()));
        if let Err(e) = self.buzzer.beep(READY_BEEPS).await {
            warn!(error = %e, "ready beep failed");
        }

        let router_task = tokio::spawn(router::run(
            Arc::clone(&self.ctx),
            Arc::clone(&self.radio),
        ));
        let sender_task = tokio::spawn(sender::run(
            Arc::clone(&self.ctx),
            Arc::clone(&self.radio),
        ));
        let mut supervisor = tokio::spawn(
            LinkSupervisor::new(
                Arc::clone(&self.ctx),
                Arc::clone(&self.radio),
                Arc::clone(&self.buzzer),
                router_task,
                sender_task,
            )
            .run(),
        );

        let mut executor = tokio::spawn(executor::run(
            Arc::clone(&self.ctx),
            Arc::clone(&self.motor),
        ));
        let mut listener = tokio::spawn(ack_listener::run(
            Arc::clone(&self.ctx),
            Arc::clone(&self.motor),
        ));
        let mut dispatcher = tokio::spawn(
            ActionDispatcher::new(
                Arc::clone(&self.ctx),
                Arc::clone(&self.planner),
                Arc::clone(&self.camera),
                Arc::clone(&self.motor),
            )
            .run(),
        );
        info!("hub running");

        let result = tokio::select! {
            exit = &mut executor => worker_exit("command executor", exit),
            exit = &mut listener => worker_exit("controller-ack listener", exit),
            exit = &mut dispatcher => worker_exit("action dispatcher", exit),
            exit = &mut supervisor => worker_exit("link supervisor", exit),
        };

        executor.abort();
        listener.abort();
        dispatcher.abort();
        supervisor.abort();
        result
    }
}

fn worker_exit(
    worker: &str,
    exit: Result<Result<(), HubError>, tokio::task::JoinError>,
) -> Result<(), HubError> {
    match exit {
        Ok(Ok(())) => {
            info!(worker, "worker exited");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(worker, error = %e, "worker faulted");
            Err(e)
        }
        Err(join) => Err(HubError::Worker(format!("{worker}: {join}"))),
    }
}
