//! Action dispatcher: mode changes, path loading, snapshots, stitching.
//!
//! The only worker that talks to the backend. A backend or camera fault
//! is fatal for the dispatcher (surfaced, never swallowed); rejections
//! are answered to the operator and the loop continues.

use std::sync::Arc;

use roverhub_backend::{PlanResponse, Planner};
use roverhub_hal::Camera;
use roverhub_link::MotorLink;
use roverhub_types::{
    Action, Command, HubError, Obstacle, Outcome, OutgoingMessage, RobotMode,
};
use tracing::{debug, error, info, warn};

use crate::context::HubContext;

/// Acknowledgement tones sounded by the controller on a mode change.
const MANUAL_TONE: &str = "ZZ01";
const PATH_TONE: &str = "ZZ02";

/// Canned single-obstacle arc used when the backend is not consulted.
/// No waypoint feed accompanies it, so no location updates are emitted.
const FIXED_ARC: [&str; 5] = ["FW10", "FL45", "FR90", "FL45", "FIN"];

/// Consumes the action queue and drives the backend and hardware
/// collaborators.
pub struct ActionDispatcher {
    ctx: Arc<HubContext>,
    planner: Arc<dyn Planner>,
    camera: Arc<dyn Camera>,
    motor: Arc<dyn MotorLink>,
}

impl ActionDispatcher {
    pub fn new(
        ctx: Arc<HubContext>,
        planner: Arc<dyn Planner>,
        camera: Arc<dyn Camera>,
        motor: Arc<dyn MotorLink>,
    ) -> Self {
        Self {
            ctx,
            planner,
            camera,
            motor,
        }
    }

    /// Dispatch queued actions until one faults.
    pub async fn run(self) -> Result<(), HubError> {
        info!("action dispatcher started");
        loop {
            let action = self.ctx.actions.pop().await;
            match self.dispatch(action).await {
                Outcome::Handled => {}
                Outcome::Rejected(reason) => {
                    self.ctx.outgoing.push(OutgoingMessage::error(reason));
                }
                Outcome::Fault(e) => {
                    error!(error = %e, "action dispatcher fault");
                    return Err(e);
                }
            }
        }
    }

    async fn dispatch(&self, action: Action) -> Outcome {
        match action {
            Action::ChangeMode(target) => self.change_mode(target).await,
            Action::SetObstacles(obstacles) => self.load_path(&obstacles).await,
            Action::NavigateAroundObstacle(obstacle) => self.navigate_around(&obstacle).await,
            Action::Snapshot { obstacle_id } => self.snapshot(&obstacle_id).await,
            Action::Stitch => self.stitch().await,
        }
    }

    /// Mode change is the system's cancellation primitive: queues are
    /// cleared and permit/gate reset unconditionally.
    async fn change_mode(&self, target: RobotMode) -> Outcome {
        if !self.ctx.state.try_set_mode(target) {
            return Outcome::Rejected(format!("robot is already in {target} mode"));
        }

        let dropped = self.ctx.commands.clear() + self.ctx.waypoints.clear();
        if dropped > 0 {
            debug!(dropped, "cleared queues on mode change");
        }
        match target {
            RobotMode::Manual => self.ctx.state.open_gate(),
            RobotMode::Path => self.ctx.state.close_gate(),
        }
        if self.ctx.state.release_permit() {
            warn!("mode change discarded an in-flight motion command");
        }

        self.ctx
            .outgoing
            .push(OutgoingMessage::info(format!("robot mode set to {target}")));

        let tone = match target {
            RobotMode::Manual => MANUAL_TONE,
            RobotMode::Path => PATH_TONE,
        };
        match self.motor.send(tone).await {
            Ok(()) => Outcome::Handled,
            Err(e) => Outcome::Fault(e),
        }
    }

    async fn load_path(&self, obstacles: &[Obstacle]) -> Outcome {
        match self.planner.request_path(obstacles).await {
            Ok(plan) => {
                self.install_plan(plan);
                Outcome::Handled
            }
            Err(e) => Outcome::Fault(HubError::Backend(e.to_string())),
        }
    }

    async fn navigate_around(&self, obstacle: &Obstacle) -> Outcome {
        if self.ctx.config.fixed_single_obstacle_path {
            self.install_fixed_arc();
            return Outcome::Handled;
        }
        match self.planner.request_navigate(obstacle).await {
            Ok(plan) => {
                self.install_plan(plan);
                Outcome::Handled
            }
            Err(e) => Outcome::Fault(HubError::Backend(e.to_string())),
        }
    }

    /// Replace the command and waypoint queues with a fresh plan. The
    /// path's first element is the current pose and is not queued.
    fn install_plan(&self, plan: PlanResponse) {
        self.ctx.commands.clear();
        self.ctx.waypoints.clear();
        let count = plan.commands.len();
        self.ctx
            .commands
            .extend(plan.commands.into_iter().map(Command::from));
        self.ctx.waypoints.extend(plan.path.into_iter().skip(1));
        self.ctx
            .outgoing
            .push(OutgoingMessage::info(format!("path ready: {count} commands")));
    }

    fn install_fixed_arc(&self) {
        self.ctx.commands.clear();
        self.ctx.waypoints.clear();
        self.ctx
            .commands
            .extend(FIXED_ARC.iter().map(|&t| Command::from(t)));
        self.ctx
            .outgoing
            .push(OutgoingMessage::info("fixed single-obstacle arc loaded"));
    }

    /// Capture, then free the permit so the robot keeps moving during
    /// the recognition round-trip; motion never overlaps the exposure.
    async fn snapshot(&self, obstacle_id: &str) -> Outcome {
        let frame = match self.camera.capture().await {
            Ok(frame) => frame,
            Err(e) => return Outcome::Fault(e),
        };
        if !self.ctx.state.release_permit() {
            warn!("movement permit was already free after capture");
        }

        let filename = format!("{obstacle_id}.jpg");
        let recognition = match self.planner.recognize_image(frame.data, &filename).await {
            Ok(recognition) => recognition,
            Err(e) => return Outcome::Fault(HubError::Backend(e.to_string())),
        };

        if recognition.stop {
            self.ctx.state.close_gate();
            let dropped = self.ctx.commands.clear();
            self.ctx.outgoing.push(OutgoingMessage::info(format!(
                "stop symbol recognized, {dropped} queued commands dropped"
            )));
        }
        self.ctx
            .outgoing
            .push(OutgoingMessage::image_rec(obstacle_id, &recognition.label));
        Outcome::Handled
    }

    async fn stitch(&self) -> Outcome {
        match self.planner.request_stitch().await {
            Ok(()) => {
                self.ctx
                    .outgoing
                    .push(OutgoingMessage::info("stitch completed"));
                Outcome::Handled
            }
            Err(e) => Outcome::Fault(HubError::Backend(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CoreConfig;
    use async_trait::async_trait;
    use roverhub_backend::{BackendError, Recognition};
    use roverhub_hal::CameraFrame;
    use roverhub_link::{MemoryMotorLink, memory::MemoryMotorHandle};
    use roverhub_types::{Category, Waypoint};

    struct ScriptedPlanner {
        plan: Option<PlanResponse>,
        recognition: Option<Recognition>,
        stitch_ok: bool,
    }

    impl Default for ScriptedPlanner {
        fn default() -> Self {
            Self {
                plan: Some(PlanResponse {
                    commands: vec!["FW10".to_string(), "FIN".to_string()],
                    path: vec![
                        Waypoint { x: 1, y: 1, heading: 0 },
                        Waypoint { x: 1, y: 2, heading: 0 },
                    ],
                }),
                recognition: Some(Recognition {
                    label: "38".to_string(),
                    stop: false,
                }),
                stitch_ok: true,
            }
        }
    }

    #[async_trait]
    impl Planner for ScriptedPlanner {
        async fn request_path(&self, _: &[Obstacle]) -> Result<PlanResponse, BackendError> {
            self.plan
                .clone()
                .ok_or_else(|| BackendError::BadResponse("planner down".to_string()))
        }

        async fn request_navigate(&self, _: &Obstacle) -> Result<PlanResponse, BackendError> {
            self.request_path(&[]).await
        }

        async fn recognize_image(
            &self,
            _: Vec<u8>,
            _: &str,
        ) -> Result<Recognition, BackendError> {
            self.recognition
                .clone()
                .ok_or_else(|| BackendError::BadResponse("recognizer down".to_string()))
        }

        async fn request_stitch(&self) -> Result<(), BackendError> {
            if self.stitch_ok {
                Ok(())
            } else {
                Err(BackendError::BadResponse("stitcher down".to_string()))
            }
        }
    }

    struct StubCamera;

    #[async_trait]
    impl Camera for StubCamera {
        fn id(&self) -> &str {
            "stub"
        }

        async fn capture(&self) -> Result<CameraFrame, HubError> {
            Ok(CameraFrame {
                data: vec![0xFF, 0xD8],
            })
        }
    }

    fn dispatcher_with(
        config: CoreConfig,
        planner: ScriptedPlanner,
    ) -> (Arc<HubContext>, ActionDispatcher, MemoryMotorHandle) {
        let ctx = HubContext::new(config);
        let (motor, handle) = MemoryMotorLink::pair();
        let dispatcher = ActionDispatcher::new(
            Arc::clone(&ctx),
            Arc::new(planner),
            Arc::new(StubCamera),
            Arc::new(motor),
        );
        (ctx, dispatcher, handle)
    }

    fn dispatcher() -> (Arc<HubContext>, ActionDispatcher, MemoryMotorHandle) {
        dispatcher_with(CoreConfig::default(), ScriptedPlanner::default())
    }

    #[tokio::test]
    async fn change_to_manual_opens_gate_and_sounds_tone() {
        let (ctx, dispatcher, motor) = dispatcher();
        ctx.commands.push(Command::from("FW10"));
        ctx.waypoints.push(Waypoint { x: 0, y: 0, heading: 0 });

        let outcome = dispatcher.dispatch(Action::ChangeMode(RobotMode::Manual)).await;
        assert!(matches!(outcome, Outcome::Handled));

        // Queues are empty immediately after the transition.
        assert!(ctx.commands.is_empty());
        assert!(ctx.waypoints.is_empty());
        // Manual mode implies an open gate.
        assert_eq!(ctx.state.mode(), RobotMode::Manual);
        assert!(ctx.state.gate_is_open());

        let info = ctx.outgoing.try_pop().unwrap();
        assert_eq!(info.cat, Category::Info);
        assert_eq!(motor.next_sent().await.unwrap(), MANUAL_TONE);
    }

    #[tokio::test]
    async fn change_back_to_path_closes_the_gate() {
        let (ctx, dispatcher, motor) = dispatcher();
        dispatcher.dispatch(Action::ChangeMode(RobotMode::Manual)).await;
        let outcome = dispatcher.dispatch(Action::ChangeMode(RobotMode::Path)).await;
        assert!(matches!(outcome, Outcome::Handled));
        assert!(!ctx.state.gate_is_open());
        assert_eq!(motor.next_sent().await.unwrap(), MANUAL_TONE);
        assert_eq!(motor.next_sent().await.unwrap(), PATH_TONE);
    }

    #[tokio::test]
    async fn change_to_current_mode_is_rejected() {
        let (_ctx, dispatcher, _motor) = dispatcher();
        let outcome = dispatcher.dispatch(Action::ChangeMode(RobotMode::Path)).await;
        assert!(matches!(outcome, Outcome::Rejected(_)));
    }

    #[tokio::test]
    async fn mode_change_releases_a_held_permit() {
        let (ctx, dispatcher, _motor) = dispatcher();
        ctx.state.acquire_permit().await;

        dispatcher.dispatch(Action::ChangeMode(RobotMode::Manual)).await;
        assert!(!ctx.state.permit_held());
    }

    #[tokio::test]
    async fn set_obstacles_installs_commands_and_skips_first_waypoint() {
        let (ctx, dispatcher, _motor) = dispatcher();
        let outcome = dispatcher
            .dispatch(Action::SetObstacles(vec![Obstacle {
                id: 1,
                x: 5,
                y: 10,
                facing: None,
            }]))
            .await;
        assert!(matches!(outcome, Outcome::Handled));

        assert_eq!(ctx.commands.len(), 2);
        assert_eq!(ctx.commands.try_pop(), Some(Command::from("FW10")));
        // Only the second path element is queued; the first is the
        // robot's current pose.
        assert_eq!(ctx.waypoints.len(), 1);
        assert_eq!(
            ctx.waypoints.try_pop(),
            Some(Waypoint { x: 1, y: 2, heading: 0 })
        );
    }

    #[tokio::test]
    async fn backend_failure_is_fatal_for_the_dispatcher() {
        let (_ctx, dispatcher, _motor) = dispatcher_with(
            CoreConfig::default(),
            ScriptedPlanner {
                plan: None,
                ..ScriptedPlanner::default()
            },
        );
        let outcome = dispatcher.dispatch(Action::SetObstacles(vec![])).await;
        assert!(matches!(outcome, Outcome::Fault(HubError::Backend(_))));
    }

    #[tokio::test]
    async fn fixed_arc_skips_the_backend() {
        let (ctx, dispatcher, _motor) = dispatcher_with(
            CoreConfig {
                fixed_single_obstacle_path: true,
                ..CoreConfig::default()
            },
            // A planner that would fail if it were consulted.
            ScriptedPlanner {
                plan: None,
                ..ScriptedPlanner::default()
            },
        );
        let outcome = dispatcher
            .dispatch(Action::NavigateAroundObstacle(Obstacle {
                id: 1,
                x: 0,
                y: 0,
                facing: None,
            }))
            .await;
        assert!(matches!(outcome, Outcome::Handled));
        assert_eq!(ctx.commands.len(), FIXED_ARC.len());
        assert!(ctx.waypoints.is_empty());
    }

    #[tokio::test]
    async fn snapshot_releases_permit_and_reports_recognition() {
        let (ctx, dispatcher, _motor) = dispatcher();
        ctx.state.acquire_permit().await;

        let outcome = dispatcher
            .dispatch(Action::Snapshot {
                obstacle_id: "4".to_string(),
            })
            .await;
        assert!(matches!(outcome, Outcome::Handled));
        assert!(!ctx.state.permit_held(), "permit freed after exposure");

        let msg = ctx.outgoing.try_pop().unwrap();
        assert_eq!(msg.cat, Category::ImageRec);
        assert_eq!(msg.value["obstacle_id"], "4");
        assert_eq!(msg.value["label"], "38");
    }

    #[tokio::test]
    async fn stop_recognition_aborts_the_remaining_path() {
        let (ctx, dispatcher, _motor) = dispatcher_with(
            CoreConfig::default(),
            ScriptedPlanner {
                recognition: Some(Recognition {
                    label: "STOP".to_string(),
                    stop: true,
                }),
                ..ScriptedPlanner::default()
            },
        );
        ctx.state.open_gate();
        ctx.commands.extend([Command::from("FW10"), Command::from("FIN")]);
        ctx.state.acquire_permit().await;

        let outcome = dispatcher
            .dispatch(Action::Snapshot {
                obstacle_id: "7".to_string(),
            })
            .await;
        assert!(matches!(outcome, Outcome::Handled));
        assert!(!ctx.state.gate_is_open());
        assert!(ctx.commands.is_empty());

        let info = ctx.outgoing.try_pop().unwrap();
        assert_eq!(info.cat, Category::Info);
        let rec = ctx.outgoing.try_pop().unwrap();
        assert_eq!(rec.cat, Category::ImageRec);
    }

    #[tokio::test]
    async fn stitch_reports_completion() {
        let (ctx, dispatcher, _motor) = dispatcher();
        let outcome = dispatcher.dispatch(Action::Stitch).await;
        assert!(matches!(outcome, Outcome::Handled));
        assert_eq!(ctx.outgoing.try_pop().unwrap().value, "stitch completed");
    }

    #[tokio::test]
    async fn stitch_failure_is_fatal() {
        let (_ctx, dispatcher, _motor) = dispatcher_with(
            CoreConfig::default(),
            ScriptedPlanner {
                stitch_ok: false,
                ..ScriptedPlanner::default()
            },
        );
        let outcome = dispatcher.dispatch(Action::Stitch).await;
        assert!(matches!(outcome, Outcome::Fault(HubError::Backend(_))));
    }
}
