//! The coordinator-owned context handed to every worker.

use std::sync::Arc;
use std::time::Duration;

use roverhub_types::{Action, Command, OutgoingMessage, Waypoint};

use crate::queue::SharedQueue;
use crate::state::SharedState;

/// Runtime knobs the core needs (a subset of the CLI configuration).
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Enqueue a stitch action after the end-of-path marker executes.
    pub stitch_on_finish: bool,
    /// Use the canned arc for single-obstacle navigation instead of
    /// calling the backend.
    pub fixed_single_obstacle_path: bool,
    /// Radio reconnect attempts before the supervisor gives up.
    pub reconnect_max_retries: u32,
    /// Initial back-off between reconnect attempts (doubles each try).
    pub reconnect_backoff: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            stitch_on_finish: false,
            fixed_single_obstacle_path: false,
            reconnect_max_retries: 5,
            reconnect_backoff: Duration::from_millis(500),
        }
    }
}

/// All mutable coordination state: the shared flags plus the four queues.
///
/// Owned by the [`Hub`][crate::hub::Hub]; workers receive an `Arc` and
/// interact only through the named operations on the fields.
pub struct HubContext {
    pub state: SharedState,
    /// Controller tokens awaiting execution.
    pub commands: SharedQueue<Command>,
    /// Expected poses, consumed one per path-mode acknowledgement.
    pub waypoints: SharedQueue<Waypoint>,
    /// High-level requests for the action dispatcher.
    pub actions: SharedQueue<Action>,
    /// Messages awaiting delivery to the operator.
    pub outgoing: SharedQueue<OutgoingMessage>,
    pub config: CoreConfig,
}

impl HubContext {
    pub fn new(config: CoreConfig) -> Arc<Self> {
        Arc::new(Self {
            state: SharedState::new(),
            commands: SharedQueue::new(),
            waypoints: SharedQueue::new(),
            actions: SharedQueue::new(),
            outgoing: SharedQueue::new(),
            config,
        })
    }
}
