//! `roverhub-types` – Shared vocabulary of the hub.
//!
//! Defines the data that flows between the coordination workers and over
//! the two links: wire messages ([`message`]), controller command tokens
//! ([`command`]), and the shared mode/action/error types below. No I/O
//! lives here.

pub mod command;
pub mod message;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use command::{Command, CommandKind};
pub use message::{Category, InboundMessage, OutgoingMessage};

/// Top-level operating mode of the robot.
///
/// Written only by the mode-change action handler; read by the inbound
/// router (message legality) and the command executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotMode {
    /// The operator drives the robot directly, one command at a time.
    Manual,
    /// The robot executes a planned command sequence from the backend.
    #[default]
    Path,
}

impl std::fmt::Display for RobotMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RobotMode::Manual => write!(f, "manual"),
            RobotMode::Path => write!(f, "path"),
        }
    }
}

impl std::str::FromStr for RobotMode {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(RobotMode::Manual),
            "path" => Ok(RobotMode::Path),
            other => Err(HubError::Malformed(format!("unknown robot mode `{other}`"))),
        }
    }
}

/// Expected pose of the robot after the next motion command completes.
///
/// Produced when a path is loaded; consumed one-for-one with controller
/// acknowledgements in [`RobotMode::Path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: i32,
    pub y: i32,
    pub heading: i32,
}

/// An obstacle descriptor as submitted by the operator.
///
/// The hub never interprets these; they are forwarded verbatim to the
/// planning backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facing: Option<String>,
}

/// A high-level request routed to the action dispatcher.
///
/// Produced by the inbound router from validated wireless input (or by the
/// command executor for capture/stitch triggers); never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ChangeMode(RobotMode),
    SetObstacles(Vec<Obstacle>),
    NavigateAroundObstacle(Obstacle),
    Snapshot { obstacle_id: String },
    Stitch,
}

/// Fault taxonomy spanning both links, the backend, and the wire protocol.
#[derive(Debug, Error)]
pub enum HubError {
    /// The wireless transport failed to send or receive.
    #[error("radio link fault: {0}")]
    Radio(String),

    /// The motor-controller transport failed.
    #[error("controller link fault: {0}")]
    Controller(String),

    /// The planning/vision backend returned a failure.
    #[error("backend fault: {0}")]
    Backend(String),

    /// An unrecognized command or acknowledgement token. Indicates a
    /// desynchronized pipeline; the owning worker must terminate.
    #[error("protocol violation: unrecognized token `{0}`")]
    Protocol(String),

    /// An inbound message that could not be decoded.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// A camera or buzzer driver failure.
    #[error("hardware fault on {component}: {details}")]
    Hardware { component: String, details: String },

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A worker task died without reporting its own error (panic or
    /// runtime cancellation).
    #[error("worker failure: {0}")]
    Worker(String),
}

/// Typed result of handling one message, command, or action.
///
/// Only [`Outcome::Fault`] ends a worker's loop; rejections are answered
/// with an error message to the operator and the loop continues.
#[derive(Debug)]
pub enum Outcome {
    /// Processed, side effects applied.
    Handled,
    /// Legal in form but illegal in the current mode or state; the reason
    /// is relayed to the operator.
    Rejected(String),
    /// Nonrecoverable for the owning worker.
    Fault(HubError),
}
