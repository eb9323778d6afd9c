//! Wireless wire format: newline-delimited JSON `{cat, value}` objects in
//! both directions.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{HubError, RobotMode, Waypoint};

/// Category tag of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Info,
    Error,
    Location,
    ImageRec,
    Status,
}

/// A message destined for the operator's device.
///
/// Produced by every worker that needs to inform the remote operator;
/// consumed only by the outbound sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub cat: Category,
    pub value: Value,
}

impl OutgoingMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self { cat: Category::Info, value: Value::String(text.into()) }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { cat: Category::Error, value: Value::String(text.into()) }
    }

    pub fn status(text: impl Into<String>) -> Self {
        Self { cat: Category::Status, value: Value::String(text.into()) }
    }

    /// Current robot mode, published on startup, after a mode change is
    /// acknowledged, and after link recovery.
    pub fn mode(mode: RobotMode) -> Self {
        Self {
            cat: Category::Status,
            value: json!({ "mode": mode.to_string() }),
        }
    }

    /// Expected pose after the acknowledged motion command.
    pub fn location(waypoint: &Waypoint) -> Self {
        Self {
            cat: Category::Location,
            value: json!({
                "x": waypoint.x,
                "y": waypoint.y,
                "heading": waypoint.heading,
            }),
        }
    }

    /// Image-recognition verdict for one obstacle.
    pub fn image_rec(obstacle_id: &str, label: &str) -> Self {
        Self {
            cat: Category::ImageRec,
            value: json!({ "obstacle_id": obstacle_id, "label": label }),
        }
    }
}

/// A decoded message from the operator's device.
///
/// `cat` stays a plain string here: unknown categories are a routing
/// decision (drop + log), not a parse failure.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub cat: String,
    #[serde(default)]
    pub value: Value,
}

impl InboundMessage {
    /// Decode one raw frame.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Malformed`] when the frame is not a `{cat, value}`
    /// JSON object. Callers drop malformed frames without side effects.
    pub fn parse(raw: &str) -> Result<Self, HubError> {
        serde_json::from_str(raw).map_err(|e| HubError::Malformed(e.to_string()))
    }

    /// The `value` field as a string slice, if it is one.
    pub fn value_str(&self) -> Option<&str> {
        self.value.as_str()
    }
}
