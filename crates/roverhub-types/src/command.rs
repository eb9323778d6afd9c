//! Motor-controller command tokens.
//!
//! The hub forwards these verbatim; classification only decides *how* a
//! token moves through the executor (does it hold the movement permit, is
//! it a capture trigger, does it end a path), never what the controller
//! does with it.

use serde::{Deserialize, Serialize};

/// Two-letter prefixes of the motion primitives, each followed by a
/// two-digit magnitude (`FW10`, `TR90`, …).
const MOTION_PREFIXES: [&str; 8] = ["FW", "BW", "FL", "FR", "BL", "BR", "TL", "TR"];

/// An opaque controller command token.
///
/// Produced by the inbound router (manual driving) or the action
/// dispatcher (path load); consumed once by the command executor and then
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command(String);

/// How the executor treats a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Motion primitive: forwarded to the controller, permit held until
    /// the acknowledgement comes back.
    Motion,
    /// Acknowledgement tone / buzzer count (`ZZ` + two digits). Travels
    /// the same acknowledged round-trip as a motion primitive.
    Signal,
    /// Capture trigger (`SNAP<obstacle_id>`): becomes a snapshot action.
    Capture { obstacle_id: String },
    /// `NOOP`: releases the permit, no transport I/O.
    Noop,
    /// `FIN`: end-of-path marker.
    Finish,
    /// Anything else – a protocol violation.
    Unknown,
}

impl Command {
    pub fn new(token: impl Into<String>) -> Self {
        Command(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify the raw token.
    pub fn kind(&self) -> CommandKind {
        let token = self.0.as_str();
        match token {
            "FIN" => return CommandKind::Finish,
            "NOOP" => return CommandKind::Noop,
            _ => {}
        }
        if let Some(id) = token.strip_prefix("SNAP") {
            if !id.is_empty() {
                return CommandKind::Capture {
                    obstacle_id: id.to_string(),
                };
            }
            return CommandKind::Unknown;
        }
        if let Some(rest) = token.strip_prefix("ZZ") {
            if is_two_digits(rest) {
                return CommandKind::Signal;
            }
            return CommandKind::Unknown;
        }
        for prefix in MOTION_PREFIXES {
            if let Some(rest) = token.strip_prefix(prefix) {
                if is_two_digits(rest) {
                    return CommandKind::Motion;
                }
            }
        }
        CommandKind::Unknown
    }
}

impl From<&str> for Command {
    fn from(token: &str) -> Self {
        Command(token.to_string())
    }
}

impl From<String> for Command {
    fn from(token: String) -> Self {
        Command(token)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_two_digits(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit())
}
