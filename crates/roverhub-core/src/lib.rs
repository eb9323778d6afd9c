//! `roverhub-core` – Command Coordination and Link-Recovery Core.
//!
//! Everything with real concurrency lives here: the shared coordination
//! state, the four queues, and the six long-running workers that bridge
//! the operator's device, the motor-controller board, and the planning
//! backend while enforcing the move-then-acknowledge discipline.
//!
//! # Workers
//!
//! | Worker | Reads | Writes |
//! |---|---|---|
//! | [`router`] | radio link | command + action queues |
//! | [`executor`] | command queue | motor link, action queue |
//! | [`ack_listener`] | motor link | waypoint feed, outgoing queue |
//! | [`dispatcher`] | action queue | backend, queues, motor link |
//! | [`sender`] | outgoing queue | radio link |
//! | [`supervisor`] | link-health flag | restarts the two radio workers |
//!
//! No worker shares mutable state with another except through
//! [`HubContext`][context::HubContext]: the queues plus the mode flag,
//! movement permit, path gate, and link-health flag in
//! [`SharedState`][state::SharedState].
//!
//! [`Hub`][hub::Hub] wires all of it together.

pub mod ack_listener;
pub mod context;
pub mod dispatcher;
pub mod executor;
pub mod hub;
pub mod queue;
pub mod router;
pub mod sender;
pub mod state;
pub mod supervisor;

pub use context::{CoreConfig, HubContext};
pub use dispatcher::ActionDispatcher;
pub use hub::Hub;
pub use queue::SharedQueue;
pub use state::SharedState;
pub use supervisor::LinkSupervisor;
