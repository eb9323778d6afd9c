//! `roverhub-hal` – On-board hardware shims.
//!
//! The coordination core only sees the [`Camera`] and [`Buzzer`] traits;
//! drivers can be swapped without touching any routing logic.
//!
//! # Modules
//!
//! - [`camera`] – [`Camera`][camera::Camera] trait plus
//!   [`StillCamera`][camera::StillCamera], a shim that shells out to a
//!   still-capture binary.
//! - [`buzzer`] – [`Buzzer`][buzzer::Buzzer] trait plus the log-only
//!   [`ConsoleBuzzer`][buzzer::ConsoleBuzzer].

pub mod buzzer;
pub mod camera;

pub use buzzer::{Buzzer, ConsoleBuzzer};
pub use camera::{Camera, CameraFrame, StillCamera};
