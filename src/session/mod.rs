//! Session Layer
//!
//! Runs a game on one device: the countdown, persistence and the external
//! detector and messenger collaborators around the pure state machine.
//!
//! - `detector`: object detection capability
//! - `timer`: once-per-second countdown task
//! - `runner`: the session adapter

pub mod detector;
pub mod runner;
pub mod timer;

pub use detector::{Detector, DetectorError, FixedDetector};
pub use runner::{GameSession, OutgoingChallenge, SessionError};
pub use timer::{RoundTimer, TICK_PERIOD};
