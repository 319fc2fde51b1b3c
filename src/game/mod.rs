//! Game Logic Module
//!
//! The turn-based state machine. Pure: no clocks, storage or timers.
//!
//! ## Module Structure
//!
//! - `state`: players, target, phase, game state
//! - `action`: tagged actions accepted by the machine
//! - `config`: round length, win threshold, policies
//! - `transition`: pure `(state, action) -> state`
//! - `machine`: owner of one device's state
//! - `events`: events reported by transitions

pub mod action;
pub mod config;
pub mod events;
pub mod machine;
pub mod state;
pub mod transition;

// Re-export key types
pub use action::Action;
pub use config::{ConfigError, GameConfig, TimeoutPolicy};
pub use events::GameEvent;
pub use machine::{GameStateMachine, SubmitOutcome, TickOutcome};
pub use state::{Candidate, GameState, Phase, Player, Seat, Target};
pub use transition::{apply, GameError, Step};
