//! # Hitta
//!
//! Core of a serverless two-player "find the object" game. One player
//! photographs an object, the other has a countdown to photograph the same
//! kind of object. Devices never talk to a server: challenges travel as
//! links the players send each other.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                           HITTA                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/           - Turn state machine (pure)                 │
//! │  ├── state.rs    - Players, target, phase                    │
//! │  ├── action.rs   - Closed set of actions                     │
//! │  ├── transition.rs - (state, action) -> state                │
//! │  └── machine.rs  - Per-device owner of the state             │
//! │                                                              │
//! │  matching/       - Label matching (pure)                     │
//! │  ├── category.rs - Category registry                         │
//! │  └── engine.rs   - Similarity and thresholds                 │
//! │                                                              │
//! │  share/          - Device to device                          │
//! │  ├── codec.rs    - Challenge tokens                          │
//! │  ├── link.rs     - Links and share text                      │
//! │  └── messenger.rs- Delivery with fallbacks                   │
//! │                                                              │
//! │  storage/        - Name and score persistence                │
//! │  session/        - Countdown, detector, wiring (async)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purity
//!
//! `game/` and `matching/` have no clocks, storage, timers or logging.
//! Every transition is a function of the previous state and one action,
//! so any game can be replayed from its action log.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod game;
pub mod matching;
pub mod session;
pub mod share;
pub mod storage;

// Re-export commonly used types
pub use game::{Action, GameConfig, GameError, GameEvent, GameState, GameStateMachine, Phase, Player, Seat};
pub use game::{Candidate, Target};
pub use matching::{CategoryRegistry, MatchEngine, MatchPolicy};
pub use session::{Detector, GameSession, SessionError};
pub use share::{decode, encode, Challenge, Messenger, ShareConfig};
pub use storage::{FileStore, KeyValueStore, MemoryStore, ScoreLedger};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Score that ends a game by default
pub const WIN_THRESHOLD: u32 = game::config::WIN_THRESHOLD;
