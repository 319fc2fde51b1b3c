//! Game Actions
//!
//! The closed set of inputs the state machine accepts.

use serde::{Deserialize, Serialize};

use crate::game::state::{Candidate, Target};
use crate::matching::MatchPolicy;
use crate::share::codec::Challenge;

/// Tagged action applied by [`crate::game::transition::apply`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Start a fresh game as player1.
    StartNewGame { player_name: String },

    /// Send out a captured target; the other seat becomes the finder.
    BeginChallenge { target: Target },

    /// Accept a challenge decoded from a peer's link.
    JoinChallenge {
        challenge: Challenge,
        player_name: String,
    },

    /// One second of countdown elapsed.
    Tick,

    /// Judge one detected candidate against the target.
    SubmitCandidate {
        candidate: Candidate,
        policy: MatchPolicy,
    },

    /// The countdown ran out.
    Timeout,

    /// Clear scores and return to idle, keeping `player_name` for player1.
    Reset { player_name: Option<String> },
}

impl Action {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Action::StartNewGame { .. } => "start_new_game",
            Action::BeginChallenge { .. } => "begin_challenge",
            Action::JoinChallenge { .. } => "join_challenge",
            Action::Tick => "tick",
            Action::SubmitCandidate { .. } => "submit_candidate",
            Action::Timeout => "timeout",
            Action::Reset { .. } => "reset",
        }
    }
}
