//! Game Events
//!
//! Events emitted by state transitions. The pure core only reports them;
//! the session layer turns them into side effects (persistence, timers,
//! log lines).

use serde::{Deserialize, Serialize};

use crate::game::state::Seat;
use crate::matching::MatchKind;

/// Something that happened during a transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A new game was started by the local player.
    GameStarted {
        player_name: String,
    },

    /// The turn holder sent out a target.
    ChallengeBegun {
        target_label: String,
        finder: Seat,
    },

    /// A challenge from the peer was accepted.
    ChallengeJoined {
        target_label: String,
        originator_name: String,
    },

    /// A candidate did not satisfy the target.
    CandidateRejected {
        label: String,
        kind: Option<MatchKind>,
        similarity: f32,
    },

    /// The active finder found the target.
    ObjectFound {
        seat: Seat,
        label: String,
        new_score: u32,
    },

    /// The turn moved to the other seat.
    TurnFlipped {
        to: Seat,
    },

    /// The countdown ran out.
    TimedOut {
        target_label: String,
    },

    /// A player reached the win threshold.
    GameWon {
        seat: Seat,
        score: u32,
    },

    /// Scores were cleared.
    GameReset,
}

impl GameEvent {
    /// Whether this event changes a player's name or score.
    pub fn touches_players(&self) -> bool {
        matches!(
            self,
            GameEvent::GameStarted { .. }
                | GameEvent::ChallengeJoined { .. }
                | GameEvent::ObjectFound { .. }
                | GameEvent::GameReset
        )
    }

    /// Whether this event ends the running round.
    pub fn ends_round(&self) -> bool {
        matches!(
            self,
            GameEvent::ObjectFound { .. } | GameEvent::TimedOut { .. } | GameEvent::GameReset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = GameEvent::ObjectFound {
            seat: Seat::Two,
            label: "bottle".to_string(),
            new_score: 1,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"object_found\""));
        assert!(json.contains("\"seat\":\"two\""));
    }

    #[test]
    fn test_event_classification() {
        assert!(GameEvent::GameReset.touches_players());
        assert!(GameEvent::GameReset.ends_round());
        let timed_out = GameEvent::TimedOut { target_label: "car".into() };
        assert!(!timed_out.touches_players());
        assert!(timed_out.ends_round());
        assert!(!GameEvent::TurnFlipped { to: Seat::One }.ends_round());
    }
}
