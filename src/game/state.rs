//! Game State Definitions
//!
//! All state types for a two-player find-the-object game.
//! One `GameState` lives on each device; peers reconcile only through
//! challenge links.

use serde::{Deserialize, Serialize};

// =============================================================================
// SEAT
// =============================================================================

/// One of the two player slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    /// `player1`
    One,
    /// `player2`
    Two,
}

impl Seat {
    /// The opposite seat.
    #[inline]
    pub fn other(self) -> Seat {
        match self {
            Seat::One => Seat::Two,
            Seat::Two => Seat::One,
        }
    }

    /// Seat designated by an `active_player_is_one` flag.
    #[inline]
    pub fn from_flag(is_one: bool) -> Seat {
        if is_one {
            Seat::One
        } else {
            Seat::Two
        }
    }

    /// Inverse of [`Seat::from_flag`].
    #[inline]
    pub fn is_one(self) -> bool {
        self == Seat::One
    }
}

// =============================================================================
// PLAYER
// =============================================================================

/// A player record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Display name (empty until known)
    pub name: String,

    /// Objects found this game
    pub score: u32,
}

impl Player {
    /// Create a player.
    pub fn new(name: impl Into<String>, score: u32) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

// =============================================================================
// TARGET / CANDIDATE
// =============================================================================

/// The object the active finder has to photograph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Object label
    pub label: String,

    /// Detector confidence when the target was captured, in `[0, 1]`
    pub confidence: f32,
}

impl Target {
    /// Create a target. Confidence is clamped to `[0, 1]`.
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence: clamp_confidence(confidence),
        }
    }
}

/// A `(label, confidence)` pair produced by a detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Detected label
    pub label: String,

    /// Detector confidence in `[0, 1]`
    pub confidence: f32,
}

impl Candidate {
    /// Create a candidate. Confidence is clamped to `[0, 1]`.
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence: clamp_confidence(confidence),
        }
    }
}

impl From<Candidate> for Target {
    fn from(candidate: Candidate) -> Self {
        Self {
            label: candidate.label,
            confidence: candidate.confidence,
        }
    }
}

fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

// =============================================================================
// PHASE
// =============================================================================

/// Game phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No target; the turn holder is expected to capture one
    #[default]
    Idle,
    /// A target is out and the countdown is running
    AwaitingMatch,
    /// Someone reached the win threshold (terminal)
    GameOver,
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Complete state of one device's game.
///
/// `active_player_is_one` names the active seat. While
/// [`Phase::AwaitingMatch`] it is the active finder; while [`Phase::Idle`]
/// it is the seat holding the turn, i.e. the next challenge originator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Current phase
    pub phase: Phase,

    /// First seat (the challenge originator on a joining device)
    pub player1: Player,

    /// Second seat
    pub player2: Player,

    /// Whether `player1` is the active seat
    pub active_player_is_one: bool,

    /// Active target (`Some` exactly while awaiting a match)
    pub target: Option<Target>,

    /// Countdown, only meaningful while awaiting a match
    pub remaining_seconds: u32,

    /// Winner (`Some` exactly when the game is over)
    pub winner: Option<Seat>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            player1: Player::default(),
            player2: Player::default(),
            active_player_is_one: true,
            target: None,
            remaining_seconds: 0,
            winner: None,
        }
    }
}

impl GameState {
    /// Fresh idle state with player1 named `name`.
    pub fn with_player_name(name: impl Into<String>) -> Self {
        Self {
            player1: Player::new(name, 0),
            ..Self::default()
        }
    }

    /// The active seat.
    #[inline]
    pub fn active_seat(&self) -> Seat {
        Seat::from_flag(self.active_player_is_one)
    }

    /// Player in `seat`.
    pub fn player(&self, seat: Seat) -> &Player {
        match seat {
            Seat::One => &self.player1,
            Seat::Two => &self.player2,
        }
    }

    /// Mutable player in `seat`.
    pub fn player_mut(&mut self, seat: Seat) -> &mut Player {
        match seat {
            Seat::One => &mut self.player1,
            Seat::Two => &mut self.player2,
        }
    }

    /// Active finder, if a challenge is running.
    pub fn finder(&self) -> Option<&Player> {
        (self.phase == Phase::AwaitingMatch).then(|| self.player(self.active_seat()))
    }

    /// Originator of the running challenge, if any.
    pub fn originator(&self) -> Option<&Player> {
        (self.phase == Phase::AwaitingMatch).then(|| self.player(self.active_seat().other()))
    }

    /// Whether the game has ended.
    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// Check the state invariants against `win_threshold`.
    ///
    /// Returns a description of the first violated invariant.
    pub fn check_invariants(&self, win_threshold: u32) -> Result<(), String> {
        if (self.winner.is_some()) != (self.phase == Phase::GameOver) {
            return Err(format!("winner {:?} in phase {:?}", self.winner, self.phase));
        }
        if (self.target.is_some()) != (self.phase == Phase::AwaitingMatch) {
            return Err(format!("target {:?} in phase {:?}", self.target, self.phase));
        }

        let one = self.player1.score >= win_threshold;
        let two = self.player2.score >= win_threshold;
        match self.winner {
            Some(seat) => {
                let (mine, theirs) = (self.player(seat).score, self.player(seat.other()).score);
                if one == two || mine < win_threshold || mine <= theirs {
                    return Err(format!("winner {seat:?} with scores {mine}/{theirs}"));
                }
            }
            None if one || two => {
                return Err(format!(
                    "score reached {win_threshold} without a winner ({}/{})",
                    self.player1.score, self.player2.score
                ));
            }
            None => {}
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
