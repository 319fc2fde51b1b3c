//! State Transitions
//!
//! The pure core of the game: `(state, action) -> state`.
//! No clocks, no storage, no timers. Rejected actions leave the input
//! state untouched and return an error instead.

use crate::game::action::Action;
use crate::game::config::{GameConfig, TimeoutPolicy};
use crate::game::events::GameEvent;
use crate::game::state::{Candidate, GameState, Phase, Player, Target};
use crate::matching::{MatchEngine, MatchPolicy};
use crate::share::codec::Challenge;

/// Result of applying an action.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    /// State after the action
    pub state: GameState,
    /// Events produced, in order
    pub events: Vec<GameEvent>,
}

/// Errors from invalid actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Player name is empty.
    #[error("player name must not be empty")]
    EmptyPlayerName,

    /// Target label is empty.
    #[error("target label must not be empty")]
    EmptyTargetLabel,

    /// Action not allowed in the current phase.
    #[error("{action} requires phase {expected:?}, game is {actual:?}")]
    InvalidPhase {
        action: &'static str,
        expected: Phase,
        actual: Phase,
    },

    /// Challenge carries a score that already ended the game.
    #[error("challenge already decided (scores {player1_score}/{player2_score})")]
    ChallengeDecided {
        player1_score: u32,
        player2_score: u32,
    },
}

/// Apply `action` to `state`.
pub fn apply(
    state: &GameState,
    action: Action,
    config: &GameConfig,
    engine: &MatchEngine,
) -> Result<Step, GameError> {
    let name = action.name();
    match action {
        Action::StartNewGame { player_name } => start_new_game(&player_name),
        Action::BeginChallenge { target } => {
            require_phase(state, name, Phase::Idle)?;
            begin_challenge(state, target, config)
        }
        Action::JoinChallenge { challenge, player_name } => {
            require_phase(state, name, Phase::Idle)?;
            join_challenge(&challenge, &player_name, config)
        }
        Action::Tick => {
            require_phase(state, name, Phase::AwaitingMatch)?;
            Ok(tick(state, config))
        }
        Action::SubmitCandidate { candidate, policy } => {
            require_phase(state, name, Phase::AwaitingMatch)?;
            Ok(submit_candidate(state, &candidate, policy, config, engine))
        }
        Action::Timeout => {
            require_phase(state, name, Phase::AwaitingMatch)?;
            Ok(timeout(state, config))
        }
        Action::Reset { player_name } => Ok(reset(player_name)),
    }
}

fn require_phase(state: &GameState, action: &'static str, expected: Phase) -> Result<(), GameError> {
    if state.phase == expected {
        Ok(())
    } else {
        Err(GameError::InvalidPhase {
            action,
            expected,
            actual: state.phase,
        })
    }
}

fn clean_name(name: &str) -> Result<String, GameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::EmptyPlayerName);
    }
    Ok(name.to_string())
}

fn start_new_game(player_name: &str) -> Result<Step, GameError> {
    let player_name = clean_name(player_name)?;
    Ok(Step {
        state: GameState::with_player_name(player_name.clone()),
        events: vec![GameEvent::GameStarted { player_name }],
    })
}

/// Labels and names are stored trimmed, the same form the peer decodes.
fn begin_challenge(state: &GameState, target: Target, config: &GameConfig) -> Result<Step, GameError> {
    let target_label = target.label.trim().to_string();
    if target_label.is_empty() {
        return Err(GameError::EmptyTargetLabel);
    }
    let originator = state.active_seat();
    let originator_name = clean_name(&state.player(originator).name)?;

    let mut next = state.clone();
    let finder = originator.other();
    next.player_mut(originator).name = originator_name;
    next.active_player_is_one = finder.is_one();
    next.remaining_seconds = config.round_seconds;
    next.phase = Phase::AwaitingMatch;
    next.target = Some(Target {
        label: target_label.clone(),
        ..target
    });

    Ok(Step {
        state: next,
        events: vec![GameEvent::ChallengeBegun { target_label, finder }],
    })
}

fn join_challenge(challenge: &Challenge, player_name: &str, config: &GameConfig) -> Result<Step, GameError> {
    let player_name = clean_name(player_name)?;
    if challenge.player1_score >= config.win_threshold || challenge.player2_score >= config.win_threshold {
        return Err(GameError::ChallengeDecided {
            player1_score: challenge.player1_score,
            player2_score: challenge.player2_score,
        });
    }

    let state = GameState {
        phase: Phase::AwaitingMatch,
        player1: Player::new(challenge.originator_name.clone(), challenge.player1_score),
        player2: Player::new(player_name, challenge.player2_score),
        active_player_is_one: false,
        target: Some(Target::new(challenge.target_label.clone(), config.default_confidence)),
        remaining_seconds: config.round_seconds,
        winner: None,
    };

    Ok(Step {
        state,
        events: vec![GameEvent::ChallengeJoined {
            target_label: challenge.target_label.clone(),
            originator_name: challenge.originator_name.clone(),
        }],
    })
}

fn tick(state: &GameState, config: &GameConfig) -> Step {
    let remaining = state.remaining_seconds.saturating_sub(1);
    if remaining == 0 {
        return timeout(state, config);
    }

    let mut next = state.clone();
    next.remaining_seconds = remaining;
    Step {
        state: next,
        events: Vec::new(),
    }
}

fn submit_candidate(
    state: &GameState,
    candidate: &Candidate,
    policy: MatchPolicy,
    config: &GameConfig,
    engine: &MatchEngine,
) -> Step {
    let Some(target) = state.target.as_ref() else {
        // Unreachable while the phase invariant holds.
        return Step {
            state: state.clone(),
            events: Vec::new(),
        };
    };

    let verdict = engine.evaluate(target, candidate, policy);
    if !verdict.matched {
        return Step {
            state: state.clone(),
            events: vec![GameEvent::CandidateRejected {
                label: candidate.label.clone(),
                kind: verdict.kind,
                similarity: verdict.similarity,
            }],
        };
    }

    let seat = state.active_seat();
    let mut next = state.clone();
    let player = next.player_mut(seat);
    player.score += 1;
    let new_score = player.score;

    next.target = None;
    let mut events = vec![GameEvent::ObjectFound {
        seat,
        label: candidate.label.clone(),
        new_score,
    }];

    if new_score >= config.win_threshold {
        next.phase = Phase::GameOver;
        next.winner = Some(seat);
        next.remaining_seconds = 0;
        events.push(GameEvent::GameWon { seat, score: new_score });
    } else {
        // The finder now holds the turn and originates the next challenge.
        next.phase = Phase::Idle;
        next.remaining_seconds = config.round_seconds;
    }

    Step { state: next, events }
}

fn timeout(state: &GameState, config: &GameConfig) -> Step {
    let mut next = state.clone();
    let target_label = next.target.take().map(|t| t.label).unwrap_or_default();
    next.phase = Phase::Idle;
    next.remaining_seconds = config.round_seconds;

    let mut events = vec![GameEvent::TimedOut { target_label }];
    if config.timeout_policy == TimeoutPolicy::FlipTurn {
        let to = state.active_seat().other();
        next.active_player_is_one = to.is_one();
        events.push(GameEvent::TurnFlipped { to });
    }

    Step { state: next, events }
}

fn reset(player_name: Option<String>) -> Step {
    let name = player_name.map(|n| n.trim().to_string()).unwrap_or_default();
    Step {
        state: GameState::with_player_name(name),
        events: vec![GameEvent::GameReset],
    }
}

// =============================================================================
// TESTS
// =============================================================================
