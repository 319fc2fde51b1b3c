//! Game State Machine
//!
//! Owns one device's `GameState` and applies actions through the pure
//! transition function. Explicitly constructed per session; there is no
//! global instance.

use crate::game::action::Action;
use crate::game::config::GameConfig;
use crate::game::events::GameEvent;
use crate::game::state::{Candidate, GameState, Player, Seat, Target};
use crate::game::transition::{apply, GameError};
use crate::matching::{MatchEngine, MatchKind, MatchPolicy};
use crate::share::codec::Challenge;

/// Result of submitting a candidate.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// Candidate did not satisfy the target; state unchanged.
    Rejected {
        kind: Option<MatchKind>,
        similarity: f32,
    },
    /// Target found; the finder scored and now holds the turn.
    Found { seat: Seat, new_score: u32 },
    /// Target found and the finder reached the win threshold.
    Won { seat: Seat, score: u32 },
}

impl SubmitOutcome {
    /// Whether the candidate was accepted.
    pub fn is_match(&self) -> bool {
        !matches!(self, SubmitOutcome::Rejected { .. })
    }

    /// Summarize the events of a submission.
    pub fn from_events(events: &[GameEvent]) -> Self {
        let mut outcome = SubmitOutcome::Rejected {
            kind: None,
            similarity: 0.0,
        };
        for event in events {
            match event {
                GameEvent::CandidateRejected { kind, similarity, .. } => {
                    outcome = SubmitOutcome::Rejected {
                        kind: *kind,
                        similarity: *similarity,
                    };
                }
                GameEvent::ObjectFound { seat, new_score, .. } => {
                    outcome = SubmitOutcome::Found {
                        seat: *seat,
                        new_score: *new_score,
                    };
                }
                GameEvent::GameWon { seat, score } => {
                    outcome = SubmitOutcome::Won {
                        seat: *seat,
                        score: *score,
                    };
                }
                _ => {}
            }
        }
        outcome
    }
}

/// Result of a countdown tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Countdown still running.
    Running { remaining_seconds: u32 },
    /// Countdown hit zero and the round timed out.
    TimedOut,
}

/// Turn-based state machine for one device.
#[derive(Clone, Debug)]
pub struct GameStateMachine {
    state: GameState,
    config: GameConfig,
    engine: MatchEngine,
}

impl GameStateMachine {
    /// Create a machine in the default idle state.
    pub fn new(config: GameConfig) -> Self {
        Self::with_engine(config, MatchEngine::default())
    }

    /// Create a machine with a custom match engine.
    pub fn with_engine(config: GameConfig, engine: MatchEngine) -> Self {
        Self {
            state: GameState::default(),
            config,
            engine,
        }
    }

    /// Create a machine resuming persisted players.
    ///
    /// A stored score at or past the win threshold belongs to a finished
    /// game, so scores restart from zero in that case.
    pub fn hydrate(config: GameConfig, player1: Option<Player>, player2: Option<Player>, name: Option<String>) -> Self {
        let mut machine = Self::new(config);
        let state = &mut machine.state;
        if let Some(player) = player1 {
            state.player1 = player;
        } else if let Some(name) = name {
            state.player1.name = name;
        }
        if let Some(player) = player2 {
            state.player2 = player;
        }

        let threshold = machine.config.win_threshold;
        if state.player1.score >= threshold || state.player2.score >= threshold {
            state.player1.score = 0;
            state.player2.score = 0;
        }
        machine
    }

    /// Current state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Active configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Match engine used for candidate checks.
    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    /// Apply an action, replacing the state on success.
    pub fn dispatch(&mut self, action: Action) -> Result<Vec<GameEvent>, GameError> {
        let step = apply(&self.state, action, &self.config, &self.engine)?;
        self.state = step.state;
        Ok(step.events)
    }

    /// Start a fresh game as player1.
    pub fn start_new_game(&mut self, player_name: &str) -> Result<Vec<GameEvent>, GameError> {
        self.dispatch(Action::StartNewGame {
            player_name: player_name.to_string(),
        })
    }

    /// Send out a captured target.
    pub fn begin_challenge(&mut self, target: Target) -> Result<Vec<GameEvent>, GameError> {
        self.dispatch(Action::BeginChallenge { target })
    }

    /// Accept a peer's challenge.
    pub fn join_challenge(&mut self, challenge: Challenge, player_name: &str) -> Result<Vec<GameEvent>, GameError> {
        self.dispatch(Action::JoinChallenge {
            challenge,
            player_name: player_name.to_string(),
        })
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> Result<TickOutcome, GameError> {
        let events = self.dispatch(Action::Tick)?;
        if events.iter().any(|e| matches!(e, GameEvent::TimedOut { .. })) {
            Ok(TickOutcome::TimedOut)
        } else {
            Ok(TickOutcome::Running {
                remaining_seconds: self.state.remaining_seconds,
            })
        }
    }

    /// Judge a candidate with the configured policy.
    pub fn submit_candidate(&mut self, candidate: Candidate) -> Result<SubmitOutcome, GameError> {
        let policy = self.config.match_policy;
        self.submit_candidate_with(candidate, policy)
    }

    /// Judge a candidate with an explicit policy.
    pub fn submit_candidate_with(
        &mut self,
        candidate: Candidate,
        policy: MatchPolicy,
    ) -> Result<SubmitOutcome, GameError> {
        let events = self.dispatch(Action::SubmitCandidate { candidate, policy })?;
        Ok(SubmitOutcome::from_events(&events))
    }

    /// End the round as if the countdown ran out.
    pub fn timeout(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.dispatch(Action::Timeout)
    }

    /// Clear scores, keeping `player_name` for player1.
    pub fn reset(&mut self, player_name: Option<String>) -> Vec<GameEvent> {
        self.dispatch(Action::Reset { player_name }).unwrap_or_default()
    }
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Phase;
    use crate::share::codec::{decode, encode_at};
    use proptest::prelude::*;

    fn alice_device() -> GameStateMachine {
        let mut machine = GameStateMachine::default();
        machine.start_new_game("Alice").unwrap();
        machine.begin_challenge(Target::new("bottle", 0.82)).unwrap();
        machine
    }

    fn bob_device(link: &str) -> GameStateMachine {
        let challenge = decode(link).unwrap();
        let mut machine = GameStateMachine::default();
        machine.join_challenge(challenge, "Bob").unwrap();
        machine
    }

    #[test]
    fn test_scenario_a_join() {
        let alice = alice_device();
        let token = encode_at(alice.state(), 1_700_000_000_000).unwrap();
        let bob = bob_device(&format!("https://hitta.app/?game={token}"));

        let state = bob.state();
        assert_eq!(state.player1, Player::new("Alice", 0));
        assert_eq!(state.player2, Player::new("Bob", 0));
        assert_eq!(state.finder().unwrap().name, "Bob");
        assert_eq!(state.phase, Phase::AwaitingMatch);
        assert_eq!(state.remaining_seconds, 120);
    }

    #[test]
    fn test_scenario_b_find() {
        let token = encode_at(alice_device().state(), 0).unwrap();
        let mut bob = bob_device(&format!("https://hitta.app/#/?game={token}"));

        let outcome = bob.submit_candidate(Candidate::new("bottle", 0.8)).unwrap();
        assert_eq!(outcome, SubmitOutcome::Found { seat: Seat::Two, new_score: 1 });

        let state = bob.state();
        assert_eq!(state.player2.score, 1);
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.target.is_none());

        // Bob originates the next challenge; Alice becomes the finder.
        bob.begin_challenge(Target::new("cup", 0.9)).unwrap();
        assert_eq!(bob.state().finder().unwrap().name, "Alice");
        assert_eq!(bob.state().originator().unwrap().name, "Bob");
    }

    struct Device {
        name: &'static str,
        machine: GameStateMachine,
    }

    #[test]
    fn test_scenario_c_game_over() {
        let alice = alice_device();
        let token = encode_at(alice.state(), 0).unwrap();
        let mut finder = Device { name: "Bob", machine: bob_device(&token) };
        let mut originator = Device { name: "Alice", machine: alice };

        let labels = ["cup", "car", "book", "apple", "chair", "dog", "laptop", "pizza"];
        let mut next_label = labels.iter();
        loop {
            let label = finder.machine.state().target.as_ref().unwrap().label.clone();
            let outcome = finder.machine.submit_candidate(Candidate::new(label, 0.9)).unwrap();
            if let SubmitOutcome::Won { score, .. } = outcome {
                assert_eq!(score, 5);
                break;
            }

            // The finder now challenges back; the peer's stale round expires first.
            let target = Target::new(*next_label.next().unwrap(), 0.9);
            finder.machine.begin_challenge(target).unwrap();
            let token = encode_at(finder.machine.state(), 0).unwrap();
            originator.machine.timeout().unwrap();
            originator
                .machine
                .join_challenge(decode(&token).unwrap(), originator.name)
                .unwrap();
            std::mem::swap(&mut finder, &mut originator);
        }

        assert_eq!(finder.name, "Bob");
        let state = finder.machine.state().clone();
        assert_eq!(state.phase, Phase::GameOver);
        assert_eq!(state.winner, Some(Seat::Two));
        assert_eq!(state.player2, Player::new("Bob", 5));
        assert_eq!(state.player1, Player::new("Alice", 4));
        assert!(state.check_invariants(5).is_ok());

        let late = finder.machine.submit_candidate(Candidate::new("bottle", 0.9));
        assert!(late.is_err());
        assert_eq!(finder.machine.state(), &state);
    }

    #[test]
    fn test_scenario_d_timeout_by_ticks() {
        let mut machine = GameStateMachine::default();
        machine.start_new_game("Alice").unwrap();
        machine.begin_challenge(Target::new("car", 0.9)).unwrap();
        let finder_before = machine.state().active_seat();

        let mut outcome = TickOutcome::Running { remaining_seconds: 120 };
        for _ in 0..120 {
            outcome = machine.tick().unwrap();
        }
        assert_eq!(outcome, TickOutcome::TimedOut);

        let state = machine.state();
        assert!(state.target.is_none());
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.active_seat(), finder_before.other());
        assert_eq!(state.player1.score + state.player2.score, 0);
        assert!(machine.tick().is_err());
    }

    #[test]
    fn test_rejected_submission_keeps_state() {
        let mut machine = alice_device();
        let before = machine.state().clone();
        let outcome = machine.submit_candidate(Candidate::new("dog", 0.9)).unwrap();
        assert!(!outcome.is_match());
        assert_eq!(machine.state(), &before);
    }

    #[test]
    fn test_hydrate_restores_players() {
        let machine = GameStateMachine::hydrate(
            GameConfig::default(),
            Some(Player::new("Alice", 3)),
            Some(Player::new("Bob", 2)),
            None,
        );
        assert_eq!(machine.state().player1, Player::new("Alice", 3));
        assert_eq!(machine.state().player2, Player::new("Bob", 2));

        let finished = GameStateMachine::hydrate(
            GameConfig::default(),
            Some(Player::new("Alice", 5)),
            None,
            None,
        );
        assert_eq!(finished.state().player1, Player::new("Alice", 0));

        let named = GameStateMachine::hydrate(GameConfig::default(), None, None, Some("Carol".into()));
        assert_eq!(named.state().player1.name, "Carol");
    }

    #[test]
    fn test_reset_preserves_name() {
        let mut machine = alice_device();
        machine.reset(Some("Alice".into()));
        assert_eq!(machine.state(), &GameState::with_player_name("Alice"));
    }

    #[derive(Clone, Debug)]
    enum Move {
        Find,
        Miss,
        Expire,
    }

    fn moves() -> impl Strategy<Value = Vec<Move>> {
        prop::collection::vec(
            prop_oneof![Just(Move::Find), Just(Move::Miss), Just(Move::Expire)],
            0..40,
        )
    }

    proptest! {
        #[test]
        fn prop_scores_count_attributed_finds(moves in moves()) {
            // Both seats originate challenges, so both need names.
            let mut machine = GameStateMachine::hydrate(
                GameConfig::default(),
                Some(Player::new("Alice", 0)),
                Some(Player::new("Bob", 0)),
                None,
            );
            let mut finds = [0u32; 2];
            let mut winner_seen = None;

            for step in moves {
                if machine.state().is_over() {
                    let before = machine.state().clone();
                    prop_assert!(machine.submit_candidate(Candidate::new("cup", 0.9)).is_err());
                    prop_assert_eq!(machine.state(), &before);
                    continue;
                }
                machine.begin_challenge(Target::new("cup", 0.9)).unwrap();
                let finder = machine.state().active_seat();
                match step {
                    Move::Find => {
                        machine.submit_candidate(Candidate::new("cup", 0.9)).unwrap();
                        let idx = if finder.is_one() { 0 } else { 1 };
                        finds[idx] += 1;
                        if finds[idx] == 5 {
                            winner_seen = Some(finder);
                        }
                    }
                    Move::Miss => {
                        machine.submit_candidate(Candidate::new("dog", 0.9)).unwrap();
                        machine.timeout().unwrap();
                    }
                    Move::Expire => {
                        machine.timeout().unwrap();
                    }
                }

                let state = machine.state();
                prop_assert_eq!(state.player1.score, finds[0]);
                prop_assert_eq!(state.player2.score, finds[1]);
                prop_assert_eq!(state.winner, winner_seen);
                prop_assert!(state.check_invariants(5).is_ok());
            }
        }
    }
}
