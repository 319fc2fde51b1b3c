//! Game Session
//!
//! Thin adapter around the pure state machine for one device. It owns the
//! side effects the core leaves out: the countdown task, persistence, link
//! encoding and the detector and messenger calls.
//!
//! Every mutation takes the session write lock, so a candidate and the
//! countdown can never interleave: whichever terminal transition acquires
//! the lock first wins and the other becomes a rejected no-op.

use std::ops::ControlFlow;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::game::action::Action;
use crate::game::config::GameConfig;
use crate::game::events::GameEvent;
use crate::game::machine::{GameStateMachine, SubmitOutcome};
use crate::game::state::{Candidate, GameState, Phase, Seat, Target};
use crate::game::transition::GameError;
use crate::matching::{MatchPolicy, MIN_CONFIDENCE};
use crate::session::detector::Detector;
use crate::session::timer::{RoundTimer, TICK_PERIOD};
use crate::share::codec::{decode, encode_challenge, Challenge, CodecError};
use crate::share::link::{ShareConfig, ShareMessage};
use crate::share::messenger::{deliver, Delivery, Messenger};
use crate::storage::backend::KeyValueStore;
use crate::storage::ledger::ScoreLedger;

// =============================================================================
// ERRORS
// =============================================================================

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The state machine rejected the action.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The running challenge could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The link carries no valid challenge.
    #[error("no valid challenge in link")]
    NoChallenge,

    /// The detector found nothing usable.
    #[error("no object found")]
    NoObjectFound,
}

// =============================================================================
// SHARED STATE
// =============================================================================

/// A challenge that left this device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingChallenge {
    /// The encoded snapshot
    pub challenge: Challenge,
    /// Link carrying it
    pub link: String,
}

/// The last successful find, for score messages.
#[derive(Clone, Debug, PartialEq, Eq)]
struct LastFind {
    seat: Seat,
    label: String,
}

struct Shared<S> {
    machine: GameStateMachine,
    ledger: ScoreLedger<S>,
    /// Bumped whenever a round ends so a stale countdown stops on its next tick.
    round: u64,
    last_find: Option<LastFind>,
}

impl<S: KeyValueStore> Shared<S> {
    /// Apply the side effects of `events`.
    fn record(&mut self, events: &[GameEvent]) {
        for event in events {
            match event {
                GameEvent::ObjectFound { seat, label, new_score } => {
                    info!("{} found a {} (score {})", self.machine.state().player(*seat).name, label, new_score);
                    self.last_find = Some(LastFind {
                        seat: *seat,
                        label: label.clone(),
                    });
                }
                GameEvent::CandidateRejected { label, similarity, .. } => {
                    debug!("Rejected {} (similarity {:.2})", label, similarity);
                }
                GameEvent::GameWon { seat, score } => {
                    info!("{} wins with {}", self.machine.state().player(*seat).name, score);
                }
                GameEvent::TimedOut { target_label } => {
                    info!("Round for {} timed out", target_label);
                }
                GameEvent::GameReset => self.last_find = None,
                _ => {}
            }
        }

        if events.iter().any(GameEvent::ends_round) {
            self.round += 1;
        }
        if events.iter().any(GameEvent::touches_players) {
            self.ledger.save(self.machine.state());
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// One device's game session.
pub struct GameSession<S> {
    shared: Arc<RwLock<Shared<S>>>,
    timer: Option<RoundTimer>,
    share: ShareConfig,
}

impl<S> GameSession<S>
where
    S: KeyValueStore + Send + Sync + 'static,
{
    /// Open a session, resuming whatever the store holds.
    pub fn open(store: S, config: GameConfig, share: ShareConfig) -> Self {
        let ledger = ScoreLedger::new(store);
        let snapshot = ledger.load();
        let machine = GameStateMachine::hydrate(config, snapshot.player1, snapshot.player2, snapshot.name);
        {
            let state = machine.state();
            info!(
                "Session opened: {:?} {} - {:?} {}",
                state.player1.name, state.player1.score, state.player2.name, state.player2.score
            );
        }

        Self {
            shared: Arc::new(RwLock::new(Shared {
                machine,
                ledger,
                round: 0,
                last_find: None,
            })),
            timer: None,
            share,
        }
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> GameState {
        self.shared.read().await.machine.state().clone()
    }

    /// Active configuration.
    pub async fn config(&self) -> GameConfig {
        self.shared.read().await.machine.config().clone()
    }

    /// Link settings.
    pub fn share_config(&self) -> &ShareConfig {
        &self.share
    }

    /// Whether a countdown task is running.
    pub fn countdown_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|timer| !timer.is_finished())
    }

    /// Start a fresh game as player1.
    pub async fn start_new_game(&mut self, player_name: &str) -> Result<(), SessionError> {
        self.stop_countdown();
        let mut shared = self.shared.write().await;
        let events = shared.machine.start_new_game(player_name)?;
        shared.ledger.save_name(player_name.trim());
        shared.last_find = None;
        shared.round += 1;
        shared.record(&events);
        info!("New game started by {}", player_name.trim());
        Ok(())
    }

    /// Pick a target from what the detector sees in `image`.
    ///
    /// The most confident detection at or above the confidence floor wins.
    pub async fn capture_target<D>(&self, detector: &D, image: &[u8]) -> Result<Target, SessionError>
    where
        D: Detector + ?Sized,
    {
        let candidates = detect(detector, image).await?;
        candidates
            .into_iter()
            .filter(|c| c.confidence >= MIN_CONFIDENCE)
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .map(Target::from)
            .ok_or(SessionError::NoObjectFound)
    }

    /// Send out `target` and start the countdown.
    pub async fn begin_challenge(&mut self, target: Target) -> Result<OutgoingChallenge, SessionError> {
        let outgoing = {
            let mut shared = self.shared.write().await;
            let events = shared.machine.begin_challenge(target)?;
            shared.record(&events);

            let state = shared.machine.state();
            let challenge = Challenge::from_state(state, Utc::now().timestamp_millis())
                .ok_or(CodecError::NoActiveTarget)?;
            let link = self.share.link(&encode_challenge(&challenge)?);
            info!(
                "Challenge sent: {} must find a {}",
                state.finder().map(|p| p.name.as_str()).unwrap_or_default(),
                challenge.target_label
            );
            OutgoingChallenge { challenge, link }
        };
        self.start_countdown().await;
        Ok(outgoing)
    }

    /// Begin a challenge and hand the link to `messenger`.
    ///
    /// Delivery never fails; the challenge counts as sent once encoded.
    pub async fn send_challenge<M>(&mut self, target: Target, messenger: &M) -> Result<Delivery, SessionError>
    where
        M: Messenger + ?Sized,
    {
        let outgoing = self.begin_challenge(target).await?;
        let round_seconds = self.shared.read().await.machine.config().round_seconds;
        let message = ShareMessage::challenge(&outgoing.challenge, outgoing.link, round_seconds);
        Ok(deliver(messenger, &message).await)
    }

    /// Accept the challenge carried by `link` and start the countdown.
    pub async fn join_from_link(&mut self, link: &str, player_name: &str) -> Result<Challenge, SessionError> {
        let Some(challenge) = decode(link) else {
            debug!("No usable challenge in {:?}", link);
            return Err(SessionError::NoChallenge);
        };

        {
            let mut shared = self.shared.write().await;
            let events = shared.machine.join_challenge(challenge.clone(), player_name)?;
            shared.ledger.save_name(player_name.trim());
            shared.record(&events);
            info!(
                "{} joined {}'s challenge: find a {}",
                player_name.trim(),
                challenge.originator_name,
                challenge.target_label
            );
        }
        self.start_countdown().await;
        Ok(challenge)
    }

    /// Judge one candidate with the configured policy.
    pub async fn submit_candidate(&mut self, candidate: Candidate) -> Result<SubmitOutcome, SessionError> {
        let policy = self.shared.read().await.machine.config().match_policy;
        self.submit(candidate, policy).await
    }

    /// Judge the candidate most similar to the target, permissively.
    pub async fn submit_detections(&mut self, candidates: &[Candidate]) -> Result<SubmitOutcome, SessionError> {
        let chosen = {
            let shared = self.shared.read().await;
            let state = shared.machine.state();
            let Some(target) = state.target.as_ref() else {
                return Err(GameError::InvalidPhase {
                    action: "submit_candidate",
                    expected: Phase::AwaitingMatch,
                    actual: state.phase,
                }
                .into());
            };
            shared
                .machine
                .engine()
                .select_candidate(target, candidates)
                .cloned()
                .ok_or(SessionError::NoObjectFound)?
        };
        self.submit(chosen, MatchPolicy::Permissive).await
    }

    /// Run the detector on `image` and submit what it sees.
    pub async fn capture_and_submit<D>(&mut self, detector: &D, image: &[u8]) -> Result<SubmitOutcome, SessionError>
    where
        D: Detector + ?Sized,
    {
        let candidates = detect(detector, image).await?;
        self.submit_detections(&candidates).await
    }

    /// Announce the last find through `messenger`.
    pub async fn share_score<M>(&self, messenger: &M) -> Result<Delivery, SessionError>
    where
        M: Messenger + ?Sized,
    {
        let message = {
            let shared = self.shared.read().await;
            let last = shared.last_find.as_ref().ok_or(SessionError::NoObjectFound)?;
            let player = shared.machine.state().player(last.seat);
            ShareMessage::score(&player.name, player.score, &last.label)
        };
        Ok(deliver(messenger, &message).await)
    }

    /// End the running round as if the countdown ran out.
    pub async fn timeout(&mut self) -> Result<(), SessionError> {
        self.stop_countdown();
        let mut shared = self.shared.write().await;
        let events = shared.machine.timeout()?;
        shared.record(&events);
        Ok(())
    }

    /// Clear scores, keeping the stored player name.
    pub async fn reset(&mut self) {
        self.stop_countdown();
        let mut shared = self.shared.write().await;
        let name = shared
            .ledger
            .load()
            .name
            .or_else(|| Some(shared.machine.state().player1.name.clone()).filter(|n| !n.is_empty()));
        let events = shared.machine.reset(name);
        shared.record(&events);
        info!("Game reset");
    }

    /// Stop background work. The state stays readable.
    pub fn shutdown(&mut self) {
        self.stop_countdown();
    }

    async fn submit(&mut self, candidate: Candidate, policy: MatchPolicy) -> Result<SubmitOutcome, SessionError> {
        let outcome = {
            let mut shared = self.shared.write().await;
            let events = shared.machine.dispatch(Action::SubmitCandidate { candidate, policy })?;
            shared.record(&events);
            SubmitOutcome::from_events(&events)
        };
        if outcome.is_match() {
            self.stop_countdown();
        }
        Ok(outcome)
    }

    fn stop_countdown(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    async fn start_countdown(&mut self) {
        self.stop_countdown();
        let round = self.shared.read().await.round;
        let shared = Arc::clone(&self.shared);
        self.timer = Some(RoundTimer::spawn(TICK_PERIOD, move || {
            let shared = Arc::clone(&shared);
            async move { countdown_tick(&shared, round).await }
        }));
    }
}

async fn countdown_tick<S: KeyValueStore>(shared: &RwLock<Shared<S>>, round: u64) -> ControlFlow<()> {
    let mut shared = shared.write().await;
    if shared.round != round || shared.machine.state().phase != Phase::AwaitingMatch {
        return ControlFlow::Break(());
    }
    match shared.machine.dispatch(Action::Tick) {
        Ok(events) => {
            shared.record(&events);
            if events.iter().any(GameEvent::ends_round) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }
        Err(e) => {
            warn!("Countdown stopped: {}", e);
            ControlFlow::Break(())
        }
    }
}

async fn detect<D>(detector: &D, image: &[u8]) -> Result<Vec<Candidate>, SessionError>
where
    D: Detector + ?Sized,
{
    match detector.detect(image).await {
        Ok(candidates) if !candidates.is_empty() => Ok(candidates),
        Ok(_) => Err(SessionError::NoObjectFound),
        Err(e) => {
            warn!("Detector failed: {}", e);
            Err(SessionError::NoObjectFound)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
