//! Challenge Codec
//!
//! Wire format for handing a challenge from one device to the other.
//! A challenge is serialized as a compact JSON object and percent-encoded
//! so it survives being embedded in a URL and pasted into a messaging app:
//!
//! ```text
//! { "obj": "bottle", "p1": "Alice", "p1s": 0, "p2s": 0, "t": 1700000000000 }
//! ```
//!
//! Decoding is total: anything unusable yields `None`, and missing fields
//! fall back to defaults.

use chrono::{DateTime, TimeZone, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game::state::GameState;

/// Query parameter carrying the token.
pub const GAME_PARAM: &str = "game";

/// Originator name used when a token does not carry one.
pub const UNKNOWN_ORIGINATOR: &str = "unknown";

/// Characters left unescaped, matching JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

// =============================================================================
// CHALLENGE
// =============================================================================

/// Snapshot of a challenge as it travels between devices.
///
/// Player 1 is always the originator of the challenge; player 2 is the
/// player who has to find the object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Label of the object to find.
    pub target_label: String,
    /// Name of the player who sent the challenge.
    pub originator_name: String,
    /// Originator's score.
    pub player1_score: u32,
    /// Finder's score.
    pub player2_score: u32,
    /// Creation time (epoch milliseconds). Informational only.
    pub created_at: i64,
}

impl Challenge {
    /// Create a challenge.
    pub fn new(
        target_label: impl Into<String>,
        originator_name: impl Into<String>,
        player1_score: u32,
        player2_score: u32,
        created_at: i64,
    ) -> Self {
        Self {
            target_label: target_label.into(),
            originator_name: originator_name.into(),
            player1_score,
            player2_score,
            created_at,
        }
    }

    /// Build the challenge for the round running in `state`.
    ///
    /// Returns `None` unless a target is out.
    pub fn from_state(state: &GameState, created_at: i64) -> Option<Self> {
        let target = state.target.as_ref()?;
        let originator = state.originator()?;
        let finder = state.finder()?;
        Some(Self::new(
            target.label.clone(),
            originator.name.clone(),
            originator.score,
            finder.score,
            created_at,
        ))
    }

    /// Creation time for display, if representable.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.created_at).single()
    }

    /// Serialize to the compact wire JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&WireChallenge::from(self))
    }

    /// Parse wire JSON leniently. See [`decode`].
    pub fn from_json(json: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(json).ok()?;
        let object = value.as_object()?;

        let target_label = object.get("obj")?.as_str()?.trim();
        if target_label.is_empty() {
            return None;
        }

        let originator_name = object
            .get("p1")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_ORIGINATOR);

        Some(Self::new(
            target_label,
            originator_name,
            score_field(object.get("p1s")),
            score_field(object.get("p2s")),
            object.get("t").and_then(Value::as_i64).unwrap_or(0),
        ))
    }
}

fn score_field(value: Option<&Value>) -> u32 {
    value
        .and_then(Value::as_u64)
        .map(|score| u32::try_from(score).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Field layout on the wire. Short keys keep links short.
#[derive(Serialize)]
struct WireChallenge<'a> {
    obj: &'a str,
    p1: &'a str,
    p1s: u32,
    p2s: u32,
    t: i64,
}

impl<'a> From<&'a Challenge> for WireChallenge<'a> {
    fn from(challenge: &'a Challenge) -> Self {
        Self {
            obj: &challenge.target_label,
            p1: &challenge.originator_name,
            p1s: challenge.player1_score,
            p2s: challenge.player2_score,
            t: challenge.created_at,
        }
    }
}

// =============================================================================
// ENCODE / DECODE
// =============================================================================

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// There is no running challenge to encode.
    #[error("no active target to encode")]
    NoActiveTarget,

    /// JSON serialization failed.
    #[error("failed to serialize challenge: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode the running challenge, stamped with the current time.
pub fn encode(state: &GameState) -> Result<String, CodecError> {
    encode_at(state, Utc::now().timestamp_millis())
}

/// Encode the running challenge with an explicit timestamp.
pub fn encode_at(state: &GameState, created_at: i64) -> Result<String, CodecError> {
    let challenge = Challenge::from_state(state, created_at).ok_or(CodecError::NoActiveTarget)?;
    encode_challenge(&challenge)
}

/// Encode a challenge into a URL-safe token.
pub fn encode_challenge(challenge: &Challenge) -> Result<String, CodecError> {
    let json = challenge.to_json()?;
    Ok(utf8_percent_encode(&json, COMPONENT).to_string())
}

/// Decode a challenge from a link or a bare token.
///
/// Looks for `game=` in the query string first, then in a query embedded
/// after the fragment (`#/?game=`). Input without any `game=` parameter is
/// tried as a bare token. Never fails: unusable input yields `None`.
pub fn decode(url_or_token: &str) -> Option<Challenge> {
    let input = url_or_token.trim();
    let (before_fragment, fragment) = match input.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (input, None),
    };

    let raw = query_of(before_fragment)
        .and_then(find_game_param)
        .or_else(|| fragment.and_then(query_of).and_then(find_game_param));

    match raw {
        Some(raw) => decode_token(raw),
        None if !input.contains('?') && !input.contains('#') => decode_token(input),
        None => None,
    }
}

/// Decode a bare percent-encoded token.
pub fn decode_token(token: &str) -> Option<Challenge> {
    let mut text = percent_decode_str(token).decode_utf8().ok()?.into_owned();
    // Tokens re-encoded by a host shell arrive double-escaped.
    if text.starts_with('%') {
        text = percent_decode_str(&text).decode_utf8().ok()?.into_owned();
    }
    Challenge::from_json(&text)
}

fn query_of(part: &str) -> Option<&str> {
    part.split_once('?').map(|(_, query)| query)
}

fn find_game_param(query: &str) -> Option<&str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == GAME_PARAM)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::action::Action;
    use crate::game::config::GameConfig;
    use crate::game::state::{Phase, Player, Target};
    use crate::game::transition::{apply, GameError};
    use crate::matching::MatchEngine;
    use proptest::prelude::*;

    fn awaiting_state(label: &str, originator: Player, finder: Player, finder_is_one: bool) -> GameState {
        let (player1, player2) = if finder_is_one {
            (finder, originator)
        } else {
            (originator, finder)
        };
        GameState {
            phase: Phase::AwaitingMatch,
            player1,
            player2,
            active_player_is_one: finder_is_one,
            target: Some(Target::new(label, 0.9)),
            remaining_seconds: 120,
            winner: None,
        }
    }

    #[test]
    fn test_encode_wire_shape() {
        let state = awaiting_state("bottle", Player::new("Alice", 2), Player::new("Bob", 1), false);
        let token = encode_at(&state, 1_700_000_000_000).unwrap();
        let json = percent_decode_str(&token).decode_utf8().unwrap();
        assert_eq!(json, r#"{"obj":"bottle","p1":"Alice","p1s":2,"p2s":1,"t":1700000000000}"#);
        assert!(!token.contains('{'));
        assert!(!token.contains('"'));
    }

    #[test]
    fn test_encode_is_stable() {
        let state = awaiting_state("cup", Player::new("Alice", 0), Player::new("Bob", 0), false);
        assert_eq!(encode_at(&state, 42).unwrap(), encode_at(&state, 42).unwrap());
    }

    #[test]
    fn test_encode_without_target_fails() {
        let state = GameState::with_player_name("Alice");
        assert!(matches!(encode(&state), Err(CodecError::NoActiveTarget)));
    }

    #[test]
    fn test_originator_is_player1_on_wire() {
        // Second round on the joiner's device: Bob (seat two) challenges Alice (seat one).
        let state = awaiting_state("car", Player::new("Bob", 1), Player::new("Alice", 0), true);
        let challenge = decode(&encode_at(&state, 0).unwrap()).unwrap();
        assert_eq!(challenge.originator_name, "Bob");
        assert_eq!(challenge.player1_score, 1);
        assert_eq!(challenge.player2_score, 0);
    }

    #[test]
    fn test_decode_query_and_fragment() {
        let state = awaiting_state("bottle", Player::new("Alice", 0), Player::new("Bob", 0), false);
        let token = encode_at(&state, 5).unwrap();

        let query = decode(&format!("https://hitta.app/play?ref=sms&game={token}")).unwrap();
        let fragment = decode(&format!("https://hitta.app/#/?game={token}")).unwrap();
        let both = decode(&format!("https://hitta.app/?x=1#/waiting?game={token}")).unwrap();
        let bare = decode(&token).unwrap();

        for challenge in [query, fragment, both, bare] {
            assert_eq!(challenge.target_label, "bottle");
            assert_eq!(challenge.originator_name, "Alice");
            assert_eq!(challenge.created_at, 5);
        }
    }

    #[test]
    fn test_decode_missing_param() {
        assert!(decode("https://hitta.app/").is_none());
        assert!(decode("https://hitta.app/?ref=sms").is_none());
        assert!(decode("https://hitta.app/#/?other=1").is_none());
        assert!(decode("https://hitta.app/?game=").is_none());
        assert!(decode("").is_none());
    }

    #[test]
    fn test_decode_malformed() {
        assert!(decode("https://hitta.app/?game=%7Bnot-json").is_none());
        assert!(decode("https://hitta.app/?game=%5B1%2C2%5D").is_none());
        assert!(decode("https://hitta.app/?game=%FF%FE").is_none());
        assert!(decode("?game=%7B%22obj%22%3A%22%22%7D").is_none());
        assert!(decode("?game=%7B%22obj%22%3A7%7D").is_none());
    }

    #[test]
    fn test_decode_defaults_missing_fields() {
        let challenge = decode("https://hitta.app/?game=%7B%22obj%22%3A%22car%22%7D").unwrap();
        assert_eq!(challenge, Challenge::new("car", UNKNOWN_ORIGINATOR, 0, 0, 0));
    }

    #[test]
    fn test_decode_lenient_field_types() {
        let json = r#"{"obj":"car","p1":42,"p1s":-3,"p2s":"two","t":"now"}"#;
        let challenge = Challenge::from_json(json).unwrap();
        assert_eq!(challenge, Challenge::new("car", UNKNOWN_ORIGINATOR, 0, 0, 0));
    }

    #[test]
    fn test_decode_double_encoded() {
        let state = awaiting_state("cup", Player::new("Alice", 3), Player::new("Bob", 2), false);
        let once = encode_at(&state, 0).unwrap();
        let twice = utf8_percent_encode(&once, COMPONENT).to_string();
        let challenge = decode(&format!("https://hitta.app/?game={twice}")).unwrap();
        assert_eq!(challenge.player1_score, 3);
    }

    #[test]
    fn test_created_at_display() {
        let challenge = Challenge::new("car", "Alice", 0, 0, 1_700_000_000_000);
        let when = challenge.created_at_utc().unwrap();
        assert_eq!(when.timestamp(), 1_700_000_000);
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            label in "\\PC{0,24}",
            originator in "\\PC{0,16}",
            finder in "\\PC{0,16}",
            originator_score in 0u32..5,
            finder_score in 0u32..5,
            finder_is_one in any::<bool>(),
            created_at in 0i64..4_000_000_000_000,
        ) {
            let (player1, player2) = if finder_is_one {
                (Player::new(finder, finder_score), Player::new(originator.clone(), originator_score))
            } else {
                (Player::new(originator.clone(), originator_score), Player::new(finder, finder_score))
            };
            let idle = GameState {
                player1,
                player2,
                active_player_is_one: !finder_is_one,
                ..GameState::default()
            };
            let begun = apply(
                &idle,
                Action::BeginChallenge { target: Target::new(label.clone(), 0.9) },
                &GameConfig::default(),
                &MatchEngine::default(),
            );

            match begun {
                Err(GameError::EmptyTargetLabel) => prop_assert!(label.trim().is_empty()),
                Err(GameError::EmptyPlayerName) => prop_assert!(originator.trim().is_empty()),
                Err(other) => prop_assert!(false, "unexpected error {other}"),
                Ok(step) => {
                    let state = step.state;
                    let token = encode_at(&state, created_at).unwrap();
                    let decoded = decode(&format!("https://hitta.app/?game={token}")).unwrap();

                    prop_assert_eq!(&decoded.target_label, &state.target.as_ref().unwrap().label);
                    prop_assert_eq!(&decoded.originator_name, &state.originator().unwrap().name);
                    prop_assert_eq!(decoded.target_label.as_str(), label.trim());
                    prop_assert_eq!(decoded.originator_name.as_str(), originator.trim());
                    prop_assert_eq!(decoded.player1_score, originator_score);
                    prop_assert_eq!(decoded.player2_score, finder_score);
                    prop_assert_eq!(decoded.created_at, created_at);
                }
            }
        }

        #[test]
        fn prop_decode_never_panics(input in "\\PC{0,64}") {
            let _ = decode(&input);
        }
    }
}
