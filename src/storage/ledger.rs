//! Score Ledger
//!
//! Persists the local player's name and both players' records across
//! sessions. Persistence is advisory: a missing or corrupt record starts a
//! fresh game and a failed write is logged and dropped. Nothing here can
//! fail the game.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::game::state::{GameState, Player};
use crate::storage::backend::{KeyValueStore, StorageError};

/// Key holding the raw local player name.
pub const PLAYER_NAME_KEY: &str = "playerName";

/// Key holding the JSON player records.
pub const GAME_DATA_KEY: &str = "gameData";

/// Stored player record. Every field is optional so partial records load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct StoredPlayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    score: Option<u32>,
}

impl StoredPlayer {
    fn into_player(self) -> Option<Player> {
        if self.name.is_none() && self.score.is_none() {
            return None;
        }
        Some(Player::new(self.name.unwrap_or_default(), self.score.unwrap_or(0)))
    }
}

impl From<&Player> for StoredPlayer {
    fn from(player: &Player) -> Self {
        Self {
            name: Some(player.name.clone()),
            score: Some(player.score),
        }
    }
}

/// The `gameData` record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct GameData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    player1: Option<StoredPlayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    player2: Option<StoredPlayer>,

    // Single-player shape written by early builds.
    #[serde(default, rename = "currentPlayer", skip_serializing)]
    current_player: Option<String>,
    #[serde(default, skip_serializing)]
    score: Option<u32>,
}

impl GameData {
    fn into_players(self) -> (Option<Player>, Option<Player>) {
        let mut player1 = self.player1.and_then(StoredPlayer::into_player);
        if player1.is_none() && (self.current_player.is_some() || self.score.is_some()) {
            player1 = Some(Player::new(
                self.current_player.unwrap_or_default(),
                self.score.unwrap_or(0),
            ));
        }
        (player1, self.player2.and_then(StoredPlayer::into_player))
    }
}

/// What a session resumes from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// Local player name
    pub name: Option<String>,
    /// Stored first seat
    pub player1: Option<Player>,
    /// Stored second seat
    pub player2: Option<Player>,
}

/// Name and score persistence over a key-value store.
#[derive(Debug)]
pub struct ScoreLedger<S> {
    store: S,
}

impl<S: KeyValueStore> ScoreLedger<S> {
    /// Wrap a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load what is stored. Unreadable records are treated as absent.
    pub fn load(&self) -> LedgerSnapshot {
        let name = match self.store.get(PLAYER_NAME_KEY) {
            Ok(name) => name.filter(|n| !n.trim().is_empty()),
            Err(e) => {
                warn!("Could not read player name: {}", e);
                None
            }
        };

        let (player1, player2) = match self.read_game_data() {
            Ok(Some(data)) => data.into_players(),
            Ok(None) => (None, None),
            Err(e) => {
                warn!("Discarding unreadable game data: {}", e);
                (None, None)
            }
        };

        LedgerSnapshot { name, player1, player2 }
    }

    fn read_game_data(&self) -> Result<Option<GameData>, StorageError> {
        match self.store.get(GAME_DATA_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Persist both players of `state`.
    pub fn save(&self, state: &GameState) {
        let data = GameData {
            player1: Some(StoredPlayer::from(&state.player1)),
            player2: Some(StoredPlayer::from(&state.player2)),
            ..GameData::default()
        };
        let result = serde_json::to_string(&data)
            .map_err(StorageError::from)
            .and_then(|json| self.store.set(GAME_DATA_KEY, &json));
        match result {
            Ok(()) => debug!(
                "Saved scores {}={} {}={}",
                state.player1.name, state.player1.score, state.player2.name, state.player2.score
            ),
            Err(e) => warn!("Could not save game data: {}", e),
        }
    }

    /// Persist the local player name.
    pub fn save_name(&self, name: &str) {
        if let Err(e) = self.store.set(PLAYER_NAME_KEY, name) {
            warn!("Could not save player name: {}", e);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::{FileStore, MemoryStore};

    #[test]
    fn test_empty_store_loads_nothing() {
        let ledger = ScoreLedger::new(MemoryStore::new());
        assert_eq!(ledger.load(), LedgerSnapshot::default());
    }

    #[test]
    fn test_save_and_load() {
        let ledger = ScoreLedger::new(MemoryStore::new());
        let mut state = GameState::with_player_name("Alice");
        state.player1.score = 2;
        state.player2 = Player::new("Bob", 3);

        ledger.save_name("Alice");
        ledger.save(&state);

        let snapshot = ledger.load();
        assert_eq!(snapshot.name.as_deref(), Some("Alice"));
        assert_eq!(snapshot.player1, Some(Player::new("Alice", 2)));
        assert_eq!(snapshot.player2, Some(Player::new("Bob", 3)));
    }

    #[test]
    fn test_stored_shape() {
        let ledger = ScoreLedger::new(MemoryStore::new());
        let mut state = GameState::with_player_name("Alice");
        state.player2 = Player::new("Bob", 1);
        ledger.save(&state);

        let raw = ledger.store().get(GAME_DATA_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["player1"]["name"], "Alice");
        assert_eq!(value["player2"]["score"], 1);
        assert!(value.get("currentPlayer").is_none());
    }

    #[test]
    fn test_legacy_record() {
        let store = MemoryStore::new();
        store.set(GAME_DATA_KEY, r#"{"currentPlayer":"Alice","score":4}"#).unwrap();
        let snapshot = ScoreLedger::new(store).load();
        assert_eq!(snapshot.player1, Some(Player::new("Alice", 4)));
        assert_eq!(snapshot.player2, None);
    }

    #[test]
    fn test_partial_record() {
        let store = MemoryStore::new();
        store.set(GAME_DATA_KEY, r#"{"player1":{"name":"Alice"},"player2":{}}"#).unwrap();
        let snapshot = ScoreLedger::new(store).load();
        assert_eq!(snapshot.player1, Some(Player::new("Alice", 0)));
        assert_eq!(snapshot.player2, None);
    }

    #[test]
    fn test_corrupt_record_is_ignored() {
        let store = MemoryStore::new();
        store.set(GAME_DATA_KEY, "{not json").unwrap();
        store.set(PLAYER_NAME_KEY, "   ").unwrap();
        assert_eq!(ScoreLedger::new(store).load(), LedgerSnapshot::default());
    }

    #[test]
    fn test_file_backed_ledger_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = GameState::with_player_name("Alice");
        state.player1.score = 1;
        {
            let ledger = ScoreLedger::new(FileStore::new(dir.path()));
            ledger.save_name("Alice");
            ledger.save(&state);
        }
        let snapshot = ScoreLedger::new(FileStore::new(dir.path())).load();
        assert_eq!(snapshot.name.as_deref(), Some("Alice"));
        assert_eq!(snapshot.player1, Some(Player::new("Alice", 1)));
    }
}
