//! Local Persistence
//!
//! - `backend`: string key-value stores (memory, files)
//! - `ledger`: player name and score records

pub mod backend;
pub mod ledger;

pub use backend::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use ledger::{LedgerSnapshot, ScoreLedger, GAME_DATA_KEY, PLAYER_NAME_KEY};
