//! Object Matching
//!
//! Fuzzy comparison of detected labels against the active target.
//! Pure and synchronous; no logging.
//!
//! - `category`: static label→category groupings
//! - `engine`: similarity scoring and match thresholds

pub mod category;
pub mod engine;

pub use category::{normalize_label, CategoryRegistry};
pub use engine::{
    MatchEngine, MatchKind, MatchPolicy, Verdict,
    MIN_CONFIDENCE, STRICT_MATCH_THRESHOLD, PERMISSIVE_MATCH_THRESHOLD,
};
