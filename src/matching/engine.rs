//! Match Engine
//!
//! Decides whether a detected object satisfies the active target.
//! Matching is a heuristic gate: labels are scored for similarity and the
//! score is compared against a policy threshold.

use serde::{Deserialize, Serialize};

use crate::game::state::{Candidate, Target};
use crate::matching::category::{normalize_label, CategoryRegistry};

/// Confidences below this floor are rejected before any label comparison.
pub const MIN_CONFIDENCE: f32 = 0.5;

/// Similarity of two identical labels.
pub const EXACT_SIMILARITY: f32 = 0.95;

/// Similarity of two labels from the same category.
pub const CATEGORY_SIMILARITY: f32 = 0.7;

/// Similarity when one label contains the other.
pub const SUBSTRING_SIMILARITY: f32 = 0.6;

/// Similarity of unrelated labels.
pub const UNRELATED_SIMILARITY: f32 = 0.1;

/// Threshold for the strict policy (exact and category matches pass).
pub const STRICT_MATCH_THRESHOLD: f32 = 0.7;

/// Threshold for the permissive policy (substring matches also pass).
pub const PERMISSIVE_MATCH_THRESHOLD: f32 = 0.6;

/// Which similarity threshold applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Single candidate judged on its own.
    #[default]
    Strict,
    /// Candidate picked out of several detections.
    Permissive,
}

impl MatchPolicy {
    /// Minimum similarity (inclusive) for a match under this policy.
    pub const fn threshold(self) -> f32 {
        match self {
            MatchPolicy::Strict => STRICT_MATCH_THRESHOLD,
            MatchPolicy::Permissive => PERMISSIVE_MATCH_THRESHOLD,
        }
    }
}

/// The rule that produced a similarity score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// No relation found.
    Unrelated,
    /// One label is a substring of the other.
    Substring,
    /// Both labels share a category.
    Category,
    /// Same label.
    Exact,
}

impl MatchKind {
    /// Similarity score for this rule.
    pub const fn similarity(self) -> f32 {
        match self {
            MatchKind::Exact => EXACT_SIMILARITY,
            MatchKind::Category => CATEGORY_SIMILARITY,
            MatchKind::Substring => SUBSTRING_SIMILARITY,
            MatchKind::Unrelated => UNRELATED_SIMILARITY,
        }
    }
}

/// Outcome of comparing a candidate against a target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Rule that fired (`None` when a confidence was below the floor).
    pub kind: Option<MatchKind>,
    /// Similarity score (0 when a confidence was below the floor).
    pub similarity: f32,
    /// Whether the candidate satisfies the target.
    pub matched: bool,
}

impl Verdict {
    fn below_floor() -> Self {
        Self {
            kind: None,
            similarity: 0.0,
            matched: false,
        }
    }
}

/// Label matcher backed by a category registry.
#[derive(Clone, Debug)]
pub struct MatchEngine {
    registry: CategoryRegistry,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(CategoryRegistry::builtin())
    }
}

impl MatchEngine {
    /// Create an engine over the given registry.
    pub fn new(registry: CategoryRegistry) -> Self {
        Self { registry }
    }

    /// The registry used for category matches.
    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    /// Classify how two labels relate. The strongest applicable rule wins.
    pub fn classify(&self, a: &str, b: &str) -> MatchKind {
        let a = normalize_label(a);
        let b = normalize_label(b);

        if a == b {
            MatchKind::Exact
        } else if self.registry.share_category(&a, &b) {
            MatchKind::Category
        } else if !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a)) {
            MatchKind::Substring
        } else {
            MatchKind::Unrelated
        }
    }

    /// Similarity of two labels in `[0, 1]`.
    pub fn similarity(&self, a: &str, b: &str) -> f32 {
        self.classify(a, b).similarity()
    }

    /// Full verdict for a candidate under `policy`.
    pub fn evaluate(&self, target: &Target, detected: &Candidate, policy: MatchPolicy) -> Verdict {
        // Written so a NaN confidence also lands below the floor.
        if !(target.confidence >= MIN_CONFIDENCE && detected.confidence >= MIN_CONFIDENCE) {
            return Verdict::below_floor();
        }

        let kind = self.classify(&target.label, &detected.label);
        let similarity = kind.similarity();
        Verdict {
            kind: Some(kind),
            similarity,
            matched: similarity >= policy.threshold(),
        }
    }

    /// Whether `detected` satisfies `target` under the strict policy.
    pub fn is_match(&self, target: &Target, detected: &Candidate) -> bool {
        self.evaluate(target, detected, MatchPolicy::Strict).matched
    }

    /// Whether `detected` satisfies `target` under `policy`.
    pub fn is_match_with(&self, target: &Target, detected: &Candidate, policy: MatchPolicy) -> bool {
        self.evaluate(target, detected, policy).matched
    }

    /// Pick the candidate most similar to `target`.
    ///
    /// Candidates below the confidence floor are skipped. Ties on similarity
    /// go to the higher confidence, then to the earlier candidate.
    pub fn select_candidate<'a>(&self, target: &Target, candidates: &'a [Candidate]) -> Option<&'a Candidate> {
        let mut best: Option<(&Candidate, f32)> = None;
        for candidate in candidates.iter().filter(|c| c.confidence >= MIN_CONFIDENCE) {
            let similarity = self.similarity(&target.label, &candidate.label);
            let better = match best {
                None => true,
                Some((current, current_similarity)) => {
                    similarity > current_similarity
                        || (similarity == current_similarity && candidate.confidence > current.confidence)
                }
            };
            if better {
                best = Some((candidate, similarity));
            }
        }
        best.map(|(candidate, _)| candidate)
    }
}
