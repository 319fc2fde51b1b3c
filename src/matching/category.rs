//! Category Registry
//!
//! Static grouping of related object labels. Two labels that share a
//! category are treated as a near miss by the match engine.

use std::collections::{BTreeMap, BTreeSet};

/// Built-in categories, keyed by category name.
///
/// Labels follow the vocabulary of common object-detection models.
const BUILTIN_CATEGORIES: &[(&str, &[&str])] = &[
    ("person", &["person", "man", "woman", "child", "boy", "girl"]),
    ("vehicle", &["car", "truck", "bus", "motorcycle", "bicycle", "train", "boat", "airplane"]),
    ("container", &["bottle", "cup", "bowl", "glass", "wine glass", "vase", "mug"]),
    ("furniture", &["chair", "table", "dining table", "sofa", "couch", "bed", "bench"]),
    ("food", &["apple", "banana", "sandwich", "pizza", "orange", "carrot", "broccoli", "donut", "cake", "hot dog"]),
    ("animal", &["dog", "cat", "bird", "horse", "sheep", "cow"]),
    ("electronics", &["phone", "cell phone", "laptop", "tv", "keyboard", "mouse", "remote"]),
    ("reading", &["book", "magazine", "newspaper", "notebook"]),
];

/// Normalize a label for comparison: trimmed and lowercase.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Registry of label categories.
///
/// Uses BTreeMap/BTreeSet so iteration (and therefore debug output and
/// lookups across several categories) is ordered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryRegistry {
    categories: BTreeMap<String, BTreeSet<String>>,
}

impl CategoryRegistry {
    /// Registry with no categories.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding the built-in categories.
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN_CATEGORIES
            .iter()
            .fold(Self::empty(), |registry, (name, members)| {
                registry.with_category(name, members.iter().copied())
            })
    }

    /// Add members to a category, creating it if needed.
    #[must_use]
    pub fn with_category<I, L>(mut self, name: &str, members: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let entry = self.categories.entry(normalize_label(name)).or_default();
        entry.extend(
            members
                .into_iter()
                .map(|m| normalize_label(m.as_ref()))
                .filter(|m| !m.is_empty()),
        );
        self
    }

    /// Names of every category containing `label`.
    pub fn categories_of<'a>(&'a self, label: &str) -> impl Iterator<Item = &'a str> + 'a {
        let label = normalize_label(label);
        self.categories
            .iter()
            .filter(move |(_, members)| members.contains(&label))
            .map(|(name, _)| name.as_str())
    }

    /// Whether both labels belong to at least one common category.
    ///
    /// Symmetric in its arguments.
    pub fn share_category(&self, a: &str, b: &str) -> bool {
        let a = normalize_label(a);
        let b = normalize_label(b);
        self.categories
            .values()
            .any(|members| members.contains(&a) && members.contains(&b))
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the registry has no categories.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
