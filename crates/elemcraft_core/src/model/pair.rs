//! Pair canonicalization.
//!
//! # Responsibility
//! - Map two element labels to one stable, order-independent key.
//!
//! # Invariants
//! - `canonicalize(a, b) == canonicalize(b, a)` for every input.
//! - Canonicalization is total: it never fails, empty labels included.
//! - `word1 <= word2` after normalization.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Order-independent key of two combined labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalPair {
    word1: String,
    word2: String,
}

impl CanonicalPair {
    /// First label in canonical order.
    pub fn word1(&self) -> &str {
        &self.word1
    }

    /// Second label in canonical order.
    pub fn word2(&self) -> &str {
        &self.word2
    }

    /// Returns whether both sides carry the same label.
    pub fn is_self_pair(&self) -> bool {
        self.word1 == self.word2
    }

    pub fn into_words(self) -> (String, String) {
        (self.word1, self.word2)
    }
}

impl Display for CanonicalPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.word1, self.word2)
    }
}

/// Normalizes one label to its identity form: trimmed and lowercase.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Builds the canonical pair for two labels regardless of argument order.
pub fn canonicalize(label1: &str, label2: &str) -> CanonicalPair {
    let first = normalize_label(label1);
    let second = normalize_label(label2);
    if first <= second {
        CanonicalPair {
            word1: first,
            word2: second,
        }
    } else {
        CanonicalPair {
            word1: second,
            word2: first,
        }
    }
}
