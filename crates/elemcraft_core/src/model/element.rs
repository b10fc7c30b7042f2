//! Element, placement and pair-record models.
//!
//! # Responsibility
//! - Define the catalog entry (`Element`), its canvas instance
//!   (`PlacedElement`) and the persisted combination memo (`PairRecord`).
//! - Validate pair records before they reach storage.
//!
//! # Invariants
//! - `PlacementId` is never nil and never reused for another placement.
//! - `PairRecord.text` is stored lowercase; `emoji` and `text` are non-empty.
//! - `PairRecord` words are always in canonical order.

use crate::model::pair::{normalize_label, CanonicalPair};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// A discovered kind of craftable object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub emoji: String,
    pub text: String,
    /// Set only when this resolution created the element for the first time.
    #[serde(default)]
    pub discovered: bool,
}

impl Element {
    pub fn new(emoji: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            emoji: emoji.into(),
            text: text.into(),
            discovered: false,
        }
    }

    /// Identity key used for catalog membership.
    pub fn identity(&self) -> String {
        normalize_label(&self.text)
    }

    /// Returns whether both elements name the same concept.
    pub fn same_identity(&self, other: &Element) -> bool {
        self.identity() == other.identity()
    }

    /// Label as rendered on the canvas: `"{emoji} {text}"`.
    pub fn display_label(&self) -> String {
        format!("{} {}", self.emoji, self.text)
    }
}

/// Stable identifier of one placement on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementId(Uuid);

impl PlacementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PlacementId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PlacementId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An element instance positioned on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedElement {
    pub id: PlacementId,
    pub emoji: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    /// True while this placement anchors an outstanding combination.
    #[serde(default)]
    pub is_loading: bool,
}

impl PlacedElement {
    /// Places `element` at `(x, y)` with a freshly generated id.
    pub fn new(element: &Element, x: f64, y: f64) -> Self {
        Self {
            id: PlacementId::new(),
            emoji: element.emoji.clone(),
            text: element.text.clone(),
            x,
            y,
            is_loading: false,
        }
    }

    /// Label as rendered on the canvas; also the basis of its footprint.
    pub fn display_label(&self) -> String {
        format!("{} {}", self.emoji, self.text)
    }
}

/// Validation errors for persisted pair records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairRecordValidationError {
    EmptyEmoji,
    EmptyText,
    /// `text` must already be normalized to lowercase.
    TextNotNormalized(String),
    /// `word1`/`word2` are not in canonical order or not normalized.
    NonCanonicalPair { word1: String, word2: String },
}

impl Display for PairRecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEmoji => write!(f, "pair record emoji must not be empty"),
            Self::EmptyText => write!(f, "pair record text must not be empty"),
            Self::TextNotNormalized(text) => {
                write!(f, "pair record text must be normalized lowercase: `{text}`")
            }
            Self::NonCanonicalPair { word1, word2 } => write!(
                f,
                "pair record words are not canonical: `{word1}`, `{word2}`"
            ),
        }
    }
}

impl Error for PairRecordValidationError {}

/// Durable memo of one resolved combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairRecord {
    pub word1: String,
    pub word2: String,
    pub emoji: String,
    pub text: String,
}

impl PairRecord {
    /// Builds a validated record for `pair`; `text` is normalized here.
    pub fn new(
        pair: CanonicalPair,
        emoji: impl Into<String>,
        text: impl AsRef<str>,
    ) -> Result<Self, PairRecordValidationError> {
        let (word1, word2) = pair.into_words();
        let record = Self {
            word1,
            word2,
            emoji: emoji.into().trim().to_string(),
            text: normalize_label(text.as_ref()),
        };
        record.validate()?;
        Ok(record)
    }

    /// Checks the storage invariants of this record.
    pub fn validate(&self) -> Result<(), PairRecordValidationError> {
        if self.emoji.trim().is_empty() {
            return Err(PairRecordValidationError::EmptyEmoji);
        }
        if self.text.trim().is_empty() {
            return Err(PairRecordValidationError::EmptyText);
        }
        if self.text != normalize_label(&self.text) {
            return Err(PairRecordValidationError::TextNotNormalized(
                self.text.clone(),
            ));
        }
        let canonical = crate::model::pair::canonicalize(&self.word1, &self.word2);
        if canonical.word1() != self.word1 || canonical.word2() != self.word2 {
            return Err(PairRecordValidationError::NonCanonicalPair {
                word1: self.word1.clone(),
                word2: self.word2.clone(),
            });
        }
        Ok(())
    }

    /// Element view of the stored result.
    pub fn element(&self, discovered: bool) -> Element {
        Element {
            emoji: self.emoji.clone(),
            text: self.text.clone(),
            discovered,
        }
    }
}
