//! Generative collaborator contract.
//!
//! # Responsibility
//! - Define the capability that proposes a new element for a pair.
//! - Own the fixed instruction template sent with every request.
//! - Parse untrusted generator output into an emoji and a label.
//!
//! # Invariants
//! - The generator is never trusted: every response goes through `parse`.
//! - Generation never touches the pair store.

mod parse;

pub use parse::{parse_generation, GeneratedElement, ParseError};

use crate::model::pair::CanonicalPair;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;

/// Instruction sent as the system message of every combination request.
pub const COMBINATION_INSTRUCTIONS: &str = "You are an inventive designer for a crafting game \
in which players combine two elements (such as water, fire, wind or earth) into a new one. \
Given two elements, name one common, concrete thing that clearly carries the traits of both. \
Keep the name short: at most a few words. \
Answer in the same language as the two input words. \
ONLY answer in the following format:\n\
[emoji that best represents the text],[text]";

/// One request to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinationPrompt {
    /// Fixed instruction template.
    pub system: &'static str,
    /// Pair-specific user message.
    pub user: String,
    pub pair: CanonicalPair,
}

impl CombinationPrompt {
    /// Builds the request for one canonical pair.
    pub fn for_pair(pair: &CanonicalPair) -> Self {
        Self {
            system: COMBINATION_INSTRUCTIONS,
            user: format!("\"{}\" and \"{}\" =", pair.word1(), pair.word2()),
            pair: pair.clone(),
        }
    }
}

/// Failure reported by a generator implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Backend could not be reached or refused the request.
    Unavailable(String),
    /// Backend answered without any content.
    EmptyResponse,
}

impl Display for GenerationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "generator unavailable: {message}"),
            Self::EmptyResponse => write!(f, "generator returned no content"),
        }
    }
}

impl Error for GenerationError {}

/// Capability that proposes `"<emoji>,<label>"` text for a combination.
///
/// Implementations wrap a text-generation backend; tests use deterministic
/// fakes.
pub trait ElementGenerator: Send + Sync {
    fn generate(
        &self,
        prompt: &CombinationPrompt,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}
