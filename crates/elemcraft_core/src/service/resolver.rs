//! Combination resolution service.
//!
//! # Responsibility
//! - Turn two element labels into one resulting element.
//! - Serve known pairs from the pair store; otherwise generate, validate and
//!   persist a new result.
//!
//! # Invariants
//! - Blank labels are rejected before any I/O.
//! - Only a successful insert writes state; every failure leaves the store
//!   unchanged.
//! - Results whose text already exists elsewhere in the store reuse the
//!   stored emoji.
//! - Racing resolutions of one pair converge on the first committed record.
//! - Pair store calls run on tokio's blocking pool, never on a runtime worker.

use crate::config::ResolverSettings;
use crate::generator::{
    parse_generation, CombinationPrompt, ElementGenerator, GenerationError, ParseError,
};
use crate::model::element::{Element, PairRecord, PairRecordValidationError};
use crate::model::pair::{canonicalize, CanonicalPair};
use crate::repo::pair_repo::{InsertOutcome, PairRepository, RepoError, RepoResult};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Which input labels were rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidLabel {
    First,
    Second,
    Both,
}

/// Errors from one resolution attempt. None of them is fatal; the caller may
/// retry the same combination later.
#[derive(Debug)]
pub enum ResolveError {
    /// One or both labels are blank.
    InvalidInput(InvalidLabel),
    /// Generator failed or did not answer within the timeout.
    GenerationUnavailable(GenerationUnavailable),
    /// Generator answered with text that is not `"<emoji>,<label>"`.
    MalformedGeneration(ParseError),
    /// The pair store could not be read or written.
    Persistence(RepoError),
    /// The resolution task panicked or was cancelled before answering.
    Interrupted(String),
}

/// Cause of a `GenerationUnavailable` failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationUnavailable {
    Failed(GenerationError),
    TimedOut(Duration),
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(which) => {
                write!(f, "invalid combination input: {which:?} label blank")
            }
            Self::GenerationUnavailable(GenerationUnavailable::Failed(err)) => write!(f, "{err}"),
            Self::GenerationUnavailable(GenerationUnavailable::TimedOut(limit)) => write!(
                f,
                "generator did not answer within {} ms",
                limit.as_millis()
            ),
            Self::MalformedGeneration(err) => write!(f, "malformed generation: {err}"),
            Self::Persistence(err) => write!(f, "pair store failure: {err}"),
            Self::Interrupted(reason) => write!(f, "resolution interrupted: {reason}"),
        }
    }
}

impl Error for ResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(_) => None,
            Self::GenerationUnavailable(GenerationUnavailable::Failed(err)) => Some(err),
            Self::GenerationUnavailable(GenerationUnavailable::TimedOut(_)) => None,
            Self::MalformedGeneration(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::Interrupted(_) => None,
        }
    }
}

impl From<RepoError> for ResolveError {
    fn from(value: RepoError) -> Self {
        Self::Persistence(value)
    }
}

impl From<tokio::task::JoinError> for ResolveError {
    fn from(value: tokio::task::JoinError) -> Self {
        if value.is_panic() {
            Self::Interrupted("task panicked".to_string())
        } else {
            Self::Interrupted("task cancelled".to_string())
        }
    }
}

impl From<ParseError> for ResolveError {
    fn from(value: ParseError) -> Self {
        Self::MalformedGeneration(value)
    }
}

impl ResolveError {
    /// Stable short code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::GenerationUnavailable(GenerationUnavailable::Failed(_)) => "generation_failed",
            Self::GenerationUnavailable(GenerationUnavailable::TimedOut(_)) => {
                "generation_timeout"
            }
            Self::MalformedGeneration(_) => "malformed_generation",
            Self::Persistence(_) => "persistence",
            Self::Interrupted(_) => "resolution_interrupted",
        }
    }
}

/// Where a resolved element came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Pair was already in the store.
    Cached,
    /// This call generated and stored the element.
    Generated,
    /// This call generated an element but a concurrent writer stored first.
    ConcurrentWinner,
}

impl ResolutionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Generated => "generated",
            Self::ConcurrentWinner => "concurrent_winner",
        }
    }
}

/// Successful resolution of one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub element: Element,
    pub pair: CanonicalPair,
    pub source: ResolutionSource,
}

/// Resolves combinations through a pair store and a generator.
pub struct CombinationResolver<R: PairRepository + 'static, G: ElementGenerator> {
    repo: Arc<R>,
    generator: G,
    settings: ResolverSettings,
}

impl<R: PairRepository + 'static, G: ElementGenerator> CombinationResolver<R, G> {
    pub fn new(repo: R, generator: G, settings: ResolverSettings) -> Self {
        Self {
            repo: Arc::new(repo),
            generator,
            settings,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn settings(&self) -> ResolverSettings {
        self.settings
    }

    /// Resolves the unordered pair `{label1, label2}`.
    ///
    /// # Contract
    /// - Known pair: returns the stored element with `discovered = false`.
    /// - New pair: returns the generated element with `discovered = true`
    ///   after exactly one record was stored for the pair.
    pub async fn resolve(&self, label1: &str, label2: &str) -> Result<Resolution, ResolveError> {
        let started_at = Instant::now();
        let result = self.resolve_inner(label1, label2).await;
        match &result {
            Ok(resolution) => info!(
                "event=pair_resolve module=resolver status=ok source={} pair={} duration_ms={}",
                resolution.source.as_str(),
                resolution.pair,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=pair_resolve module=resolver status=error error_code={} duration_ms={} error={}",
                err.code(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    async fn resolve_inner(&self, label1: &str, label2: &str) -> Result<Resolution, ResolveError> {
        validate_labels(label1, label2)?;
        let pair = canonicalize(label1, label2);

        let key = pair.clone();
        if let Some(record) = self.with_store(move |repo| repo.find_by_pair(&key)).await? {
            return Ok(Resolution {
                element: record.element(false),
                pair,
                source: ResolutionSource::Cached,
            });
        }

        let raw = self.generate(&pair).await?;
        let generated = parse_generation(&raw, self.settings.max_label_chars)?;

        let record = PairRecord::new(pair.clone(), generated.emoji, &generated.text)
            .map_err(malformed_from_validation)?;
        let text = record.text.clone();
        let record = match self.with_store(move |repo| repo.find_by_text(&text)).await? {
            Some(existing) => PairRecord {
                emoji: existing.emoji,
                ..record
            },
            None => record,
        };

        let candidate = record.clone();
        match self.with_store(move |repo| repo.insert(&candidate)).await? {
            InsertOutcome::Inserted => Ok(Resolution {
                element: record.element(true),
                pair,
                source: ResolutionSource::Generated,
            }),
            InsertOutcome::AlreadyPresent(winner) => Ok(Resolution {
                element: winner.element(false),
                pair,
                source: ResolutionSource::ConcurrentWinner,
            }),
        }
    }

    /// Runs one blocking store call off the async worker threads.
    async fn with_store<T, F>(&self, op: F) -> Result<T, ResolveError>
    where
        T: Send + 'static,
        F: FnOnce(&R) -> RepoResult<T> + Send + 'static,
    {
        let repo = Arc::clone(&self.repo);
        let result = tokio::task::spawn_blocking(move || op(repo.as_ref())).await?;
        Ok(result?)
    }

    async fn generate(&self, pair: &CanonicalPair) -> Result<String, ResolveError> {
        let prompt = CombinationPrompt::for_pair(pair);
        let limit = self.settings.generation_timeout;
        match tokio::time::timeout(limit, self.generator.generate(&prompt)).await {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(GenerationError::EmptyResponse)) => {
                Err(ResolveError::MalformedGeneration(ParseError::EmptyResponse))
            }
            Ok(Err(err)) => Err(ResolveError::GenerationUnavailable(
                GenerationUnavailable::Failed(err),
            )),
            Err(_elapsed) => Err(ResolveError::GenerationUnavailable(
                GenerationUnavailable::TimedOut(limit),
            )),
        }
    }
}

fn validate_labels(label1: &str, label2: &str) -> Result<(), ResolveError> {
    match (label1.trim().is_empty(), label2.trim().is_empty()) {
        (false, false) => Ok(()),
        (true, false) => Err(ResolveError::InvalidInput(InvalidLabel::First)),
        (false, true) => Err(ResolveError::InvalidInput(InvalidLabel::Second)),
        (true, true) => Err(ResolveError::InvalidInput(InvalidLabel::Both)),
    }
}

fn malformed_from_validation(err: PairRecordValidationError) -> ResolveError {
    match err {
        PairRecordValidationError::EmptyEmoji => ParseError::EmptyEmoji.into(),
        _ => ParseError::EmptyText.into(),
    }
}
