//! Core logic for Elemcraft, an element crafting game.
//!
//! Players drop discovered elements on a canvas and drag them onto each
//! other; overlapping pairs are resolved into a new element, generated once
//! per unordered pair and memoized in a SQLite pair store.

pub mod catalog;
pub mod config;
pub mod db;
pub mod generator;
pub mod geometry;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use catalog::{
    starter_elements, CatalogError, CatalogStore, InMemoryCatalogStore, JsonFileCatalogStore,
};
pub use config::{ConfigError, CraftConfig, ResolverSettings};
pub use generator::{
    parse_generation, CombinationPrompt, ElementGenerator, GeneratedElement, GenerationError,
    ParseError, COMBINATION_INSTRUCTIONS,
};
pub use geometry::{footprint, overlaps, Point, Rect, CHAR_WIDTH, ELEMENT_HEIGHT};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::element::{
    Element, PairRecord, PairRecordValidationError, PlacedElement, PlacementId,
};
pub use model::pair::{canonicalize, normalize_label, CanonicalPair};
pub use repo::pair_repo::{
    InsertOutcome, PairRepository, RepoError, RepoResult, SqlitePairRepository,
};
pub use service::placement::{
    CombinationEvent, CombinationId, MoveOutcome, PlacementController, PlacementError,
    PlacementRole, PlacementState,
};
pub use service::resolver::{
    CombinationResolver, GenerationUnavailable, InvalidLabel, Resolution, ResolutionSource,
    ResolveError,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
