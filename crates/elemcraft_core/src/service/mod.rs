//! Core use-case services.
//!
//! # Responsibility
//! - Resolve combinations against the pair store and the generator.
//! - Drive the canvas: overlap detection, combination start and completion.
//!
//! # Invariants
//! - Services stay storage-agnostic; persistence goes through repository
//!   and catalog traits.

pub mod placement;
pub mod resolver;
