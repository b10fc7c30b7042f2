//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the pair-store contract consumed by the resolver.
//! - Isolate SQLite query details from resolution orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `PairRecord::validate()` before persistence.
//! - At most one record exists per canonical pair; concurrent inserts for the
//!   same key converge on the first committed writer.

pub mod pair_repo;
