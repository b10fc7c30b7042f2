//! Domain model for discovered elements, canvas placements and pair memos.
//!
//! # Responsibility
//! - Define the records shared by the resolver, the store and the canvas.
//! - Provide the order-independent pair key used for caching.
//!
//! # Invariants
//! - Element identity is the lowercase `text` label.
//! - A `PairRecord` is always keyed by a `CanonicalPair`.

pub mod element;
pub mod pair;
