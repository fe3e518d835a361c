//! Domain layer types and invariants.

pub mod assets;
pub mod categories;
pub mod error;
pub mod keys;
pub mod posts;
pub mod slug;
