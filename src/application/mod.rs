//! Application services: content, assets, and the public read model.

pub mod assets;
pub mod catalog;
pub mod content;
pub mod error;
pub mod fixture;
pub mod markdown;
pub mod migrate;
pub mod stores;
