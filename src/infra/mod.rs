//! Infrastructure adapters and runtime bootstrap.

pub mod cloudflare;
pub mod error;
pub mod export;
pub mod filesystem;
pub mod http;
pub mod memory;
pub mod telemetry;
