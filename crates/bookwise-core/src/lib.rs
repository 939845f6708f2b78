//! Bookwise Core — configuration and error types shared across crates.

pub mod config;
pub mod error;

pub use config::{AppConfig, ChunkingConfig};
pub use error::{Error, Result};
