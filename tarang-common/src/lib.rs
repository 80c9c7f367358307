//! # Tarang Common Library
//!
//! Shared code for the tarang client front-ends including:
//! - Error types
//! - Configuration loading
//! - Event types (ClientEvent enum) and the EventBus
//! - Canonical asset identifier normalization
//! - Time and freshness-token utilities

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod time;

pub use error::{Error, Result};
pub use ids::AssetId;
