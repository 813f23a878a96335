//! # vizor-core
//!
//! Core types, traits, and abstractions for vizor.
//!
//! This crate provides the canonical detection record shared by every
//! provider adapter, the persisted image record searched by tag, and the
//! trait seams (document store, detection provider, video labeler) that
//! the other vizor crates implement.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
