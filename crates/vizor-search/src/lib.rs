//! # vizor-search
//!
//! Tag search over persisted multi-provider comparisons.
//!
//! A search scans every stored image record, scores each image by its best
//! matching detection across all providers, and ranks images by that score.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vizor_db::InMemoryImageRecordRepository;
//! use vizor_search::TagSearchEngine;
//!
//! let engine = TagSearchEngine::new(Arc::new(InMemoryImageRecordRepository::new()));
//! let urls = engine.search_by_tag("cat").await?;
//! ```

pub mod tag_search;

// Re-export core types
pub use vizor_core::*;

pub use tag_search::{rank_by_tag, TagSearchEngine};
