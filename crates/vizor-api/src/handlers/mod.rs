//! HTTP handlers for vizor-api.

pub mod detect;
pub mod health;
pub mod images;
pub mod video;
