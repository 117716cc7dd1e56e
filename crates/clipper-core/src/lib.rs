//! # clipper-core
//!
//! Core types, traits, and abstractions for the clipper background service.
//!
//! This crate provides the data model (clips, projects, annotations), the
//! shared error type, and the trait definitions for every external
//! collaborator (storage, browsing context, summarization, audit mirror,
//! identity, trigger surface) that the other clipper crates depend on.

pub mod config;
pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod tags;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use events::{ChangeBus, StoreChange};
pub use models::*;
pub use tags::{normalize_tag, normalize_tags, pad_with_fillers};
pub use traits::*;
