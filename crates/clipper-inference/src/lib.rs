//! # clipper-inference
//!
//! Annotation resolution for captured clips.
//!
//! This crate provides:
//! - The annotation resolver, an ordered chain of tiers that never fails
//! - A local heuristic summary and keyword generator
//! - Resilient parsing of model replies
//! - An OpenAI-compatible summarization backend
//! - A scripted mock backend for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clipper_core::AnnotationConfig;
//! use clipper_inference::{openai::OpenAISummarizer, AnnotationResolver};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = Arc::new(OpenAISummarizer::from_env().unwrap());
//!     let resolver = AnnotationResolver::new(backend);
//!     let annotation = resolver
//!         .resolve("Rust is fast. It is also safe.", &AnnotationConfig::default())
//!         .await;
//!     println!("{} ({})", annotation.summary, annotation.source);
//! }
//! ```

pub mod heuristic;
pub mod mock;
pub mod openai;
pub mod parse;
pub mod resolver;

pub use openai::{OpenAIConfig, OpenAISummarizer};
pub use parse::parse_annotation;
pub use resolver::{
    AnnotationResolver, AnnotationTier, DisabledTier, EmptyTier, LocalTier, RemoteTier,
};
