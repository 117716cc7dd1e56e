//! OpenAI-compatible summarization backend.
//!
//! Works with any endpoint exposing `/chat/completions` with JSON-object
//! replies (OpenAI, Azure OpenAI, vLLM, Ollama in compatibility mode).
//!
//! # Example
//!
//! ```rust,no_run
//! use clipper_core::SummarizationBackend;
//! use clipper_inference::openai::{OpenAIConfig, OpenAISummarizer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let summarizer = OpenAISummarizer::new(OpenAIConfig::from_env()).unwrap();
//!     let annotation = summarizer
//!         .summarize("Rust is a systems language.", "sk-...")
//!         .await
//!         .unwrap();
//!     println!("{} {:?}", annotation.summary, annotation.tags);
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{user_prompt, OpenAIConfig, OpenAISummarizer, SYSTEM_PROMPT};
pub use error::{to_clipper_error, OpenAIErrorCode};
pub use types::*;
