//! # clipper-jobs
//!
//! Capture pipeline and background service for the clipper.
//!
//! This crate provides:
//! - The capture executor (selection → pending clip → annotation write-back)
//! - The menu synchronizer (single-flight, coalescing trigger-surface rebuilds)
//! - An HTTP audit mirror for new clips
//! - The reactive service loop tying store changes, menu clicks and UI
//!   requests together
//! - In-process fakes for the browsing context, menu surface and audit sink
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use clipper_jobs::{logging, ClipperService, SaveSelectionRequest, ServiceConfig};
//!
//! logging::init_tracing();
//! let service = ClipperService::from_config(&ServiceConfig::load(), browser, surface).await?;
//!
//! // Start service and get handle
//! let handle = service.start();
//!
//! // Listen for events
//! let mut events = handle.events();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//! });
//!
//! handle.menu_clicked("save_quick", None).await?;
//! let outcome = handle.save_selection(SaveSelectionRequest::default()).await?;
//!
//! // Graceful shutdown
//! handle.shutdown().await?;
//! ```

pub mod audit;
pub mod capture;
pub mod menu;
pub mod service;
pub mod testing;

// Re-export core types
pub use clipper_core::*;

pub use audit::HttpAuditSink;
pub use capture::{is_capturable, CaptureExecutor, CaptureOutcome, RejectReason};
pub use menu::{MenuAction, MenuBuildReport, MenuSynchronizer, RebuildOutcome, SyncState};
pub use service::{
    ClipperService, SaveSelectionRequest, ServiceCommand, ServiceEvent, ServiceHandle,
};
