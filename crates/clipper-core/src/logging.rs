//! Structured logging schema and field name constants for clipper.
//!
//! All crates use these constants for consistent structured logging fields.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, a write was lost or a clip stays pending |
//! | WARN  | Recoverable issue, automatic fallback or retry applied |
//! | INFO  | Lifecycle events (startup, shutdown), capture completions |
//! | DEBUG | Decision points, tier selection, rebuild coalescing |
//! | TRACE | Per-item iteration (menu entries, tags) |

use tracing_subscriber::EnvFilter;

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "store", "inference", "capture", "menu", "service"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "mutator", "resolver", "openai", "audit"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "mutate", "resolve", "capture", "rebuild"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Clip id being operated on.
pub const CLIP_ID: &str = "clip_id";

/// Project id being operated on.
pub const PROJECT_ID: &str = "project_id";

/// Storage key being read or written.
pub const STORE_KEY: &str = "key";

/// Annotation source chosen by the resolver.
pub const AI_SOURCE: &str = "ai_source";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Read-modify-write attempt number (1-based).
pub const ATTEMPT: &str = "attempt";

/// Number of trigger-surface entries created by a rebuild.
pub const ENTRY_COUNT: &str = "entry_count";

/// Character length of text sent to or received from a model.
pub const INPUT_LEN: &str = "input_len";

/// Default filter directive when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Install the global fmt subscriber with an `EnvFilter` from `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
