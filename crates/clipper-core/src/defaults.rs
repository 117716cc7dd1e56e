//! Centralized default constants for the clipper service.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// STORAGE KEYS
// =============================================================================

/// Collection key holding every clip, newest first.
pub const CLIPS_KEY: &str = "clips";

/// Collection key holding every project.
pub const PROJECTS_KEY: &str = "projects";

/// Scalar key holding the signed-in identity (or null).
pub const IDENTITY_KEY: &str = "authUser";

/// Scalar key holding the remote annotation API key.
pub const API_KEY_KEY: &str = "openaiKey";

/// Scalar key toggling the mock tier when the remote tier is unavailable.
pub const USE_MOCK_IF_FAIL_KEY: &str = "useMockIfFail";

/// Scalar key disabling remote annotation entirely.
pub const AI_DISABLED_KEY: &str = "aiDisabled";

/// Prefix of the per-identity default project key (`<prefix><uid|anon>`).
pub const DEFAULT_PROJECT_KEY_PREFIX: &str = "lastActiveProjectId_";

/// Identity segment used in per-identity keys when nobody is signed in.
pub const ANONYMOUS_UID: &str = "anon";

// =============================================================================
// STORE MUTATOR
// =============================================================================

/// Read-modify-write attempts before a mutation fails with
/// `StoreWriteExhausted`.
pub const STORE_WRITE_ATTEMPTS: u32 = 3;

// =============================================================================
// ANNOTATION
// =============================================================================

/// Maximum characters of normalized input sent to the remote endpoint.
pub const ANNOTATION_INPUT_CAP: usize = 4000;

/// Heuristic summaries longer than this are truncated with an ellipsis.
pub const SUMMARY_MAX_CHARS: usize = 160;

/// Remote summaries longer than this are truncated with an ellipsis.
pub const REMOTE_SUMMARY_MAX_CHARS: usize = 500;

/// Suffix appended to truncated summaries.
pub const SUMMARY_ELLIPSIS: &str = "...";

/// Minimum number of tags on any non-empty annotation.
pub const MIN_TAGS: usize = 3;

/// Maximum number of tags on any annotation.
pub const MAX_TAGS: usize = 5;

/// Minimum word length for heuristic keyword tags.
pub const TAG_MIN_WORD_LEN: usize = 4;

/// Filler tags used, in order, to pad annotations up to `MIN_TAGS`.
pub const FILLER_TAGS: [&str; 3] = ["note", "clip", "snippet"];

/// Timeout for the remote annotation call in seconds.
pub const ANNOTATION_TIMEOUT_SECS: u64 = 12;

/// Default OpenAI-compatible API endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default generation model for annotation.
pub const GEN_MODEL: &str = "gpt-4o-mini";

/// Sampling temperature for annotation requests.
pub const GEN_TEMPERATURE: f32 = 0.2;

// =============================================================================
// CAPTURE
// =============================================================================

/// URL schemes a capture may target.
pub const CAPTURE_SCHEMES: [&str; 3] = ["http", "https", "file"];

/// Timeout for audit mirror requests in seconds.
pub const AUDIT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// MENU
// =============================================================================

/// Root trigger-surface entry.
pub const MENU_ROOT_ID: &str = "save_root";

/// Quick-save entry targeting the default project.
pub const MENU_QUICK_ID: &str = "save_quick";

/// Separator between the quick-save entry and project entries.
pub const MENU_SEPARATOR_ID: &str = "save_sep";

/// Prefix of per-project entry ids (`<prefix><project id>`).
pub const MENU_PROJECT_PREFIX: &str = "save_p_";

/// Root entry label.
pub const MENU_ROOT_TITLE: &str = "Save with Clipper";

/// Quick-save label when the identity has no (valid) default project.
pub const MENU_QUICK_NO_DEFAULT_TITLE: &str = "Save (no default project)";

/// Quick-save label prefix, followed by the default project's name.
pub const MENU_QUICK_TITLE_PREFIX: &str = "Save to default: ";

/// Per-project entry label prefix, followed by the project's name.
pub const MENU_PROJECT_TITLE_PREFIX: &str = "Save to: ";

// =============================================================================
// EVENTS
// =============================================================================

/// Default change-bus and service-event broadcast capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;
