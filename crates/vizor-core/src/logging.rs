//! Structured logging field name constants for vizor.
//!
//! All crates use these constants for consistent structured logging fields.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Request failed, requires operator attention |
//! | WARN  | Malformed provider payload, item or entry dropped |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Provider requests, intermediate counts, config choices |
//! | TRACE | Per-item iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across request → provider calls.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "search", "db", "inference"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "normalize", "vertex", "tag_search", "file_storage"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "detect", "compare", "scan", "search_by_tag"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Provider name ("vision", "vertex", "gemini").
pub const PROVIDER: &str = "provider";

/// Image reference (URL) being operated on.
pub const IMAGE_URL: &str = "image_url";

/// Tag being searched.
pub const TAG: &str = "tag";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results produced by a normalization or search.
pub const RESULT_COUNT: &str = "result_count";

/// Number of records scanned.
pub const SCANNED_COUNT: &str = "scanned_count";

/// Byte length of a payload.
pub const PAYLOAD_LEN: &str = "payload_len";
