//! Error types and handling for wikiquiz-core operations.
//!
//! Every failure in the pipeline maps to exactly one variant so callers can
//! translate it into the right HTTP class. The taxonomy is split along the
//! request boundary: extraction failures are the caller's fault (bad URL,
//! unreachable article, empty page), generation and persistence failures are
//! ours. All errors are terminal for the request -- there is no retry logic
//! anywhere in the pipeline.

use thiserror::Error;

use crate::schema::Violation;

/// The main error type for wikiquiz-core operations.
///
/// All public functions in wikiquiz-core return `Result<T, Error>` for
/// consistent error handling. Variants that originate at external boundaries
/// (the article fetch, the generation backend) keep enough raw detail to
/// reproduce the failure offline from logs alone.
#[derive(Error, Debug)]
pub enum Error {
    /// The URL does not match the accepted Wikipedia article pattern.
    ///
    /// Raised before any network call is attempted, so a rejected URL never
    /// costs an outbound request.
    #[error("invalid Wikipedia URL: expected https://en.wikipedia.org/wiki/... , got '{0}'")]
    InvalidSource(String),

    /// The article fetch failed at the transport level or returned a
    /// non-success status. The underlying `reqwest::Error` is preserved.
    #[error("failed to fetch article: {0}")]
    Fetch(#[from] reqwest::Error),

    /// No usable text remained after boilerplate removal.
    #[error("could not extract article content from the page")]
    EmptyContent,

    /// The generation backend credential is missing from the environment.
    #[error("generation backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The generation call failed or its reply contained no parseable JSON.
    ///
    /// `raw` carries the backend's full reply (when one was received) so the
    /// failure can be diagnosed offline. It is logged, never returned to
    /// clients.
    #[error("generation backend error: {reason}")]
    Backend {
        /// What went wrong.
        reason: String,
        /// The raw backend reply, if any was received.
        raw: Option<String>,
    },

    /// The parsed backend payload failed schema validation.
    ///
    /// Carries the full violation list plus a pretty-printed copy of the
    /// offending payload for diagnostics.
    #[error("quiz validation failed: {}", summarize_violations(.violations))]
    SchemaViolation {
        /// Every (field path, violated constraint) pair found.
        violations: Vec<Violation>,
        /// Pretty-printed copy of the payload that failed validation.
        payload: String,
    },

    /// A persistence operation failed.
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    /// Configuration is invalid or incomplete.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Backend {
            reason: format!("failed to deserialize quiz payload: {err}"),
            raw: None,
        }
    }
}

impl Error {
    /// Whether this failure is the caller's fault (maps to an HTTP 4xx).
    ///
    /// Extraction failures -- a bad URL, an unreachable or empty article --
    /// are client errors; everything downstream of a successful extraction
    /// is a server error.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSource(_) | Self::Fetch(_) | Self::EmptyContent
        )
    }

    /// Short category label used in logs and error responses.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::InvalidSource(_) => "invalid_source",
            Self::Fetch(_) => "fetch",
            Self::EmptyContent => "empty_content",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::Backend { .. } => "backend",
            Self::SchemaViolation { .. } => "schema_violation",
            Self::Db(_) => "database",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

fn summarize_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience result type for wikiquiz-core operations.
pub type Result<T> = std::result::Result<T, Error>;
