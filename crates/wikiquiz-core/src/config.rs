//! Configuration resolution for the wikiquiz service.
//!
//! All configuration is resolved explicitly from the environment at startup;
//! there is no module-level fallback state. Absent values fall back to the
//! same defaults the service has always shipped with (a local SQLite file,
//! the Groq llama-3.3 model, temperature 0.7). The generation credential is
//! deliberately *not* required here -- its absence surfaces as
//! `BackendUnavailable` when generation is attempted, so read-only endpoints
//! keep working without a key.

use crate::{Error, Result};

/// Default chat model used for quiz generation.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Default sampling temperature for quiz generation.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default embedded store used when `DATABASE_URL` is unset.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://quiz_history.db";

/// Default bind address for the HTTP server.
pub const DEFAULT_ADDR: &str = "0.0.0.0:8000";

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Groq API key; `None` means generation is unavailable.
    pub api_key: Option<String>,
    /// Chat model identifier passed to the backend.
    pub model: String,
    /// Sampling temperature passed to the backend.
    pub temperature: f64,
    /// Connection string for the persistence store.
    pub database_url: String,
    /// Socket address the HTTP server binds to.
    pub addr: String,
}

impl Config {
    /// Resolves configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when `WIKIQUIZ_TEMPERATURE` is set but not a
    /// valid number.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let model =
            std::env::var("WIKIQUIZ_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let temperature = match std::env::var("WIKIQUIZ_TEMPERATURE") {
            Ok(raw) => raw.trim().parse::<f64>().map_err(|e| {
                Error::Config(format!("invalid WIKIQUIZ_TEMPERATURE '{raw}': {e}"))
            })?,
            Err(_) => DEFAULT_TEMPERATURE,
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let addr = std::env::var("WIKIQUIZ_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());

        Ok(Self {
            api_key,
            model,
            temperature,
            database_url,
            addr,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            addr: DEFAULT_ADDR.to_string(),
        }
    }
}
