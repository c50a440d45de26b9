//! # wikiquiz-core
//!
//! Core functionality for wikiquiz - turning Wikipedia articles into
//! structured, validated quizzes via an LLM backend.
//!
//! The pipeline is strictly linear per request:
//!
//! ```text
//! URL -> ArticleExtractor -> (cleaned text, title, raw HTML)
//!     -> QuizGenerator (prompt, backend call, repair, validate)
//!     -> QuizResult -> QuizStore -> id
//! ```
//!
//! The two components worth the most care are the [`extractor`], which
//! deterministically cleans noisy article HTML into LLM-suitable text, and
//! the [`generator`], which repairs and validates the backend's
//! loosely-structured JSON reply. Everything shares one error taxonomy
//! ([`Error`]) so the HTTP layer can map failures to response classes
//! without inspecting message strings.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use wikiquiz_core::{ArticleExtractor, Config, QuizGenerator, QuizStore};
//!
//! # async fn example() -> wikiquiz_core::Result<()> {
//! let config = Config::from_env()?;
//! let extractor = ArticleExtractor::new()?;
//! let generator = QuizGenerator::new(&config)?;
//! let store = QuizStore::connect(&config.database_url).await?;
//!
//! let extraction = extractor
//!     .extract("https://en.wikipedia.org/wiki/Alan_Turing")
//!     .await?;
//! let quiz = generator
//!     .generate(&extraction.cleaned_text, &extraction.title)
//!     .await?;
//! println!("generated {} questions", quiz.quiz.len());
//! # Ok(())
//! # }
//! ```

/// Environment-based configuration resolution
pub mod config;
/// Error types and result aliases
pub mod error;
/// Wikipedia fetching and content cleaning
pub mod extractor;
/// Prompt construction, backend invocation and reply repair
pub mod generator;
/// Declarative quiz payload validation
pub mod schema;
/// SQLite persistence gateway
pub mod store;
/// Core data types
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use extractor::{ArticleExtractor, Extraction};
pub use generator::QuizGenerator;
pub use schema::{Violation, validate_quiz_payload};
pub use store::QuizStore;
pub use types::*;
