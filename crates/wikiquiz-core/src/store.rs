//! SQLite-backed persistence for generated quizzes.
//!
//! Records are write-once: `save` assigns the identifier and nothing ever
//! updates or deletes a row. The embedded `QuizResult` is stored as an
//! opaque JSON text column, exactly as produced by the generator.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{info, warn};

use crate::types::{NewQuizRecord, QuizRecord, QuizResult, QuizStats, QuizSummary};
use crate::{Error, Result};

const CREATE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS quizzes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    date_generated TEXT NOT NULL,
    scraped_content TEXT,
    quiz_result TEXT NOT NULL
)";

const CREATE_INDEXES: [&str; 3] = [
    "CREATE INDEX IF NOT EXISTS idx_quizzes_url ON quizzes(url)",
    "CREATE INDEX IF NOT EXISTS idx_quizzes_title ON quizzes(title)",
    "CREATE INDEX IF NOT EXISTS idx_quizzes_date ON quizzes(date_generated)",
];

/// Row shape as it comes back from SQLite, before JSON decoding.
#[derive(sqlx::FromRow)]
struct QuizRow {
    id: i64,
    url: String,
    title: String,
    date_generated: DateTime<Utc>,
    scraped_content: Option<String>,
    quiz_result: String,
}

impl QuizRow {
    fn into_record(self) -> Result<QuizRecord> {
        let quiz_result: QuizResult = serde_json::from_str(&self.quiz_result)
            .map_err(|e| Error::Db(sqlx::Error::Decode(Box::new(e))))?;
        Ok(QuizRecord {
            id: self.id,
            url: self.url,
            title: self.title,
            date_generated: self.date_generated,
            scraped_content: self.scraped_content,
            quiz_result,
        })
    }
}

/// Persistence gateway for quiz records.
#[derive(Clone)]
pub struct QuizStore {
    pool: SqlitePool,
}

impl QuizStore {
    /// Connects to the store and creates the schema when missing.
    ///
    /// Accepts any SQLite connection string, e.g. `sqlite://quiz_history.db`.
    /// The database file is created on first use.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(Error::Db)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self { pool };
        store.init().await?;
        info!(database_url, "quiz store initialized");
        Ok(store)
    }

    /// Ephemeral single-connection store, used by tests.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(Error::Db)?;
        // One connection only: each in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        for statement in CREATE_INDEXES {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Persists a new record and returns its store-assigned identifier.
    ///
    /// Durable before the identifier is returned; each save yields a
    /// distinct id even under concurrent writers.
    pub async fn save(&self, record: &NewQuizRecord) -> Result<i64> {
        let quiz_json = serde_json::to_string(&record.quiz_result)
            .map_err(|e| Error::Db(sqlx::Error::Encode(Box::new(e))))?;
        let result = sqlx::query(
            "INSERT INTO quizzes (url, title, date_generated, scraped_content, quiz_result)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.url)
        .bind(&record.title)
        .bind(Utc::now())
        .bind(&record.scraped_content)
        .bind(quiz_json)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(id, url = %record.url, "quiz saved");
        Ok(id)
    }

    /// Lists summaries, newest first.
    pub async fn history(&self, limit: i64, offset: i64) -> Result<Vec<QuizSummary>> {
        let summaries = sqlx::query_as::<_, QuizSummary>(
            "SELECT id, url, title, date_generated FROM quizzes
             ORDER BY date_generated DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(summaries)
    }

    /// Fetches one full record, `None` when absent.
    pub async fn get(&self, id: i64) -> Result<Option<QuizRecord>> {
        let row = sqlx::query_as::<_, QuizRow>(
            "SELECT id, url, title, date_generated, scraped_content, quiz_result
             FROM quizzes WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(QuizRow::into_record).transpose()
    }

    /// Total number of persisted records.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Aggregate statistics; all zeros and null dates on an empty store.
    pub async fn stats(&self) -> Result<QuizStats> {
        let total_quizzes = self.count().await?;
        if total_quizzes == 0 {
            return Ok(QuizStats {
                total_quizzes: 0,
                total_questions: 0,
                first_quiz_date: None,
                last_quiz_date: None,
                average_questions_per_quiz: 0.0,
            });
        }

        let first_quiz_date: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT date_generated FROM quizzes ORDER BY date_generated ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        let last_quiz_date: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT date_generated FROM quizzes ORDER BY date_generated DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        // Question counts live inside the opaque JSON column; rows that fail
        // to decode are skipped rather than failing the whole aggregate.
        let payloads: Vec<String> = sqlx::query_scalar("SELECT quiz_result FROM quizzes")
            .fetch_all(&self.pool)
            .await?;
        let mut total_questions: i64 = 0;
        for payload in &payloads {
            match serde_json::from_str::<serde_json::Value>(payload) {
                Ok(value) => {
                    total_questions += value
                        .get("quiz")
                        .and_then(serde_json::Value::as_array)
                        .map_or(0, |quiz| quiz.len() as i64);
                },
                Err(e) => warn!(error = %e, "skipping undecodable quiz_result row in stats"),
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let average_questions_per_quiz = total_questions as f64 / total_quizzes as f64;

        Ok(QuizStats {
            total_quizzes,
            total_questions,
            first_quiz_date,
            last_quiz_date,
            average_questions_per_quiz,
        })
    }

    /// Connectivity probe used by the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Closes the connection pool. Every subsequent operation, including
    /// [`Self::ping`], fails with a pool-closed error.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
