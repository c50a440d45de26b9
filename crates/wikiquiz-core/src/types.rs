//! Core data types for quiz generation and persistence.
//!
//! `QuizResult` is the validated output of one generation request;
//! `QuizRecord` wraps it with request metadata and the store-assigned id.
//! All types serialize with snake_case field names matching the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Difficulty level assigned to a quiz question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A single multiple-choice question.
///
/// Invariant (enforced by [`crate::schema`], not by construction): `options`
/// holds exactly 4 distinct strings and `answer` equals one of them
/// byte-for-byte after trimming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub difficulty: Difficulty,
    pub explanation: String,
}

/// Named entities the backend extracted from the article.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyEntities {
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
}

/// The validated, normalized output of one generation request.
///
/// `quiz` holds 5-10 questions in presentation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub key_entities: KeyEntities,
    #[serde(default)]
    pub sections: Vec<String>,
    pub quiz: Vec<QuizQuestion>,
    #[serde(default)]
    pub related_topics: Vec<String>,
}

/// A persisted generation, as stored by [`crate::store::QuizStore`].
///
/// Created exactly once at successful generation time, never updated. The
/// store owns identifier assignment; `date_generated` is immutable once set.
#[derive(Debug, Clone, Serialize)]
pub struct QuizRecord {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub date_generated: DateTime<Utc>,
    /// Raw HTML snapshot of the scraped page, write-once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraped_content: Option<String>,
    pub quiz_result: QuizResult,
}

/// A record as handed to the store, before an id exists.
#[derive(Debug, Clone)]
pub struct NewQuizRecord {
    pub url: String,
    pub title: String,
    pub scraped_content: Option<String>,
    pub quiz_result: QuizResult,
}

/// One row of the generation history listing.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuizSummary {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub date_generated: DateTime<Utc>,
}

/// Aggregate statistics over all persisted generations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizStats {
    pub total_quizzes: i64,
    pub total_questions: i64,
    pub first_quiz_date: Option<DateTime<Utc>>,
    pub last_quiz_date: Option<DateTime<Utc>>,
    pub average_questions_per_quiz: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Difficulty::Medium).unwrap(),
            "\"medium\""
        );
        let parsed: Difficulty = serde_json::from_str("\"hard\"").unwrap();
        assert_eq!(parsed, Difficulty::Hard);
    }

    #[test]
    fn quiz_result_tolerates_missing_optional_lists() {
        let json = serde_json::json!({
            "title": "Alan Turing",
            "summary": "A British mathematician.",
            "quiz": []
        });
        let result: QuizResult = serde_json::from_value(json).unwrap();
        assert!(result.key_entities.people.is_empty());
        assert!(result.sections.is_empty());
        assert!(result.related_topics.is_empty());
    }

    #[test]
    fn quiz_result_round_trips_through_json() {
        let result = QuizResult {
            title: "Alan Turing".into(),
            summary: "Mathematician and computer scientist.".into(),
            key_entities: KeyEntities {
                people: vec!["Alan Turing".into()],
                organizations: vec!["Bletchley Park".into()],
                locations: vec!["London".into()],
            },
            sections: vec!["Early life".into()],
            quiz: vec![QuizQuestion {
                question: "Where did Turing work during the war?".into(),
                options: vec![
                    "Bletchley Park".into(),
                    "Cambridge".into(),
                    "Manchester".into(),
                    "London".into(),
                ],
                answer: "Bletchley Park".into(),
                difficulty: Difficulty::Easy,
                explanation: "Turing worked at Bletchley Park on codebreaking.".into(),
            }],
            related_topics: vec!["Enigma machine".into()],
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: QuizResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
