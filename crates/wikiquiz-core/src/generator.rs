//! Quiz generation against an OpenAI-compatible chat-completions backend.
//!
//! The backend's reply is free text with no enforced contract beyond the
//! prompt instructions, so this module treats it as a hostile input: a
//! multi-stage repair pipeline (fence stripping, direct parse, brace
//! substring extraction) recovers structured data before the schema
//! validator gets the final say. One call per request, no retries -- a
//! failure at any stage is terminal.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::schema::validate_quiz_payload;
use crate::types::QuizResult;
use crate::{Error, Result};

/// OpenAI-compatible Groq API root.
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Upper bound on the generation request. The reference behavior has no
/// backend timeout at all; this bound is a deliberate deviation so a stuck
/// backend cannot hang a request forever.
const BACKEND_TIMEOUT: Duration = Duration::from_secs(120);

const MAX_TOKENS: u32 = 2048;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that generates educational quizzes.";

const PROMPT_TEMPLATE: &str = r#"You are an expert educator specializing in creating educational quizzes from Wikipedia articles.

Given the following Wikipedia article content, generate a comprehensive, educational quiz with high-quality questions.

ARTICLE CONTENT:
{article_content}

REQUIREMENTS:
1. Generate exactly 7-8 thoughtful, factual questions based on the article.
2. Each question must:
   - Be directly answerable from the provided content
   - Have 4 distinct, plausible options
   - Have one clear correct answer
   - Include a brief explanation (2-3 sentences) grounding the answer in the article
   - Be assigned a difficulty level (easy, medium, or hard)
3. Extract key entities: people, organizations, and locations mentioned in the article.
4. Provide a 2-3 sentence summary of the article.
5. List 3-5 main sections/topics covered in the article.
6. Suggest 3-5 related Wikipedia topics for further reading.

IMPORTANT CONSTRAINTS:
- Do NOT hallucinate information not present in the article
- Questions should test comprehension, not just recall
- Vary difficulty levels across questions
- Ensure all options are grammatically consistent with the question

CRITICAL ANSWER FORMAT RULES:
- The 'answer' field MUST contain the EXACT text from one of the options
- Do NOT add prefixes like 'A)', 'Option A:', or any other formatting
- Copy the option text EXACTLY as it appears in the options array
- Example: If options are ["Paris", "London", "Berlin", "Rome"], answer should be "Paris" NOT "A) Paris"

Return the response as a valid JSON object matching this exact structure:
{
  "title": "string - article title",
  "summary": "string - 2-3 sentence summary",
  "key_entities": {
    "people": ["list of people mentioned"],
    "organizations": ["list of organizations"],
    "locations": ["list of locations"]
  },
  "sections": ["list of main sections/topics"],
  "quiz": [
    {
      "question": "What is the capital of France?",
      "options": ["Paris", "London", "Berlin", "Rome"],
      "answer": "Paris",
      "difficulty": "easy",
      "explanation": "Paris is the capital and largest city of France."
    }
  ],
  "related_topics": ["topic 1", "topic 2", "topic 3"]
}

CRITICAL: Return ONLY valid JSON, no markdown formatting, no extra text. The 'answer' field must match EXACTLY one option."#;

/// Orchestrates one quiz generation: prompt, backend call, repair,
/// validation.
pub struct QuizGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f64,
    base_url: String,
}

impl QuizGenerator {
    /// Builds a generator from resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::BackendUnavailable` when no API key is configured.
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            Error::BackendUnavailable(
                "GROQ_API_KEY not found in environment. Set it in your .env file".to_string(),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(BACKEND_TIMEOUT)
            .build()
            .map_err(|e| Error::Backend {
                reason: format!("failed to build backend client: {e}"),
                raw: None,
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            base_url: GROQ_BASE_URL.to_string(),
        })
    }

    /// Points the generator at a different API root (for tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Generates a validated quiz from cleaned article text.
    ///
    /// # Errors
    ///
    /// - `Error::Backend` when the call fails or the reply holds no
    ///   parseable JSON (the raw reply is captured for diagnostics)
    /// - `Error::SchemaViolation` when the parsed payload fails validation
    pub async fn generate(
        &self,
        article_content: &str,
        article_title: &str,
    ) -> Result<QuizResult> {
        info!(title = article_title, "generating quiz");

        let prompt = PROMPT_TEMPLATE.replace("{article_content}", article_content);
        let reply = self.chat(&prompt).await?;
        debug!(chars = reply.len(), "backend reply received");

        let cleaned = strip_code_fences(&reply);
        let Some(mut value) = parse_relaxed(cleaned) else {
            error!(raw = %reply, "no valid JSON found in backend reply");
            return Err(Error::Backend {
                reason: "no valid JSON found in backend reply".to_string(),
                raw: Some(reply),
            });
        };

        backfill_title(&mut value, article_title);

        let violations = validate_quiz_payload(&value);
        if !violations.is_empty() {
            let payload =
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            error!(?violations, payload = %payload, "quiz payload failed schema validation");
            return Err(Error::SchemaViolation {
                violations,
                payload,
            });
        }

        let result: QuizResult = serde_json::from_value(value)?;
        info!(questions = result.quiz.len(), "generated quiz");
        Ok(result)
    }

    /// One chat-completions round trip, returning the assistant message
    /// content verbatim.
    async fn chat(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "temperature": self.temperature,
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Backend {
                reason: format!("backend request failed: {e}"),
                raw: None,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend {
                reason: format!("backend returned {status}"),
                raw: Some(body),
            });
        }

        let body: Value = response.json().await.map_err(|e| Error::Backend {
            reason: format!("backend reply was not JSON: {e}"),
            raw: None,
        })?;

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| Error::Backend {
                reason: "backend reply contained no message content".to_string(),
                raw: Some(body.to_string()),
            })
    }
}

/// Strips a leading code fence (with or without a language tag) and a
/// trailing fence, then trims.
fn strip_code_fences(reply: &str) -> &str {
    let mut text = reply.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Direct parse first; on failure, the substring between the first `{` and
/// the last `}` inclusive. `None` when neither yields valid JSON.
fn parse_relaxed(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Backfills a missing or empty `title` with the caller-supplied article
/// title. The backend omitting the title must not fail the request.
fn backfill_title(value: &mut Value, article_title: &str) {
    let missing = match value.get("title") {
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Null) | None => true,
        Some(_) => false,
    };
    if missing {
        if let Some(obj) = value.as_object_mut() {
            obj.insert("title".to_string(), Value::String(article_title.to_string()));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quiz_payload_without_title() -> Value {
        let question = json!({
            "question": "What was Alan Turing's profession?",
            "options": ["Mathematician", "Painter", "Composer", "Architect"],
            "answer": "Mathematician",
            "difficulty": "easy",
            "explanation": "The article describes Turing as a British mathematician."
        });
        json!({
            "summary": "Alan Turing was a British mathematician and computer scientist.",
            "key_entities": { "people": ["Alan Turing"], "organizations": [], "locations": [] },
            "sections": ["Early life"],
            "quiz": (0..6).map(|_| question.clone()).collect::<Vec<_>>(),
            "related_topics": ["Computability theory"]
        })
    }

    fn generator_for(server: &MockServer) -> QuizGenerator {
        let config = Config {
            api_key: Some("test-key".to_string()),
            ..Config::default()
        };
        QuizGenerator::new(&config)
            .unwrap()
            .with_base_url(server.uri())
    }

    fn chat_reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": content } }]
        }))
    }

    #[test]
    fn missing_api_key_means_backend_unavailable() {
        let config = Config::default();
        assert!(matches!(
            QuizGenerator::new(&config),
            Err(Error::BackendUnavailable(_))
        ));
    }

    #[test]
    fn fence_stripping_matches_unwrapped_parse() {
        let payload = quiz_payload_without_title().to_string();
        let tagged = format!("```json\n{payload}\n```");
        let untagged = format!("```\n{payload}\n```");

        let direct = parse_relaxed(strip_code_fences(&payload)).unwrap();
        assert_eq!(parse_relaxed(strip_code_fences(&tagged)).unwrap(), direct);
        assert_eq!(parse_relaxed(strip_code_fences(&untagged)).unwrap(), direct);
    }

    #[test]
    fn substring_extraction_recovers_json_wrapped_in_commentary() {
        let payload = quiz_payload_without_title();
        let noisy = format!(
            "Sure! Here is the quiz you asked for:\n{payload}\nLet me know if you need more."
        );
        assert_eq!(parse_relaxed(&noisy).unwrap(), payload);
    }

    #[test]
    fn unparseable_reply_yields_none() {
        assert!(parse_relaxed("no braces here at all").is_none());
        assert!(parse_relaxed("} backwards {").is_none());
        assert!(parse_relaxed("{ definitely not json }").is_none());
    }

    #[test]
    fn title_backfill_fills_missing_and_empty_only() {
        let mut value = quiz_payload_without_title();
        backfill_title(&mut value, "Alan Turing");
        assert_eq!(value["title"], "Alan Turing");

        let mut value = json!({ "title": "  ", "quiz": [] });
        backfill_title(&mut value, "Alan Turing");
        assert_eq!(value["title"], "Alan Turing");

        let mut value = json!({ "title": "Turing machine", "quiz": [] });
        backfill_title(&mut value, "Alan Turing");
        assert_eq!(value["title"], "Turing machine");
    }

    #[test]
    fn title_backfill_leaves_other_fields_untouched() {
        let mut value = quiz_payload_without_title();
        let before = value.clone();
        backfill_title(&mut value, "Alan Turing");
        let mut restored = value;
        restored.as_object_mut().unwrap().remove("title");
        assert_eq!(restored, before);
    }

    #[tokio::test]
    async fn end_to_end_generation_backfills_title_and_validates() {
        let server = MockServer::start().await;
        let content = format!("```json\n{}\n```", quiz_payload_without_title());
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(chat_reply(&content))
            .mount(&server)
            .await;

        let generator = generator_for(&server);
        let result = generator
            .generate(
                "Alan Turing was a British mathematician...",
                "Alan Turing",
            )
            .await
            .unwrap();

        assert_eq!(result.title, "Alan Turing");
        assert_eq!(result.quiz.len(), 6);
        for question in &result.quiz {
            assert_eq!(question.options.len(), 4);
            let mut distinct = question.options.clone();
            distinct.sort();
            distinct.dedup();
            assert_eq!(distinct.len(), 4);
            assert!(question.options.contains(&question.answer));
        }
    }

    #[tokio::test]
    async fn reply_without_json_fails_with_raw_capture() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(chat_reply("I'm sorry, I cannot help with that."))
            .mount(&server)
            .await;

        let generator = generator_for(&server);
        let err = generator.generate("text", "Title").await.unwrap_err();
        match err {
            Error::Backend { raw, .. } => {
                assert_eq!(raw.as_deref(), Some("I'm sorry, I cannot help with that."));
            },
            other => panic!("expected Backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn schema_violations_carry_the_offending_payload() {
        let server = MockServer::start().await;
        let mut payload = quiz_payload_without_title();
        payload["quiz"][0]["answer"] = json!("A) Mathematician");
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(chat_reply(&payload.to_string()))
            .mount(&server)
            .await;

        let generator = generator_for(&server);
        let err = generator.generate("text", "Alan Turing").await.unwrap_err();
        match err {
            Error::SchemaViolation {
                violations,
                payload,
            } => {
                assert!(violations.iter().any(|v| v.path == "quiz[0].answer"));
                assert!(payload.contains("A) Mathematician"));
            },
            other => panic!("expected SchemaViolation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn backend_http_errors_are_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let generator = generator_for(&server);
        let err = generator.generate("text", "Title").await.unwrap_err();
        match err {
            Error::Backend { reason, raw } => {
                assert!(reason.contains("429"));
                assert_eq!(raw.as_deref(), Some("rate limited"));
            },
            other => panic!("expected Backend error, got {other:?}"),
        }
    }
}
