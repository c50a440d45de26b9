//! Declarative validation of backend quiz payloads.
//!
//! The generation backend replies with free text that, after repair, parses
//! into an arbitrary JSON value. This module decides pass/fail against the
//! quiz record shapes and returns every violated constraint as a
//! `(field path, constraint)` pair -- it never panics on malformed or
//! missing fields and never produces partial objects. Callers treat a
//! non-empty violation list as a `SchemaViolation` error.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Number of options every question must carry.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// Inclusive bounds on the number of questions in a quiz.
pub const QUIZ_LEN_BOUNDS: (usize, usize) = (5, 10);

/// Maximum number of article sections retained.
pub const MAX_SECTIONS: usize = 15;

const DIFFICULTIES: [&str; 3] = ["easy", "medium", "hard"];

/// A single violated constraint, located by its JSON field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Path to the offending field, e.g. `quiz[2].answer`.
    pub path: String,
    /// Human-readable description of the violated constraint.
    pub constraint: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            constraint: constraint.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.constraint)
    }
}

/// Validates an arbitrary parsed JSON value against the quiz schema.
///
/// Returns the complete list of violations; an empty list means the value
/// can be deserialized into [`crate::QuizResult`] without loss.
#[must_use]
pub fn validate_quiz_payload(value: &Value) -> Vec<Violation> {
    let mut violations = Vec::new();

    let Some(obj) = value.as_object() else {
        violations.push(Violation::new("$", "expected a JSON object"));
        return violations;
    };

    check_nonempty_string(obj.get("title"), "title", &mut violations);
    check_nonempty_string(obj.get("summary"), "summary", &mut violations);

    if let Some(entities) = obj.get("key_entities") {
        check_key_entities(entities, &mut violations);
    }

    if let Some(sections) = obj.get("sections") {
        check_string_list(sections, "sections", &mut violations);
        if let Some(list) = sections.as_array() {
            if list.len() > MAX_SECTIONS {
                violations.push(Violation::new(
                    "sections",
                    format!("expected at most {MAX_SECTIONS} sections, got {}", list.len()),
                ));
            }
        }
    }

    if let Some(topics) = obj.get("related_topics") {
        check_string_list(topics, "related_topics", &mut violations);
    }

    check_quiz(obj.get("quiz"), &mut violations);

    violations
}

fn check_quiz(value: Option<&Value>, violations: &mut Vec<Violation>) {
    let Some(value) = value else {
        violations.push(Violation::new("quiz", "field is required"));
        return;
    };
    let Some(questions) = value.as_array() else {
        violations.push(Violation::new("quiz", "expected an array of questions"));
        return;
    };

    let (min, max) = QUIZ_LEN_BOUNDS;
    if questions.len() < min || questions.len() > max {
        violations.push(Violation::new(
            "quiz",
            format!(
                "expected between {min} and {max} questions, got {}",
                questions.len()
            ),
        ));
    }

    for (i, question) in questions.iter().enumerate() {
        check_question(question, i, violations);
    }
}

fn check_question(value: &Value, index: usize, violations: &mut Vec<Violation>) {
    let path = |field: &str| format!("quiz[{index}].{field}");

    let Some(obj) = value.as_object() else {
        violations.push(Violation::new(
            format!("quiz[{index}]"),
            "expected a question object",
        ));
        return;
    };

    check_nonempty_string(obj.get("question"), &path("question"), violations);
    check_nonempty_string(obj.get("explanation"), &path("explanation"), violations);

    match obj.get("difficulty").and_then(Value::as_str) {
        Some(level) if DIFFICULTIES.contains(&level) => {},
        Some(level) => violations.push(Violation::new(
            path("difficulty"),
            format!("expected one of easy/medium/hard, got '{level}'"),
        )),
        None => violations.push(Violation::new(
            path("difficulty"),
            "expected one of easy/medium/hard",
        )),
    }

    // Options and answer are validated together because the answer
    // constraint is a cross-field membership check.
    let options: Option<Vec<&str>> = obj
        .get("options")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Value::as_str).collect());

    match options {
        Some(ref opts) if opts.len() == OPTIONS_PER_QUESTION => {
            let mut seen = opts.clone();
            seen.sort_unstable();
            seen.dedup();
            if seen.len() != OPTIONS_PER_QUESTION {
                violations.push(Violation::new(
                    path("options"),
                    "options must be distinct",
                ));
            }
        },
        Some(opts) => violations.push(Violation::new(
            path("options"),
            format!(
                "expected exactly {OPTIONS_PER_QUESTION} string options, got {}",
                opts.len()
            ),
        )),
        None => violations.push(Violation::new(
            path("options"),
            "expected an array of 4 strings",
        )),
    }

    match obj.get("answer").and_then(Value::as_str) {
        Some(answer) => {
            let in_options = obj
                .get("options")
                .and_then(Value::as_array)
                .is_some_and(|list| {
                    list.iter()
                        .filter_map(Value::as_str)
                        .any(|opt| opt.trim() == answer.trim())
                });
            if !in_options {
                violations.push(Violation::new(
                    path("answer"),
                    format!("answer '{answer}' is not one of the options"),
                ));
            }
        },
        None => violations.push(Violation::new(path("answer"), "expected a string")),
    }
}

fn check_key_entities(value: &Value, violations: &mut Vec<Violation>) {
    let Some(obj) = value.as_object() else {
        violations.push(Violation::new("key_entities", "expected an object"));
        return;
    };
    for field in ["people", "organizations", "locations"] {
        if let Some(list) = obj.get(field) {
            check_string_list(list, &format!("key_entities.{field}"), violations);
        }
    }
}

fn check_string_list(value: &Value, path: &str, violations: &mut Vec<Violation>) {
    match value.as_array() {
        Some(list) => {
            for (i, item) in list.iter().enumerate() {
                if !item.is_string() {
                    violations.push(Violation::new(
                        format!("{path}[{i}]"),
                        "expected a string",
                    ));
                }
            }
        },
        None => violations.push(Violation::new(path, "expected an array of strings")),
    }
}

fn check_nonempty_string(value: Option<&Value>, path: &str, violations: &mut Vec<Violation>) {
    match value.and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => {},
        Some(_) => violations.push(Violation::new(path, "must not be empty")),
        None => violations.push(Violation::new(path, "expected a non-empty string")),
    }
}
