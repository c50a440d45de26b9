//! HTTP route handlers and error mapping.
//!
//! Thin plumbing over wikiquiz-core: handlers marshal requests, run the
//! linear pipeline, and translate the core error taxonomy into response
//! classes. Extraction failures are the caller's fault (400); everything
//! downstream is a 500. Raw backend payloads and violation details are
//! logged here, never returned to clients.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use wikiquiz_core::{
    ArticleExtractor, Config, Error, NewQuizRecord, QuizGenerator, QuizStore,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: QuizStore,
    pub extractor: std::sync::Arc<ArticleExtractor>,
    pub config: Config,
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/generate_quiz", post(generate_quiz))
        .route("/history", get(history))
        .route("/quiz/:id", get(quiz_detail))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error wrapper translating core failures into HTTP responses.
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if err.is_client_error() {
            warn!(category = err.category(), error = %err, "request rejected");
            Self {
                status: StatusCode::BAD_REQUEST,
                detail: err.to_string(),
            }
        } else {
            // Raw payload / violation detail lives in the error; log it
            // here and hand the client the summary only. Storage errors
            // additionally get a generic detail so driver and SQL
            // internals never reach clients.
            error!(category = err.category(), error = ?err, "request failed");
            let detail = if matches!(err, Error::Db(_)) {
                "internal storage error".to_string()
            } else {
                err.to_string()
            };
            Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail,
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "detail": self.detail,
            "status_code": self.status.as_u16(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        (self.status, Json(body)).into_response()
    }
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "WikiQuiz API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "healthy",
    }))
}

#[derive(Debug, Deserialize)]
struct GenerateQuizRequest {
    url: String,
}

/// Runs the full pipeline: extract, generate, persist, respond.
async fn generate_quiz(
    State(state): State<AppState>,
    Json(request): Json<GenerateQuizRequest>,
) -> Result<Json<Value>, ApiError> {
    info!(url = %request.url, "quiz generation requested");

    let extraction = state.extractor.extract(&request.url).await?;
    let generator = QuizGenerator::new(&state.config)?;
    let quiz_result = generator
        .generate(&extraction.cleaned_text, &extraction.title)
        .await?;

    let record = NewQuizRecord {
        url: request.url.clone(),
        title: quiz_result.title.clone(),
        scraped_content: Some(extraction.raw_html),
        quiz_result: quiz_result.clone(),
    };
    let id = state.store.save(&record).await?;

    let mut body = serde_json::to_value(&quiz_result).map_err(Error::from)?;
    if let Some(obj) = body.as_object_mut() {
        obj.insert("id".to_string(), json!(id));
        obj.insert("url".to_string(), json!(request.url));
    }
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Value>, ApiError> {
    let limit = params.limit.unwrap_or(100);
    let offset = params.offset.unwrap_or(0);
    let summaries = state.store.history(limit, offset).await?;
    Ok(Json(json!(summaries)))
}

async fn quiz_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let record = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Quiz with ID {id} not found")))?;

    let result = &record.quiz_result;
    Ok(Json(json!({
        "id": record.id,
        "url": record.url,
        "title": record.title,
        "date_generated": record.date_generated,
        "summary": result.summary,
        "key_entities": result.key_entities,
        "sections": result.sections,
        "quiz": result.quiz,
        "related_topics": result.related_topics,
    })))
}

/// Liveness probe; degrades to "unhealthy" when the store is unreachable
/// but still answers 200.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let database = match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            error!(error = %e, "database health check failed");
            "disconnected"
        },
    };
    let status = if database == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };
    Json(json!({
        "status": status,
        "database": database,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let stats = state.store.stats().await?;
    Ok(Json(json!(stats)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use wikiquiz_core::{Difficulty, KeyEntities, QuizQuestion, QuizResult};

    async fn test_state() -> AppState {
        AppState {
            store: QuizStore::in_memory().await.unwrap(),
            extractor: std::sync::Arc::new(ArticleExtractor::new().unwrap()),
            config: Config::default(),
        }
    }

    fn sample_record() -> NewQuizRecord {
        let question = QuizQuestion {
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
        };
        NewQuizRecord {
            url: "https://en.wikipedia.org/wiki/Alan_Turing".into(),
            title: "Alan Turing".into(),
            scraped_content: None,
            quiz_result: QuizResult {
                title: "Alan Turing".into(),
                summary: "A British mathematician.".into(),
                key_entities: KeyEntities::default(),
                sections: vec!["Early life".into()],
                quiz: vec![question; 5],
                related_topics: vec!["Enigma machine".into()],
            },
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn root_returns_service_banner() {
        let app = router(test_state().await);
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn health_reports_connected_database() {
        let app = router(test_state().await);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn health_degrades_when_the_store_is_unreachable() {
        let state = test_state().await;
        state.store.close().await;

        let app = router(state);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        // Degraded, not dead: the probe still answers 200.
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["database"], "disconnected");
    }

    #[tokio::test]
    async fn store_failures_do_not_leak_driver_detail() {
        let state = test_state().await;
        state.store.close().await;

        let app = router(state);
        let response = app
            .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "internal storage error");
    }

    #[tokio::test]
    async fn stats_on_empty_store_return_zeros_without_error() {
        let app = router(test_state().await);
        let response = app
            .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["total_quizzes"], 0);
        assert_eq!(body["total_questions"], 0);
        assert!(body["first_quiz_date"].is_null());
        assert!(body["last_quiz_date"].is_null());
        assert_eq!(body["average_questions_per_quiz"], 0.0);
    }

    #[tokio::test]
    async fn history_defaults_to_empty_list() {
        let app = router(test_state().await);
        let response = app
            .oneshot(Request::get("/history").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn history_lists_saved_records_newest_first() {
        let state = test_state().await;
        state.store.save(&sample_record()).await.unwrap();
        state.store.save(&sample_record()).await.unwrap();

        let app = router(state);
        let response = app
            .oneshot(
                Request::get("/history?limit=1&offset=0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["title"], "Alan Turing");
    }

    #[tokio::test]
    async fn quiz_detail_returns_full_record() {
        let state = test_state().await;
        let id = state.store.save(&sample_record()).await.unwrap();

        let app = router(state);
        let response = app
            .oneshot(
                Request::get(format!("/quiz/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], id);
        assert_eq!(body["title"], "Alan Turing");
        assert_eq!(body["quiz"].as_array().unwrap().len(), 5);
        assert_eq!(body["quiz"][0]["options"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn missing_quiz_is_404() {
        let app = router(test_state().await);
        let response = app
            .oneshot(Request::get("/quiz/999").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("999"));
    }

    #[tokio::test]
    async fn invalid_source_url_is_400() {
        let app = router(test_state().await);
        let request = Request::post("/generate_quiz")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "url": "https://example.com/not-wikipedia" }).to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("Wikipedia"));
    }
}
