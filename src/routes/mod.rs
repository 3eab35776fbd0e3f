//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - JSON API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers), adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/language-pairs", get(http::http_get_language_pairs))
        .route("/api/v1/concepts", get(http::http_get_concepts))
        .route("/api/v1/sentences/random", get(http::http_get_random_sentence))
        .route("/api/v1/check-translation", post(http::http_post_check_translation))
        .route("/api/v1/diff", post(http::http_post_diff))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AgentConfig;

    fn app() -> Router {
        build_router(Arc::new(AppState::new(AgentConfig::default(), None)))
    }

    async fn send(req: Request<Body>) -> (StatusCode, Value) {
        let res = app().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_oracle_state() {
        let (status, body) = send(get("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "oracle": false }));
    }

    #[tokio::test]
    async fn language_pairs_inline_languages() {
        let (status, body) = send(get("/api/v1/language-pairs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["fromLanguage"]["name"], "English");
        assert_eq!(body[0]["toLanguage"]["code"], "es");
    }

    #[tokio::test]
    async fn concepts_require_pair_id() {
        let (status, body) = send(get("/api/v1/concepts")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Language pair ID is required");

        let (status, body) = send(get("/api/v1/concepts?languagePairId=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(2));
        assert_eq!(body[1]["name"], "Ser vs Estar");
    }

    #[tokio::test]
    async fn random_sentence_paths() {
        let (status, _) = send(get("/api/v1/sentences/random")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(get("/api/v1/sentences/random?conceptId=77")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No sentences found for this concept");

        let (status, body) = send(get("/api/v1/sentences/random?conceptId=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["conceptId"], 1);
        assert!(body["acceptableTranslations"].is_array());
    }

    #[tokio::test]
    async fn check_translation_exact_and_near_miss() {
        let (status, body) = send(post_json(
            "/api/v1/check-translation",
            json!({ "sentenceId": 1, "translation": "desayuno todas las mañanas" }),
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["overallScore"], 10.0);
        assert_eq!(body["isExactMatch"], true);

        let (status, body) = send(post_json(
            "/api/v1/check-translation",
            json!({ "sentenceId": 4, "translation": "La sopa está caliente muy" }),
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isExactMatch"], false);
        assert!(body["closestMatch"].is_string());
        let first = &body["translationsWithDiffs"][0];
        assert!(first["translation"].is_string());
        assert!(first["diffs"]["diffs"].is_array());
    }

    #[tokio::test]
    async fn check_translation_errors() {
        let (status, _) = send(post_json("/api/v1/check-translation", json!({ "translation": "hola" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(post_json(
            "/api/v1/check-translation",
            json!({ "sentenceId": 404, "translation": "hola" }),
        ))
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Sentence not found");
    }

    #[tokio::test]
    async fn diff_endpoint_returns_both_sides() {
        let (status, body) = send(post_json(
            "/api/v1/diff",
            json!({ "reference": "Ella trabaja en un hospital", "candidate": "Ella trabaja en un hospitol" }),
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["distance"], 1);
        assert_eq!(body["reference"]["diffs"][0], json!({ "start": 25, "end": 26, "type": "wrong" }));
        assert_eq!(body["candidate"]["text"], "Ella trabaja en un hospitol");
    }

    #[tokio::test]
    async fn diff_offsets_skip_accents_like_javascript() {
        let (status, body) = send(post_json(
            "/api/v1/diff",
            json!({ "reference": "La sopa está muy caliente", "candidate": "La sopa está caliente" }),
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["distance"], 1);
        assert_eq!(body["reference"]["diffs"], json!([{ "start": 13, "end": 17, "type": "missing" }]));
        assert_eq!(body["candidate"]["diffs"], json!([]));
    }
}
