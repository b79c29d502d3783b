use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use catalog_core::persist::{load_index, IndexPaths};
use catalog_core::{CourseId, CourseIndex, CoreError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub course_id: CourseId,
    pub score: usize,
    pub url: String,
}

#[derive(Deserialize)]
pub struct CompareParams {
    pub a: CourseId,
    pub b: CourseId,
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<CourseIndex>,
}

type ApiError = (StatusCode, String);

fn internal(e: CoreError) -> ApiError {
    tracing::error!(error = %e, "index is inconsistent");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub fn build_app(index_dir: String) -> Result<Router> {
    let index = load_index(&IndexPaths::new(&index_dir))?;
    tracing::info!(index_dir = %index_dir, courses = index.num_courses(), words = index.num_words(), "index loaded");
    Ok(router(Arc::new(index)))
}

/// Serve `app` on `listener` until `shutdown` resolves, then let in-flight
/// requests finish.
pub async fn serve_until<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!(addr = %listener.local_addr()?, "server listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    tracing::info!("server stopped");
    Ok(())
}

pub fn router(index: Arc<CourseIndex>) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/compare", get(compare_handler))
        .route("/course/:course_id", get(course_handler))
        .with_state(AppState { index })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let ranked = state.index.rank(&[params.q.as_str()]).map_err(internal)?;
    let total_hits = ranked.len();
    let k = params.k.clamp(1, 100);
    let results = ranked
        .into_iter()
        .take(k)
        .map(|r| SearchHit { course_id: r.id, score: r.score, url: r.url })
        .collect();
    Ok(Json(SearchResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), total_hits, results }))
}

pub async fn compare_handler(State(state): State<AppState>, Query(params): Query<CompareParams>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "a": params.a,
        "b": params.b,
        "similarity": state.index.compare(params.a, params.b),
    }))
}

pub async fn course_handler(State(state): State<AppState>, Path(course_id): Path<CourseId>) -> Result<Json<serde_json::Value>, ApiError> {
    let url = state.index.url(course_id).ok_or((StatusCode::NOT_FOUND, format!("course {course_id} not found")))?;
    let words: Vec<&str> = state.index.words_of(course_id).map(|w| w.iter().map(String::as_str).collect()).unwrap_or_default();
    Ok(Json(serde_json::json!({
        "course_id": course_id,
        "url": url,
        "words": words,
    })))
}
