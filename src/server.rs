use crate::constants::{API_DESCRIPTION, API_TITLE, MAX_GRAPH_IDS, SERVICE_NAME};
use crate::domain::{DocumentGraph, SearchResults};
use crate::error::ApiError;
use crate::metrics::{GraphMetrics, SearchMetrics};
use crate::state::AppState;
use crate::undl::SearchParams;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub search_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GraphRequest {
    /// Digital Library ids, as strings or integers
    #[serde(default)]
    pub ids: Vec<Value>,
    #[serde(default)]
    pub verbose: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Undl { .. } | ApiError::Http(_) | ApiError::Xml(_) => StatusCode::BAD_GATEWAY,
            ApiError::Graph { .. } => StatusCode::BAD_GATEWAY,
            ApiError::GraphUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed with {}: {}", status, self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "Status": "Ok 🚀" }))
}

async fn about() -> Json<Value> {
    Json(json!({
        "title": API_TITLE,
        "description": API_DESCRIPTION,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn graph_health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.graph.check_connection().await?;
    Ok(Json(json!({ "graph": "connected" })))
}

/// Proxy a search to the Digital Library
async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<SearchResults>, ApiError> {
    let Query(query) = query?;
    let search_id = query.search_id.filter(|id| !id.trim().is_empty());
    let params = SearchParams::new(query.q).with_search_id(search_id);

    let started = Instant::now();
    match state.undl.query_page(&params).await {
        Ok(results) => {
            SearchMetrics::record_success(started.elapsed().as_secs_f64(), results.records.len());
            Ok(Json(results))
        }
        Err(e) => {
            SearchMetrics::record_error();
            warn!("Search for '{}' failed: {}", params.prompt, e);
            Err(e)
        }
    }
}

/// Documents and relations for a set of Digital Library ids
async fn graph(
    State(state): State<AppState>,
    request: Result<Json<GraphRequest>, JsonRejection>,
) -> Result<Json<DocumentGraph>, ApiError> {
    let Json(request) = request?;
    let ids = request_ids(&request.ids)?;
    if ids.iter().all(|id| id.trim().is_empty()) {
        return Err(ApiError::InvalidRequest(
            "at least one document id is required".to_string(),
        ));
    }
    if ids.len() > MAX_GRAPH_IDS {
        return Err(ApiError::InvalidRequest(format!(
            "at most {MAX_GRAPH_IDS} document ids are accepted per request, got {}",
            ids.len()
        )));
    }

    let started = Instant::now();
    match state.graph.documents_by_ids(&ids, request.verbose).await {
        Ok(graph) => {
            GraphMetrics::record_success(started.elapsed().as_secs_f64());
            Ok(Json(graph))
        }
        Err(e) => {
            GraphMetrics::record_error();
            Err(e)
        }
    }
}

/// Ids arrive as JSON strings or integers; anything else is rejected
fn request_ids(values: &[Value]) -> Result<Vec<String>, ApiError> {
    values
        .iter()
        .map(|value| match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
            other => Err(ApiError::InvalidRequest(format!(
                "document ids must be strings or integers, got {other}"
            ))),
        })
        .collect()
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/about", get(about))
        .route("/health", get(health))
        .route("/health/graph", get(graph_health))
        .route("/search", get(search))
        .route("/graph", post(graph))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Start the HTTP server and run until Ctrl+C
pub async fn start_server(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🚀 HTTP server running on http://{}", addr);
    info!("💚 Health check: http://{}/health", addr);
    info!("🔎 Search:       http://{}/search?q=", addr);
    info!("🕸️  Graph:        http://{}/graph", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
